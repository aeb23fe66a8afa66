// Test site fixtures

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The Keel grammar shipped at the crate root
pub fn keel_grammar() -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("keel.tmGrammar.json");
    fs::read_to_string(path).expect("keel.tmGrammar.json should exist at the crate root")
}

/// A temporary docs site directory
pub struct SiteFixture {
    temp_dir: TempDir,
}

impl SiteFixture {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    /// Site with the Keel grammar at its default location
    pub fn with_keel_grammar() -> anyhow::Result<Self> {
        let site = Self::new()?;
        site.write("keel.tmGrammar.json", &keel_grammar())?;
        Ok(site)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file relative to the site root, creating parent directories
    pub fn write(&self, relative: &str, content: &str) -> anyhow::Result<PathBuf> {
        let path = self.temp_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }
}
