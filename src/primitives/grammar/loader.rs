//! Grammar loading with I/O abstraction.
//!
//! This module provides the `GrammarLoader` trait for reading grammar files,
//! `LocalGrammarLoader` as the default filesystem-based implementation, and
//! the registrar functions that turn a grammar registration into a
//! `LanguageDefinition`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::types::{GrammarError, GrammarSource, LanguageDefinition, TextMateGrammar};
use crate::config::GrammarRegistration;

/// Trait for loading grammar files from various sources.
///
/// This abstraction allows:
/// - Testing with mock implementations
/// - Custom grammar sources (embedded, generated, etc.)
pub trait GrammarLoader: Send + Sync {
    /// Read file contents as string.
    fn read_file(&self, path: &Path) -> io::Result<String>;
}

/// Default implementation using local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalGrammarLoader;

impl LocalGrammarLoader {
    pub fn new() -> Self {
        Self
    }
}

impl GrammarLoader for LocalGrammarLoader {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Resolve a registration path against the directory of the settings file.
pub fn resolve_grammar_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Read and parse a TextMate grammar document.
pub fn read_grammar(loader: &dyn GrammarLoader, path: &Path) -> Result<TextMateGrammar, GrammarError> {
    let content = loader.read_file(path).map_err(|source| GrammarError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    TextMateGrammar::from_json(&content).map_err(|source| GrammarError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the grammar named by `registration` and build its `LanguageDefinition`.
///
/// The registration's scope name wins over the document's `scopeName`; a
/// registration without one takes the document's value.
pub fn load_language(
    loader: &dyn GrammarLoader,
    registration: &GrammarRegistration,
    base_dir: &Path,
) -> Result<LanguageDefinition, GrammarError> {
    let path = resolve_grammar_path(base_dir, &registration.path);
    let grammar = read_grammar(loader, &path)?;

    let scope_name = match registration.scope_name.as_deref() {
        Some(scope) => {
            if scope != grammar.scope_name {
                tracing::warn!(
                    "Grammar {:?} declares scope {} but is registered as {}",
                    path,
                    grammar.scope_name,
                    scope
                );
            }
            scope.to_string()
        }
        None => grammar.scope_name.clone(),
    };

    tracing::info!(
        "Loaded grammar {} ({}) from {:?}: {} patterns, {} repository rules",
        registration.id,
        scope_name,
        path,
        grammar.patterns.len(),
        grammar.repository.len()
    );

    Ok(LanguageDefinition {
        id: registration.id.clone(),
        scope_name,
        grammar: GrammarSource::TextMate(Arc::new(grammar)),
        aliases: registration.aliases.clone(),
    })
}
