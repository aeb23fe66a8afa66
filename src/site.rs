//! Site build configuration
//!
//! Assembles the configuration object handed to the documentation site
//! builder: theme identifier, theme config path and the MDX options whose
//! pretty-code section carries the highlighter factory. Assembly registers
//! every configured grammar first, so a missing or malformed grammar fails
//! before any builder sees the configuration.

use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{DocsConfig, HighlightOptions};
use crate::primitives::catalog::LanguageCatalog;
use crate::primitives::grammar::{load_language, GrammarError, GrammarLoader};
use crate::primitives::highlighter::{HighlightError, Highlighter, HighlighterFactory};

/// Options of the code block highlighting plugin
#[derive(Debug, Clone)]
pub struct PrettyCodeOptions {
    /// Highlighting defaults the builder starts from
    pub highlight: HighlightOptions,
    pub get_highlighter: HighlighterFactory,
}

impl PrettyCodeOptions {
    /// Highlighter with the configured defaults
    pub fn highlighter(&self) -> Result<Highlighter, HighlightError> {
        self.get_highlighter.create(&self.highlight)
    }
}

/// Build-time markdown/MDX processing options
#[derive(Debug, Clone)]
pub struct MdxOptions {
    pub pretty_code: PrettyCodeOptions,
}

/// The configuration object passed to a `SiteBuilder`
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub theme: String,
    pub theme_config: PathBuf,
    pub mdx_options: MdxOptions,
}

impl SiteConfig {
    /// Register the configured grammars on top of the bundled catalog and
    /// assemble the configuration object.
    ///
    /// `base_dir` is the directory relative grammar paths resolve against.
    pub fn assemble(
        config: &DocsConfig,
        base_dir: &Path,
        loader: &dyn GrammarLoader,
    ) -> Result<Self, GrammarError> {
        let mut catalog = LanguageCatalog::bundled();
        for registration in &config.grammars {
            catalog.register(load_language(loader, registration, base_dir)?);
        }

        tracing::info!(
            "Assembled site config: theme {}, {} languages ({} custom)",
            config.theme,
            catalog.len(),
            catalog.custom().len()
        );

        Ok(Self {
            theme: config.theme.clone(),
            theme_config: config.theme_config.clone(),
            mdx_options: MdxOptions {
                pretty_code: PrettyCodeOptions {
                    highlight: config.highlight.clone(),
                    get_highlighter: HighlighterFactory::new(catalog),
                },
            },
        })
    }

    pub fn catalog(&self) -> &LanguageCatalog {
        self.mdx_options.pretty_code.get_highlighter.catalog()
    }

    /// JSON view of the configuration object. The highlighter factory is
    /// described by the languages it registers.
    pub fn manifest(&self) -> Value {
        let pretty_code = &self.mdx_options.pretty_code;
        let catalog = self.catalog();
        let custom: Vec<Value> = catalog
            .custom()
            .iter()
            .map(|language| {
                json!({
                    "id": language.id,
                    "scopeName": language.scope_name,
                    "aliases": language.aliases,
                })
            })
            .collect();

        json!({
            "theme": self.theme,
            "themeConfig": self.theme_config,
            "mdxOptions": {
                "rehypePrettyCodeOptions": {
                    "theme": pretty_code.highlight.theme,
                    "style": pretty_code.highlight.style,
                    "getHighlighter": {
                        "bundledLanguages": catalog.bundled_len(),
                        "langs": custom,
                    },
                },
            },
        })
    }
}

/// The site builder the configuration is handed to.
pub trait SiteBuilder {
    type Output;

    fn build(&mut self, config: SiteConfig) -> anyhow::Result<Self::Output>;
}

/// Assemble the configuration, then hand it to `builder`.
pub fn configure_and_build<B: SiteBuilder>(
    builder: &mut B,
    config: &DocsConfig,
    base_dir: &Path,
    loader: &dyn GrammarLoader,
) -> anyhow::Result<B::Output> {
    let site = SiteConfig::assemble(config, base_dir, loader)?;
    builder.build(site)
}

/// Builder that writes the configuration manifest as pretty JSON.
pub struct ManifestWriter<W: Write> {
    writer: W,
}

impl<W: Write> ManifestWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SiteBuilder for ManifestWriter<W> {
    type Output = ();

    fn build(&mut self, config: SiteConfig) -> anyhow::Result<()> {
        // Compile once so a grammar syntect rejects fails the build here
        config.mdx_options.pretty_code.highlighter()?;

        serde_json::to_writer_pretty(&mut self.writer, &config.manifest())?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}
