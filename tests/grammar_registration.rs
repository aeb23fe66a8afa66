// Integration tests for registering the Keel grammar with the site config

mod common;

use common::fixtures::SiteFixture;
use common::tracing::init_tracing_from_env;
use keel_docs::config::{DocsConfig, GrammarRegistration, HighlightOptions, HighlightStyle};
use keel_docs::primitives::catalog::LanguageCatalog;
use keel_docs::primitives::grammar::{GrammarError, LocalGrammarLoader};
use keel_docs::site::{configure_and_build, ManifestWriter, SiteBuilder, SiteConfig};
use std::path::PathBuf;

/// Counts invocations and keeps the last configuration it saw
#[derive(Default)]
struct CountingBuilder {
    calls: usize,
    last: Option<SiteConfig>,
}

impl SiteBuilder for CountingBuilder {
    type Output = ();

    fn build(&mut self, config: SiteConfig) -> anyhow::Result<()> {
        self.calls += 1;
        self.last = Some(config);
        Ok(())
    }
}

#[test]
fn test_keel_grammar_extends_bundled_catalog_by_one() {
    init_tracing_from_env();
    let site = SiteFixture::with_keel_grammar().unwrap();

    let config =
        SiteConfig::assemble(&DocsConfig::default(), site.path(), &LocalGrammarLoader::new())
            .unwrap();

    let catalog = config.catalog();
    let bundled = LanguageCatalog::bundled();
    assert_eq!(catalog.len(), bundled.len() + 1);
    assert_eq!(catalog.bundled_len(), bundled.len());
    assert_eq!(&catalog.languages()[..bundled.len()], bundled.languages());

    let keel = catalog.find("keel").unwrap();
    assert_eq!(keel.id, "keel");
    assert_eq!(keel.scope_name, "source.keel");
    assert!(!keel.is_bundled());
    assert_eq!(keel.textmate().unwrap().display_name(), "Keel");
}

#[test]
fn test_assembled_config_carries_theme_settings() {
    let site = SiteFixture::with_keel_grammar().unwrap();

    let config =
        SiteConfig::assemble(&DocsConfig::default(), site.path(), &LocalGrammarLoader::new())
            .unwrap();

    assert_eq!(config.theme, "nextra-theme-docs");
    assert_eq!(config.theme_config, PathBuf::from("./theme.config.tsx"));
    assert_eq!(
        config.mdx_options.pretty_code.highlight,
        HighlightOptions::default()
    );
}

#[test]
fn test_missing_grammar_file_aborts_before_build() {
    init_tracing_from_env();
    let site = SiteFixture::new().unwrap();
    let mut builder = CountingBuilder::default();

    let err = configure_and_build(
        &mut builder,
        &DocsConfig::default(),
        site.path(),
        &LocalGrammarLoader::new(),
    )
    .unwrap_err();

    let grammar_err = err.downcast_ref::<GrammarError>().unwrap();
    assert!(grammar_err.is_not_found());
    assert_eq!(
        grammar_err.path(),
        site.path().join("keel.tmGrammar.json").as_path()
    );
    assert_eq!(builder.calls, 0);
}

#[test]
fn test_malformed_grammar_file_aborts_before_build() {
    let site = SiteFixture::new().unwrap();
    site.write("keel.tmGrammar.json", r#"{"scopeName": "source.keel", "patterns": [}"#)
        .unwrap();
    let mut builder = CountingBuilder::default();

    let err = configure_and_build(
        &mut builder,
        &DocsConfig::default(),
        site.path(),
        &LocalGrammarLoader::new(),
    )
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<GrammarError>(),
        Some(GrammarError::Parse { .. })
    ));
    assert_eq!(builder.calls, 0);
}

#[test]
fn test_assembly_is_idempotent() {
    let site = SiteFixture::with_keel_grammar().unwrap();
    let loader = LocalGrammarLoader::new();

    let first = SiteConfig::assemble(&DocsConfig::default(), site.path(), &loader).unwrap();
    let second = SiteConfig::assemble(&DocsConfig::default(), site.path(), &loader).unwrap();

    assert_eq!(first.catalog().languages(), second.catalog().languages());
    assert_eq!(first.manifest(), second.manifest());
}

#[test]
fn test_builder_receives_factory_with_keel() {
    let site = SiteFixture::with_keel_grammar().unwrap();
    let mut builder = CountingBuilder::default();

    configure_and_build(
        &mut builder,
        &DocsConfig::default(),
        site.path(),
        &LocalGrammarLoader::new(),
    )
    .unwrap();

    assert_eq!(builder.calls, 1);
    let config = builder.last.unwrap();
    let highlighter = config.mdx_options.pretty_code.highlighter().unwrap();
    assert!(highlighter.languages().contains(&"keel"));
}

#[test]
fn test_keel_code_highlights_with_grammar_scopes() {
    init_tracing_from_env();
    let site = SiteFixture::with_keel_grammar().unwrap();
    let config =
        SiteConfig::assemble(&DocsConfig::default(), site.path(), &LocalGrammarLoader::new())
            .unwrap();

    let highlighter = config
        .mdx_options
        .pretty_code
        .get_highlighter
        .create(&HighlightOptions {
            style: HighlightStyle::Classed,
            ..HighlightOptions::default()
        })
        .unwrap();

    let code = "model Post {\n    fields {\n        title Text @unique\n    }\n}\n";
    let html = highlighter.highlight(code, "keel").unwrap();

    assert!(html.contains("storage type keel"), "{}", html);
    assert!(html.contains("entity name type keel"), "{}", html);
    assert!(html.contains("support type primitive keel"), "{}", html);
    assert!(html.contains(">Post<"), "{}", html);
}

#[test]
fn test_bundled_languages_still_highlight() {
    let site = SiteFixture::with_keel_grammar().unwrap();
    let config =
        SiteConfig::assemble(&DocsConfig::default(), site.path(), &LocalGrammarLoader::new())
            .unwrap();
    let highlighter = config.mdx_options.pretty_code.highlighter().unwrap();

    let html = highlighter.highlight("fn main() {}\n", "rs").unwrap();
    assert!(html.contains("main"), "{}", html);
}

#[test]
fn test_settings_file_relocates_grammar() {
    let site = SiteFixture::new().unwrap();
    site.write("grammars/keel.json", &common::fixtures::keel_grammar())
        .unwrap();
    let settings = site
        .write(
            "keel-docs.json",
            r#"{
                "highlight": { "theme": "InspiredGitHub", "style": "classed" },
                "grammars": [
                    { "id": "keel", "path": "grammars/keel.json", "aliases": ["kl"] }
                ]
            }"#,
        )
        .unwrap();

    let (config, base_dir) = DocsConfig::locate(Some(&settings), site.path()).unwrap();
    assert_eq!(base_dir, site.path());
    assert_eq!(
        config.grammars,
        vec![GrammarRegistration {
            id: "keel".to_string(),
            scope_name: None,
            path: PathBuf::from("grammars/keel.json"),
            aliases: vec!["kl".to_string()],
        }]
    );

    let assembled = SiteConfig::assemble(&config, &base_dir, &LocalGrammarLoader::new()).unwrap();
    let keel = assembled.catalog().find("kl").unwrap();
    assert_eq!(keel.scope_name, "source.keel");
    assert_eq!(
        assembled.mdx_options.pretty_code.highlight.style,
        HighlightStyle::Classed
    );
}

#[test]
fn test_manifest_writer_output() {
    let site = SiteFixture::with_keel_grammar().unwrap();
    let mut writer = ManifestWriter::new(Vec::new());

    configure_and_build(
        &mut writer,
        &DocsConfig::default(),
        site.path(),
        &LocalGrammarLoader::new(),
    )
    .unwrap();

    let output = String::from_utf8(writer.into_inner()).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&output).unwrap();
    let langs = &manifest["mdxOptions"]["rehypePrettyCodeOptions"]["getHighlighter"]["langs"];
    assert_eq!(langs.as_array().unwrap().len(), 1);
    assert_eq!(langs[0]["id"], "keel");
    assert_eq!(langs[0]["scopeName"], "source.keel");
    assert_eq!(langs[0]["aliases"][0], "keel");
}
