//! Language catalog consumed by the highlighter
//!
//! The catalog starts from the languages bundled with syntect (100+ default
//! syntaxes) and grows by appending registered TextMate grammars. Entries
//! are never replaced: a later registration with the same id or alias
//! shadows the earlier one on lookup.

use syntect::parsing::SyntaxSet;

use super::grammar::{GrammarSource, LanguageDefinition};

#[derive(Debug, Clone)]
pub struct LanguageCatalog {
    /// Bundled entries first, then registrations in order
    languages: Vec<LanguageDefinition>,
    bundled_len: usize,
}

/// Catalog id for a bundled syntax: lowercase name with spaces collapsed
fn bundled_id(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

impl LanguageCatalog {
    /// Catalog holding only syntect's bundled languages.
    pub fn bundled() -> Self {
        Self::from_syntax_set(&SyntaxSet::load_defaults_newlines())
    }

    /// Catalog of the (non-hidden) syntaxes in `syntax_set`.
    pub fn from_syntax_set(syntax_set: &SyntaxSet) -> Self {
        let languages: Vec<LanguageDefinition> = syntax_set
            .syntaxes()
            .iter()
            .filter(|syntax| !syntax.hidden)
            .map(|syntax| LanguageDefinition {
                id: bundled_id(&syntax.name),
                scope_name: syntax.scope.build_string(),
                grammar: GrammarSource::Bundled,
                aliases: syntax.file_extensions.clone(),
            })
            .collect();

        tracing::debug!("Bundled language catalog has {} entries", languages.len());

        Self {
            bundled_len: languages.len(),
            languages,
        }
    }

    /// Append a language definition.
    pub fn register(&mut self, language: LanguageDefinition) {
        if let Some(previous) = self.find(&language.id) {
            tracing::info!(
                "Language {} ({}) shadows {} ({})",
                language.id,
                language.scope_name,
                previous.id,
                previous.scope_name
            );
        }
        self.languages.push(language);
    }

    /// Find a language by id or alias (case-insensitive). An exact id beats
    /// any alias; within each, the newest entry wins.
    pub fn find(&self, token: &str) -> Option<&LanguageDefinition> {
        self.position(token).map(|index| &self.languages[index])
    }

    /// Index into `languages()` of the entry `find` returns
    pub fn position(&self, token: &str) -> Option<usize> {
        self.languages
            .iter()
            .rposition(|l| l.id.eq_ignore_ascii_case(token))
            .or_else(|| self.languages.iter().rposition(|l| l.has_alias(token)))
    }

    /// Find a language by exact scope name. Newest entry wins.
    pub fn find_by_scope(&self, scope: &str) -> Option<&LanguageDefinition> {
        self.languages.iter().rev().find(|l| l.scope_name == scope)
    }

    pub fn contains_scope(&self, scope: &str) -> bool {
        self.find_by_scope(scope).is_some()
    }

    /// All entries, bundled first
    pub fn languages(&self) -> &[LanguageDefinition] {
        &self.languages
    }

    /// Registered (non-bundled) entries in registration order
    pub fn custom(&self) -> &[LanguageDefinition] {
        &self.languages[self.bundled_len..]
    }

    pub fn bundled_len(&self) -> usize {
        self.bundled_len
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

impl Default for LanguageCatalog {
    fn default() -> Self {
        Self::bundled()
    }
}
