//! Pure grammar types without I/O operations.
//!
//! This module contains the TextMate grammar document model and the
//! `LanguageDefinition` registered in the language catalog. Nothing here
//! touches the filesystem; see `loader` for that.

use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while turning a grammar file into a `LanguageDefinition`.
///
/// Both kinds are fatal for configuration assembly; callers propagate them
/// unchanged.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// The grammar file is missing or unreadable
    #[error("failed to read grammar {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The grammar file is not a valid TextMate grammar document
    #[error("failed to parse grammar {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl GrammarError {
    /// Path of the grammar file that failed
    pub fn path(&self) -> &std::path::Path {
        match self {
            GrammarError::Read { path, .. } | GrammarError::Parse { path, .. } => path,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GrammarError::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// A TextMate grammar document (`*.tmLanguage.json` / `*.tmGrammar.json`).
///
/// Only the keys the highlighter understands are modelled; anything else in
/// the document is ignored. `scopeName` is mandatory so that an arbitrary
/// JSON object never silently becomes an empty grammar.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMateGrammar {
    #[serde(deserialize_with = "non_empty_scope")]
    pub scope_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file_types: Vec<String>,
    #[serde(default)]
    pub first_line_match: Option<String>,
    #[serde(default)]
    pub patterns: Vec<Rule>,
    #[serde(default)]
    pub repository: BTreeMap<String, Rule>,
}

fn non_empty_scope<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let scope = String::deserialize(deserializer)?;
    if scope.trim().is_empty() {
        return Err(de::Error::invalid_value(
            Unexpected::Str(&scope),
            &"a non-empty scope name",
        ));
    }
    Ok(scope)
}

/// One TextMate rule. Which keys are present decides the rule kind, see
/// [`Rule::kind`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default, rename = "match")]
    pub match_: Option<String>,
    #[serde(default)]
    pub begin: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default, rename = "while")]
    pub while_: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content_name: Option<String>,
    #[serde(default)]
    pub captures: Option<Captures>,
    #[serde(default)]
    pub begin_captures: Option<Captures>,
    #[serde(default)]
    pub end_captures: Option<Captures>,
    #[serde(default)]
    pub while_captures: Option<Captures>,
    #[serde(default)]
    pub patterns: Vec<Rule>,
    #[serde(default)]
    pub apply_end_pattern_last: Option<ApplyEndPatternLast>,
    /// Rules visible to `#name` includes inside this rule, shadowing the
    /// grammar-level repository
    #[serde(default)]
    pub repository: BTreeMap<String, Rule>,
}

/// Capture group number (as a string key, `"1"`) -> capture rule
pub type Captures = BTreeMap<String, Capture>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Capture {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub patterns: Vec<Rule>,
}

/// `applyEndPatternLast` shows up as both `1` and `true` in the wild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ApplyEndPatternLast {
    Flag(bool),
    Number(i64),
}

impl ApplyEndPatternLast {
    pub fn enabled(self) -> bool {
        match self {
            ApplyEndPatternLast::Flag(b) => b,
            ApplyEndPatternLast::Number(n) => n != 0,
        }
    }
}

/// Classification of a TextMate rule by the keys it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind<'a> {
    Include(&'a str),
    Match(&'a str),
    BeginEnd { begin: &'a str, end: &'a str },
    BeginWhile { begin: &'a str, while_: &'a str },
    /// Only nested `patterns`, no regex of its own
    Group,
}

impl Rule {
    pub fn kind(&self) -> RuleKind<'_> {
        if let Some(include) = self.include.as_deref() {
            return RuleKind::Include(include);
        }
        if let Some(pattern) = self.match_.as_deref() {
            return RuleKind::Match(pattern);
        }
        match (self.begin.as_deref(), self.end.as_deref(), self.while_.as_deref()) {
            (Some(begin), Some(end), _) => RuleKind::BeginEnd { begin, end },
            (Some(begin), None, Some(while_)) => RuleKind::BeginWhile { begin, while_ },
            _ => RuleKind::Group,
        }
    }

    pub fn end_pattern_last(&self) -> bool {
        self.apply_end_pattern_last
            .map(ApplyEndPatternLast::enabled)
            .unwrap_or(false)
    }
}

impl TextMateGrammar {
    /// Parse a grammar document from JSON text.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Display name, falling back to the last segment of the scope name.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self
                .scope_name
                .rsplit('.')
                .next()
                .unwrap_or(&self.scope_name),
        }
    }
}

/// Where the lexical rules of a language come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarSource {
    /// Compiled into the highlighting library's default syntax set
    Bundled,
    /// Parsed from a TextMate grammar document
    TextMate(Arc<TextMateGrammar>),
}

/// A language known to the highlighter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageDefinition {
    pub id: String,
    pub scope_name: String,
    pub grammar: GrammarSource,
    pub aliases: Vec<String>,
}

impl LanguageDefinition {
    pub fn is_bundled(&self) -> bool {
        matches!(self.grammar, GrammarSource::Bundled)
    }

    /// The TextMate document for registered languages
    pub fn textmate(&self) -> Option<&TextMateGrammar> {
        match &self.grammar {
            GrammarSource::TextMate(grammar) => Some(grammar),
            GrammarSource::Bundled => None,
        }
    }

    /// True if `token` names this language by id or alias (case-insensitive)
    pub fn answers_to(&self, token: &str) -> bool {
        self.id.eq_ignore_ascii_case(token) || self.has_alias(token)
    }

    pub fn has_alias(&self, token: &str) -> bool {
        self.aliases.iter().any(|a| a.eq_ignore_ascii_case(token))
    }
}
