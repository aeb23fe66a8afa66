//! TextMate grammar -> syntect syntax definition.
//!
//! syntect only reads `.sublime-syntax` documents, so a registered TextMate
//! grammar is rewritten into that shape, emitted as YAML and compiled with
//! `SyntaxDefinition::load_from_str`. Constructs sublime-syntax cannot
//! express (capture-level patterns, injections) are dropped with a log line.

use serde::Serialize;
use std::collections::BTreeMap;
use syntect::parsing::{ParseSyntaxError, SyntaxDefinition};
use thiserror::Error;

use super::types::{Captures, Rule, RuleKind, TextMateGrammar};

const MAIN_CONTEXT: &str = "main";

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to emit syntax for {id}: {source}")]
    Emit {
        id: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("grammar {id} does not compile: {source}")]
    Compile {
        id: String,
        #[source]
        source: ParseSyntaxError,
    },
}

#[derive(Debug, Serialize)]
struct SublimeSyntax {
    name: String,
    file_extensions: Vec<String>,
    scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_line_match: Option<String>,
    contexts: BTreeMap<String, Vec<ContextEntry>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ContextEntry {
    MetaScope { meta_scope: String },
    MetaContentScope { meta_content_scope: String },
    Include { include: String },
    Match(MatchEntry),
}

#[derive(Debug, Serialize)]
struct MatchEntry {
    #[serde(rename = "match")]
    pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    captures: BTreeMap<u32, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    push: Option<Vec<ContextEntry>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pop: bool,
}

/// A repository visible to `#name` includes, with the prefix of the
/// contexts its rules are emitted as.
#[derive(Clone, Copy)]
struct Repository<'a> {
    prefix: usize,
    rules: &'a BTreeMap<String, Rule>,
}

impl Repository<'_> {
    /// Context name used for one of this repository's rules
    fn context(&self, name: &str) -> String {
        repository_context(self.prefix, name)
    }
}

/// Context name of rule `name` in repository number `prefix`. The grammar's
/// own repository is number 0.
fn repository_context(prefix: usize, name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if prefix == 0 {
        format!("repo-{}", cleaned)
    } else {
        format!("repo{}-{}", prefix, cleaned)
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty()).cloned()
}

/// Rewrites one grammar. `known_scope` tells which foreign scopes can be
/// included (the ones present in the final syntax set).
struct Converter<'a> {
    id: &'a str,
    scope_name: &'a str,
    grammar: &'a TextMateGrammar,
    known_scope: &'a dyn Fn(&str) -> bool,
    contexts: BTreeMap<String, Vec<ContextEntry>>,
    repositories: usize,
}

impl<'a> Converter<'a> {
    fn convert(mut self) -> SublimeSyntax {
        let grammar = self.grammar;
        let chain = [Repository {
            prefix: 0,
            rules: &grammar.repository,
        }];
        self.repository_contexts(&chain);
        let main = self.rules(&grammar.patterns, &chain);
        self.contexts.insert(MAIN_CONTEXT.to_string(), main);

        SublimeSyntax {
            name: grammar.display_name().to_string(),
            file_extensions: grammar.file_types.clone(),
            scope: self.scope_name.to_string(),
            first_line_match: grammar.first_line_match.clone(),
            contexts: self.contexts,
        }
    }

    /// Emit a context for every rule of the innermost repository in `chain`.
    fn repository_contexts(&mut self, chain: &[Repository<'a>]) {
        let Some(repository) = chain.last().copied() else {
            return;
        };
        for (name, rule) in repository.rules {
            let entries = self.rule(rule, chain);
            self.contexts.insert(repository.context(name), entries);
        }
    }

    fn rules(&mut self, rules: &'a [Rule], chain: &[Repository<'a>]) -> Vec<ContextEntry> {
        let mut entries = Vec::new();
        for rule in rules {
            entries.extend(self.rule(rule, chain));
        }
        entries
    }

    fn rule(&mut self, rule: &'a Rule, chain: &[Repository<'a>]) -> Vec<ContextEntry> {
        if rule.repository.is_empty() {
            return self.rule_in(rule, chain);
        }

        self.repositories += 1;
        let mut nested = chain.to_vec();
        nested.push(Repository {
            prefix: self.repositories,
            rules: &rule.repository,
        });
        self.repository_contexts(&nested);
        self.rule_in(rule, &nested)
    }

    fn rule_in(&mut self, rule: &'a Rule, chain: &[Repository<'a>]) -> Vec<ContextEntry> {
        match rule.kind() {
            RuleKind::Include(target) => self.include(target, chain).into_iter().collect(),
            RuleKind::Match(pattern) => vec![ContextEntry::Match(MatchEntry {
                pattern: pattern.to_string(),
                scope: non_empty(rule.name.as_ref()),
                captures: self.captures(rule.captures.as_ref()),
                push: None,
                pop: false,
            })],
            RuleKind::BeginEnd { begin, end } => {
                vec![self.region(rule, begin, end.to_string(), chain)]
            }
            RuleKind::BeginWhile { begin, while_ } => {
                // No `while` in sublime-syntax: leave the region on the first
                // line that does not continue it.
                vec![self.region(rule, begin, format!("^(?!{})", while_), chain)]
            }
            RuleKind::Group => self.rules(&rule.patterns, chain),
        }
    }

    fn region(
        &mut self,
        rule: &'a Rule,
        begin: &str,
        end: String,
        chain: &[Repository<'a>],
    ) -> ContextEntry {
        let mut pushed = Vec::new();
        if let Some(name) = non_empty(rule.name.as_ref()) {
            pushed.push(ContextEntry::MetaScope { meta_scope: name });
        }
        if let Some(content) = non_empty(rule.content_name.as_ref()) {
            pushed.push(ContextEntry::MetaContentScope {
                meta_content_scope: content,
            });
        }

        let end_captures = rule
            .end_captures
            .as_ref()
            .or(rule.while_captures.as_ref())
            .or(rule.captures.as_ref());
        let pop = ContextEntry::Match(MatchEntry {
            pattern: end,
            scope: None,
            captures: self.captures(end_captures),
            push: None,
            pop: true,
        });
        let nested = self.rules(&rule.patterns, chain);

        if rule.end_pattern_last() {
            pushed.extend(nested);
            pushed.push(pop);
        } else {
            pushed.push(pop);
            pushed.extend(nested);
        }

        let begin_captures = rule.begin_captures.as_ref().or(rule.captures.as_ref());
        ContextEntry::Match(MatchEntry {
            pattern: begin.to_string(),
            scope: None,
            captures: self.captures(begin_captures),
            push: Some(pushed),
            pop: false,
        })
    }

    fn captures(&self, captures: Option<&Captures>) -> BTreeMap<u32, String> {
        let mut mapped = BTreeMap::new();
        for (key, capture) in captures.into_iter().flatten() {
            let Ok(group) = key.parse::<u32>() else {
                tracing::debug!("Grammar {}: ignoring capture key {:?}", self.id, key);
                continue;
            };
            if !capture.patterns.is_empty() {
                tracing::debug!(
                    "Grammar {}: dropping nested patterns of capture {}",
                    self.id,
                    group
                );
            }
            if let Some(name) = non_empty(capture.name.as_ref()) {
                mapped.insert(group, name);
            }
        }
        mapped
    }

    fn include(&self, target: &str, chain: &[Repository<'a>]) -> Option<ContextEntry> {
        let include = |name: String| Some(ContextEntry::Include { include: name });

        match target {
            "$self" | "$base" => return include(MAIN_CONTEXT.to_string()),
            _ => {}
        }

        if let Some(rule) = target.strip_prefix('#') {
            return self.local_include(rule, target, chain);
        }

        let (scope, rule) = match target.split_once('#') {
            Some((scope, rule)) => (scope, Some(rule)),
            None => (target, None),
        };

        if scope == self.scope_name || scope == self.grammar.scope_name {
            // `scope#rule` names the grammar-level repository only
            return match rule {
                Some(rule) => self.local_include(rule, target, &chain[..1]),
                None => include(MAIN_CONTEXT.to_string()),
            };
        }

        if (self.known_scope)(scope) {
            if rule.is_some() {
                tracing::debug!(
                    "Grammar {}: including all of {} for {}",
                    self.id,
                    scope,
                    target
                );
            }
            return include(format!("scope:{}", scope));
        }

        tracing::warn!(
            "Grammar {}: dropping include of unknown scope {}",
            self.id,
            target
        );
        None
    }

    /// Resolve `#rule` from the innermost repository outwards.
    fn local_include(
        &self,
        rule: &str,
        target: &str,
        chain: &[Repository<'a>],
    ) -> Option<ContextEntry> {
        match chain.iter().rev().find(|repo| repo.rules.contains_key(rule)) {
            Some(repository) => Some(ContextEntry::Include {
                include: repository.context(rule),
            }),
            None => {
                tracing::warn!(
                    "Grammar {}: dropping include of missing repository rule {}",
                    self.id,
                    target
                );
                None
            }
        }
    }
}

/// Render `grammar` as a sublime-syntax YAML document bound to `scope_name`.
pub fn to_sublime_syntax(
    id: &str,
    scope_name: &str,
    grammar: &TextMateGrammar,
    known_scope: &dyn Fn(&str) -> bool,
) -> Result<String, ConvertError> {
    let converter = Converter {
        id,
        scope_name,
        grammar,
        known_scope,
        contexts: BTreeMap::new(),
        repositories: 0,
    };
    serde_yaml::to_string(&converter.convert()).map_err(|source| ConvertError::Emit {
        id: id.to_string(),
        source,
    })
}

/// Convert and compile `grammar` into a syntect `SyntaxDefinition`.
pub fn to_syntax_definition(
    id: &str,
    scope_name: &str,
    grammar: &TextMateGrammar,
    known_scope: &dyn Fn(&str) -> bool,
) -> Result<SyntaxDefinition, ConvertError> {
    let yaml = to_sublime_syntax(id, scope_name, grammar, known_scope)?;
    tracing::debug!("Converted grammar {} ({} bytes of sublime-syntax)", id, yaml.len());

    SyntaxDefinition::load_from_str(&yaml, true, Some(grammar.display_name())).map_err(|source| {
        ConvertError::Compile {
            id: id.to_string(),
            source,
        }
    })
}
