//! Code block highlighting with syntect
//!
//! A `HighlighterFactory` owns the language catalog. The first call to
//! `create` compiles syntect's default syntaxes plus every registered
//! TextMate grammar into one `SyntaxSet`; later calls reuse it and only
//! differ in the caller options (theme, output style).

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{
    css_for_theme_with_class_style, highlighted_html_for_string, ClassStyle, ClassedHTMLGenerator,
};
use syntect::parsing::{Scope, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use thiserror::Error;

use super::catalog::LanguageCatalog;
use super::grammar::{to_syntax_definition, ConvertError};
use crate::config::{HighlightOptions, HighlightStyle};

/// Unprefixed scope classes (`keyword control keel`)
const CLASS_STYLE: ClassStyle = ClassStyle::Spaced;

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    #[error("language {id} has no compiled syntax for scope {scope}")]
    MissingSyntax { id: String, scope: String },

    #[error("unknown highlight theme {name} (available: {})", .available.join(", "))]
    UnknownTheme { name: String, available: Vec<String> },

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("highlighting failed: {0}")]
    Render(#[from] syntect::Error),
}

/// The catalog compiled into a syntax set.
///
/// Registered grammars may share a scope name, so they are resolved by
/// catalog position rather than by scope.
struct CompiledSyntaxes {
    syntax_set: SyntaxSet,
    /// Number of syntect default syntaxes at the front of `syntax_set`
    bundled: usize,
    /// Catalog index -> index into `syntax_set.syntaxes()`
    custom: HashMap<usize, usize>,
}

impl CompiledSyntaxes {
    fn compile(catalog: &LanguageCatalog) -> Result<Self, ConvertError> {
        let mut builder = SyntaxSet::load_defaults_newlines().into_builder();
        let bundled = builder.syntaxes().len();
        let known_scope = |scope: &str| catalog.contains_scope(scope);

        let mut custom = HashMap::new();
        for (index, language) in catalog
            .languages()
            .iter()
            .enumerate()
            .skip(catalog.bundled_len())
        {
            let Some(grammar) = language.textmate() else {
                continue;
            };
            let definition =
                to_syntax_definition(&language.id, &language.scope_name, grammar, &known_scope)?;
            custom.insert(index, builder.syntaxes().len());
            builder.add(definition);
            tracing::debug!("Compiled grammar {} into highlighter", language.id);
        }

        let syntax_set = builder.build();
        tracing::info!(
            "Compiled {} syntaxes ({} registered)",
            syntax_set.syntaxes().len(),
            custom.len()
        );

        Ok(Self {
            syntax_set,
            bundled,
            custom,
        })
    }

    /// Compiled syntax of the catalog entry at `index`
    fn syntax(&self, index: usize, scope: Scope) -> Option<&SyntaxReference> {
        let syntaxes = self.syntax_set.syntaxes();
        match self.custom.get(&index) {
            Some(&compiled) => syntaxes.get(compiled).filter(|s| s.scope == scope),
            None => syntaxes[..self.bundled].iter().find(|s| s.scope == scope),
        }
    }
}

/// Creates highlighters over a fixed language catalog.
///
/// Cheap to clone; the catalog, the default themes and the compiled
/// syntaxes are shared between clones.
#[derive(Clone)]
pub struct HighlighterFactory {
    catalog: Arc<LanguageCatalog>,
    themes: Arc<ThemeSet>,
    compiled: Arc<Mutex<Option<Arc<CompiledSyntaxes>>>>,
}

impl fmt::Debug for HighlighterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighlighterFactory")
            .field("languages", &self.catalog.len())
            .field("custom", &self.catalog.custom().len())
            .finish()
    }
}

impl HighlighterFactory {
    pub fn new(catalog: LanguageCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            themes: Arc::new(ThemeSet::load_defaults()),
            compiled: Arc::new(Mutex::new(None)),
        }
    }

    pub fn catalog(&self) -> &LanguageCatalog {
        &self.catalog
    }

    /// Build a highlighter for `options` over the catalog's languages.
    pub fn create(&self, options: &HighlightOptions) -> Result<Highlighter, HighlightError> {
        let theme = self
            .themes
            .themes
            .get(&options.theme)
            .cloned()
            .ok_or_else(|| HighlightError::UnknownTheme {
                name: options.theme.clone(),
                available: self.themes.themes.keys().cloned().collect(),
            })?;

        let syntaxes = self.compiled()?;
        tracing::debug!(
            "Highlighter ready: theme {}, {:?} style",
            options.theme,
            options.style
        );

        Ok(Highlighter {
            catalog: Arc::clone(&self.catalog),
            syntaxes,
            theme,
            style: options.style,
        })
    }

    /// Compile the catalog on first use. A failed compile is not cached.
    fn compiled(&self) -> Result<Arc<CompiledSyntaxes>, ConvertError> {
        let mut compiled = self
            .compiled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(syntaxes) = compiled.as_ref() {
            return Ok(Arc::clone(syntaxes));
        }
        let syntaxes = Arc::new(CompiledSyntaxes::compile(&self.catalog)?);
        *compiled = Some(Arc::clone(&syntaxes));
        Ok(syntaxes)
    }

    #[cfg(test)]
    fn is_compiled(&self) -> bool {
        self.compiled
            .lock()
            .map(|compiled| compiled.is_some())
            .unwrap_or(false)
    }
}

/// Theme names in syntect's default theme set
pub fn available_themes() -> Vec<String> {
    ThemeSet::load_defaults().themes.into_keys().collect()
}

pub struct Highlighter {
    catalog: Arc<LanguageCatalog>,
    syntaxes: Arc<CompiledSyntaxes>,
    theme: Theme,
    style: HighlightStyle,
}

impl Highlighter {
    /// Resolve a code fence language to its compiled syntax
    fn syntax_for(&self, lang: &str) -> Result<&SyntaxReference, HighlightError> {
        let index = self
            .catalog
            .position(lang)
            .ok_or_else(|| HighlightError::UnknownLanguage(lang.to_string()))?;
        let language = &self.catalog.languages()[index];

        let missing = || HighlightError::MissingSyntax {
            id: language.id.clone(),
            scope: language.scope_name.clone(),
        };
        let scope = Scope::new(&language.scope_name).map_err(|_| missing())?;
        self.syntaxes.syntax(index, scope).ok_or_else(missing)
    }

    /// Render `code` written in `lang` (id or alias) as an HTML block.
    pub fn highlight(&self, code: &str, lang: &str) -> Result<String, HighlightError> {
        let syntax = self.syntax_for(lang)?;
        let syntax_set = &self.syntaxes.syntax_set;

        match self.style {
            HighlightStyle::Inline => Ok(highlighted_html_for_string(
                code,
                syntax_set,
                syntax,
                &self.theme,
            )?),
            HighlightStyle::Classed => {
                let mut generator =
                    ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, CLASS_STYLE);
                for line in LinesWithEndings::from(code) {
                    generator.parse_html_for_line_which_includes_newline(line)?;
                }
                Ok(format!(
                    "<pre class=\"code\"><code>{}</code></pre>\n",
                    generator.finalize()
                ))
            }
        }
    }

    /// Stylesheet for classed output in the configured theme
    pub fn css(&self) -> Result<String, HighlightError> {
        Ok(css_for_theme_with_class_style(&self.theme, CLASS_STYLE)?)
    }

    pub fn style(&self) -> HighlightStyle {
        self.style
    }

    /// Identifiers of every language this highlighter accepts
    pub fn languages(&self) -> Vec<&str> {
        self.catalog
            .languages()
            .iter()
            .map(|l| l.id.as_str())
            .collect()
    }
}
