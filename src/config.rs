use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default settings file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "keel-docs.json";

/// Site build settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DocsConfig {
    /// Identifier of the documentation theme handed to the site builder
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Path of the theme configuration module, passed through untouched
    #[serde(default = "default_theme_config")]
    pub theme_config: PathBuf,

    #[serde(default)]
    pub highlight: HighlightOptions,

    /// Custom grammars appended to the bundled language catalog
    #[serde(default = "default_grammars")]
    pub grammars: Vec<GrammarRegistration>,
}

fn default_theme() -> String {
    "nextra-theme-docs".to_string()
}

fn default_theme_config() -> PathBuf {
    PathBuf::from("./theme.config.tsx")
}

fn default_grammars() -> Vec<GrammarRegistration> {
    vec![GrammarRegistration::keel()]
}

/// Code block highlighting options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HighlightOptions {
    /// Name of a theme from syntect's default theme set
    #[serde(default = "default_highlight_theme")]
    pub theme: String,

    #[serde(default)]
    pub style: HighlightStyle,
}

fn default_highlight_theme() -> String {
    "base16-ocean.dark".to_string()
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            theme: default_highlight_theme(),
            style: HighlightStyle::default(),
        }
    }
}

/// How highlighted HTML carries its colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HighlightStyle {
    /// `style="color:..."` attributes resolved from the theme
    #[default]
    Inline,
    /// Scope CSS classes; pair with the stylesheet from `Highlighter::css`
    Classed,
}

/// A custom grammar to register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GrammarRegistration {
    /// Language identifier used in code fences
    pub id: String,

    /// Scope name the grammar is bound to. Defaults to the document's `scopeName`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_name: Option<String>,

    /// Path of the TextMate JSON grammar, relative to the settings file
    pub path: PathBuf,

    #[serde(default)]
    pub aliases: Vec<String>,
}

impl GrammarRegistration {
    /// The Keel schema language grammar shipped with the docs
    pub fn keel() -> Self {
        Self {
            id: "keel".to_string(),
            scope_name: Some("source.keel".to_string()),
            path: PathBuf::from("keel.tmGrammar.json"),
            aliases: vec!["keel".to_string()],
        }
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            theme_config: default_theme_config(),
            highlight: HighlightOptions::default(),
            grammars: default_grammars(),
        }
    }
}

impl DocsConfig {
    /// Load settings from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.as_ref().display(), e)))?;

        let config: DocsConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load the settings file at `path`, or defaults when `path` is `None` and
    /// no `keel-docs.json` exists in `cwd`. Returns the settings together with
    /// the directory grammar paths resolve against.
    pub fn locate(path: Option<&Path>, cwd: &Path) -> Result<(Self, PathBuf), ConfigError> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let candidate = cwd.join(CONFIG_FILE_NAME);
                candidate.is_file().then_some(candidate)
            }
        };

        match path {
            Some(path) => {
                let config = Self::load_from_file(&path)?;
                let base_dir = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => cwd.to_path_buf(),
                };
                tracing::info!("Loaded settings from {:?}", path);
                Ok((config, base_dir))
            }
            None => {
                tracing::debug!("No {} in {:?}, using defaults", CONFIG_FILE_NAME, cwd);
                Ok((Self::default(), cwd.to_path_buf()))
            }
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.theme.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "theme must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for grammar in &self.grammars {
            if grammar.id.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "grammar id must not be empty".to_string(),
                ));
            }
            if grammar
                .scope_name
                .as_deref()
                .is_some_and(|scope| scope.trim().is_empty())
            {
                return Err(ConfigError::ValidationError(format!(
                    "grammar {} has an empty scope_name",
                    grammar.id
                )));
            }
            if grammar.path.as_os_str().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "grammar {} has an empty path",
                    grammar.id
                )));
            }
            if !seen.insert(grammar.id.to_lowercase()) {
                return Err(ConfigError::ValidationError(format!(
                    "grammar {} is registered more than once",
                    grammar.id
                )));
            }
        }

        Ok(())
    }
}

/// Settings error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DocsConfig::default();
        assert_eq!(config.theme, "nextra-theme-docs");
        assert_eq!(config.theme_config, PathBuf::from("./theme.config.tsx"));
        assert_eq!(config.highlight.theme, "base16-ocean.dark");
        assert_eq!(config.highlight.style, HighlightStyle::Inline);
        assert_eq!(config.grammars, vec![GrammarRegistration::keel()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_object_gets_defaults() {
        let config: DocsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DocsConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config: DocsConfig = serde_json::from_str(
            r#"{
                "highlight": {"style": "classed"},
                "grammars": [{"id": "kdl", "path": "grammars/kdl.json"}]
            }"#,
        )
        .unwrap();
        assert_eq!(config.highlight.style, HighlightStyle::Classed);
        assert_eq!(config.highlight.theme, "base16-ocean.dark");
        assert_eq!(config.grammars.len(), 1);
        assert_eq!(config.grammars[0].scope_name, None);
        assert!(config.grammars[0].aliases.is_empty());
    }

    #[test]
    fn test_duplicate_grammar_ids_rejected() {
        let mut config = DocsConfig::default();
        config.grammars.push(GrammarRegistration {
            id: "KEEL".to_string(),
            ..GrammarRegistration::keel()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_empty_grammar_path_rejected() {
        let mut config = DocsConfig::default();
        config.grammars[0].path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_scope_name_rejected() {
        let mut config = DocsConfig::default();
        config.grammars[0].scope_name = Some(String::new());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_from_file_and_locate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(br#"{"theme": "custom-theme"}"#).unwrap();

        let (config, base_dir) = DocsConfig::locate(None, dir.path()).unwrap();
        assert_eq!(config.theme, "custom-theme");
        assert_eq!(base_dir, dir.path());
    }

    #[test]
    fn test_locate_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, base_dir) = DocsConfig::locate(None, dir.path()).unwrap();
        assert_eq!(config, DocsConfig::default());
        assert_eq!(base_dir, dir.path());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = DocsConfig::locate(Some(&dir.path().join("nope.json")), dir.path());
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            DocsConfig::load_from_file(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
