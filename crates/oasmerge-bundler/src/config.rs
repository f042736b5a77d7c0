//! Bundler configuration (`oasmerge.yaml`).
//!
//! The configuration only controls rule severities. It is loaded once per
//! invocation and handed to every bundle call by reference.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::problem::Severity;

/// File names probed by [`Config::discover`], in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["oasmerge.yaml", ".oasmerge.yaml"];

/// Names of the checks the bundler runs.
pub mod rules {
    /// The document parses and has the required top-level OpenAPI fields.
    pub const STRUCT: &str = "struct";

    /// Every `$ref` points at something that exists.
    pub const NO_UNRESOLVED_REFS: &str = "no-unresolved-refs";

    /// Component names only use `[a-zA-Z0-9.-_]`.
    pub const COMPONENT_NAMES: &str = "spec-components-invalid-map-name";

    /// All known rules.
    pub const ALL: &[&str] = &[STRUCT, NO_UNRESOLVED_REFS, COMPONENT_NAMES];
}

/// Configured severity of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Error,
    Warn,
    Off,
}

impl RuleSeverity {
    /// The problem severity this rule reports at, or `None` when disabled.
    pub fn as_severity(self) -> Option<Severity> {
        match self {
            RuleSeverity::Error => Some(Severity::Error),
            RuleSeverity::Warn => Some(Severity::Warn),
            RuleSeverity::Off => None,
        }
    }
}

/// Bundler configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Rule name -> severity overrides.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleSeverity>,

    /// File the configuration was loaded from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content, path)
    }

    /// Parse a configuration from YAML content.
    ///
    /// An empty document yields the default configuration.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };

        if let Some(rule) = config.rules.keys().find(|r| !rules::ALL.contains(&r.as_str())) {
            return Err(ConfigError::UnknownRule {
                path: path.to_path_buf(),
                rule: rule.clone(),
            });
        }

        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Look for a configuration file in `dir`, falling back to defaults.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                tracing::debug!(config = %candidate.display(), "loading bundler configuration");
                return Self::load(&candidate);
            }
        }
        Ok(Self::default())
    }

    /// Override the severity of a rule.
    pub fn with_rule(mut self, rule: impl Into<String>, severity: RuleSeverity) -> Self {
        self.rules.insert(rule.into(), severity);
        self
    }

    /// Effective severity of a rule: the configured one, else its default.
    pub fn severity(&self, rule: &str) -> RuleSeverity {
        if let Some(severity) = self.rules.get(rule) {
            return *severity;
        }
        match rule {
            rules::COMPONENT_NAMES => RuleSeverity::Warn,
            _ => RuleSeverity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.severity(rules::STRUCT), RuleSeverity::Error);
        assert_eq!(config.severity(rules::NO_UNRESOLVED_REFS), RuleSeverity::Error);
        assert_eq!(config.severity(rules::COMPONENT_NAMES), RuleSeverity::Warn);
    }

    #[test]
    fn parse_overrides() {
        let yaml = r#"
rules:
  spec-components-invalid-map-name: off
  no-unresolved-refs: warn
"#;
        let config = Config::parse(yaml, Path::new("oasmerge.yaml")).unwrap();
        assert_eq!(config.severity(rules::COMPONENT_NAMES), RuleSeverity::Off);
        assert_eq!(config.severity(rules::NO_UNRESOLVED_REFS), RuleSeverity::Warn);
        assert_eq!(config.severity(rules::STRUCT), RuleSeverity::Error);
        assert_eq!(config.source.as_deref(), Some(Path::new("oasmerge.yaml")));
    }

    #[test]
    fn parse_empty_document() {
        let config = Config::parse("\n", Path::new("oasmerge.yaml")).unwrap();
        assert!(config.rules.is_empty());
    }

    #[test]
    fn parse_rejects_unknown_rule() {
        let yaml = "rules:\n  no-typos: error\n";
        let err = Config::parse(yaml, Path::new("oasmerge.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRule { rule, .. } if rule == "no-typos"));
    }

    #[test]
    fn parse_rejects_unknown_field() {
        let yaml = "extends: recommended\n";
        let err = Config::parse(yaml, Path::new("oasmerge.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn parse_rejects_bad_severity() {
        let yaml = "rules:\n  struct: fatal\n";
        let err = Config::parse(yaml, Path::new("oasmerge.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn discover_without_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::discover(temp.path()).unwrap();
        assert!(config.source.is_none());
        assert!(config.rules.is_empty());
    }

    #[test]
    fn discover_prefers_plain_name() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("oasmerge.yaml"), "rules:\n  struct: warn\n").unwrap();
        std::fs::write(temp.path().join(".oasmerge.yaml"), "rules:\n  struct: off\n").unwrap();

        let config = Config::discover(temp.path()).unwrap();
        assert_eq!(config.severity(rules::STRUCT), RuleSeverity::Warn);
    }

    #[test]
    fn discover_hidden_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".oasmerge.yaml"), "rules:\n  struct: off\n").unwrap();

        let config = Config::discover(temp.path()).unwrap();
        assert_eq!(config.severity(rules::STRUCT), RuleSeverity::Off);
    }

    #[test]
    fn with_rule_builder() {
        let config = Config::default().with_rule(rules::STRUCT, RuleSeverity::Off);
        assert_eq!(config.severity(rules::STRUCT), RuleSeverity::Off);
        assert_eq!(RuleSeverity::Off.as_severity(), None);
        assert_eq!(RuleSeverity::Warn.as_severity(), Some(Severity::Warn));
    }
}
