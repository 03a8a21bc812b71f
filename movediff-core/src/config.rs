//! Configuration loading from `.movediff.toml`.
//!
//! Configuration is optional. Every section and field has a default, so an
//! empty file and a missing file behave the same.
//!
//! # Example Configuration
//!
//! ```toml
//! [matcher]
//! min_height = 2
//! similarity_threshold = 0.5
//! label_weight = 0.25
//! max_recovery_size = 1000
//!
//! [pairing]
//! rename_threshold = 0.5
//!
//! [classifier]
//! group_moves = true
//! min_group_size = 2
//!
//! [limits]
//! timeout_ms = 30000
//!
//! [scanner]
//! ignore = ["vendor/", "generated/"]
//! max_file_size_kb = 1024
//!
//! [entities.methods]
//! indices = ["source_text", "name"]
//! priority = "nesting_level"
//! threshold = 0.4
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Name of the config file looked up in a project root.
pub const CONFIG_FILE_NAME: &str = ".movediff.toml";

/// Root configuration structure.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DiffConfig {
    #[serde(default)]
    pub matcher: MatcherConfig,

    #[serde(default)]
    pub pairing: PairingConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub entities: EntitiesConfig,
}

/// Node Matcher tuning.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Subtrees lower than this are never anchored by the top-down phase.
    pub min_height: usize,

    /// Minimum bottom-up score for a container match.
    pub similarity_threshold: f64,

    /// Weight of label similarity in the bottom-up score, in `[0, 1]`.
    pub label_weight: f64,

    /// Recovery skips pairs with more unmatched children than this on
    /// either side.
    pub max_recovery_size: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_height: 2,
            similarity_threshold: 0.5,
            label_weight: 0.25,
            max_recovery_size: 1000,
        }
    }
}

/// Whole-file pairing between snapshots.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct PairingConfig {
    /// Minimum structural similarity for an unpaired file to count as renamed.
    pub rename_threshold: f64,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            rename_threshold: 0.5,
        }
    }
}

/// Action Classifier options.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Collapse contiguous moved siblings into `MultiMove` groups.
    pub group_moves: bool,

    /// Smallest run of siblings reported as a group.
    pub min_group_size: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            group_moves: true,
            min_group_size: 2,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Deadline for a whole `diff()` call. No deadline when unset.
    pub timeout_ms: Option<u64>,
}

/// Directory scanning options.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Extra gitignore-style patterns to skip.
    pub ignore: Vec<String>,

    /// Files larger than this are skipped.
    pub max_file_size_kb: Option<u64>,

    /// Only parse these languages. All supported languages when unset.
    pub languages: Option<Vec<String>>,
}

/// Similarity index selectable from config.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    SourceText,
    Name,
    Members,
}

/// Priority rule selectable from config.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityKind {
    NestingLevel,
    None,
}

/// Matcher settings for one entity kind.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct EntityKindSettings {
    pub indices: Vec<IndexKind>,
    pub priority: PriorityKind,
    pub threshold: f64,
}

impl Default for EntityKindSettings {
    fn default() -> Self {
        Self {
            indices: vec![IndexKind::SourceText],
            priority: PriorityKind::NestingLevel,
            threshold: 0.5,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct EntitiesConfig {
    pub types: EntityKindSettings,
    pub methods: EntityKindSettings,
    pub attributes: EntityKindSettings,
}

impl Default for EntitiesConfig {
    fn default() -> Self {
        Self {
            types: EntityKindSettings::default(),
            methods: EntityKindSettings::default(),
            attributes: EntityKindSettings {
                indices: vec![IndexKind::Name, IndexKind::SourceText],
                ..EntityKindSettings::default()
            },
        }
    }
}

/// Default ignore patterns that are always included.
const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git/",
    "node_modules/",
    "__pycache__/",
    ".venv/",
    "venv/",
    "target/",
];

impl DiffConfig {
    /// Load configuration from `.movediff.toml` in the given directory.
    ///
    /// A missing file gives defaults. Read and parse errors are logged as
    /// warnings and also give defaults.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match Self::from_toml_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", CONFIG_FILE_NAME, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", CONFIG_FILE_NAME, e);
                }
            }
        }
        Self::default()
    }

    /// Parse configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Deadline duration for one diff, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.limits.timeout_ms.map(Duration::from_millis)
    }

    /// Scanner ignore patterns, user patterns first, defaults appended.
    pub fn ignore_patterns(&self) -> Vec<String> {
        let mut patterns = self.scanner.ignore.clone();
        for default in DEFAULT_IGNORE_PATTERNS {
            if !patterns.iter().any(|p| p == default) {
                patterns.push(default.to_string());
            }
        }
        patterns
    }

    pub fn max_file_size_bytes(&self) -> Option<u64> {
        self.scanner.max_file_size_kb.map(|kb| kb * 1024)
    }

    /// Check if a specific language should be parsed.
    pub fn should_parse_language(&self, lang: &str) -> bool {
        match &self.scanner.languages {
            None => true,
            Some(langs) => langs.iter().any(|l| l.eq_ignore_ascii_case(lang)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = DiffConfig::default();
        assert_eq!(config.matcher.min_height, 2);
        assert_eq!(config.matcher.similarity_threshold, 0.5);
        assert_eq!(config.matcher.max_recovery_size, 1000);
        assert_eq!(config.pairing.rename_threshold, 0.5);
        assert!(config.classifier.group_moves);
        assert_eq!(config.classifier.min_group_size, 2);
        assert!(config.timeout().is_none());
        assert_eq!(config.entities.types.priority, PriorityKind::NestingLevel);
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[matcher]
min_height = 1
label_weight = 0.5

[classifier]
group_moves = false

[limits]
timeout_ms = 250

[scanner]
ignore = ["vendor/", ".git/"]
max_file_size_kb = 64
languages = ["java"]

[entities.types]
indices = ["name", "members"]
priority = "none"
threshold = 0.3
"#;
        let config = DiffConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.matcher.min_height, 1);
        assert_eq!(config.matcher.label_weight, 0.5);
        // untouched fields keep defaults
        assert_eq!(config.matcher.similarity_threshold, 0.5);
        assert!(!config.classifier.group_moves);
        assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.max_file_size_bytes(), Some(64 * 1024));
        assert!(config.should_parse_language("Java"));
        assert!(!config.should_parse_language("python"));

        let patterns = config.ignore_patterns();
        assert_eq!(patterns[0], "vendor/");
        assert_eq!(patterns.iter().filter(|p| *p == ".git/").count(), 1);

        assert_eq!(
            config.entities.types.indices,
            vec![IndexKind::Name, IndexKind::Members]
        );
        assert_eq!(config.entities.types.priority, PriorityKind::None);
        assert_eq!(config.entities.methods.indices, vec![IndexKind::SourceText]);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let err = DiffConfig::from_toml_str("[matcher]\nmin_height = \"tall\"").unwrap_err();
        assert!(matches!(err, crate::error::DiffError::Config(_)));
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(DiffConfig::load(dir.path()).matcher.min_height, 2);

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "not = [valid").unwrap();
        assert_eq!(DiffConfig::load(dir.path()).matcher.min_height, 2);

        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[pairing]\nrename_threshold = 0.8\n",
        )
        .unwrap();
        assert_eq!(DiffConfig::load(dir.path()).pairing.rename_threshold, 0.8);
    }
}
