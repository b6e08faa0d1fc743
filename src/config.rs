//! Settings for policycheck runs.
//!
//! Settings live in an optional YAML file next to the sources
//! (`policycheck.yaml` or `.policycheck.yaml`). Every field has a default,
//! so an empty file, or no file at all, enables every check against the
//! default rule file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::rules::{DEFAULT_RULES_PATH, RULES_ENV_VAR};

/// File names searched, in order, when no `--config` is given.
pub const DEFAULT_SETTINGS_NAMES: &[&str] = &["policycheck.yaml", ".policycheck.yaml"];

/// Top-level settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    /// Rule file location (overridden by the environment and `--rules`)
    #[serde(default)]
    pub rules: Option<PathBuf>,
    #[serde(default)]
    pub checks: Checks,
    /// Whether to include test sources in analysis (default: false)
    #[serde(default)]
    pub include_test_files: Option<bool>,
    /// Glob patterns for paths to exclude from analysis (e.g., "**/generated/**")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
}

impl Settings {
    /// Parse settings from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        // serde_yaml gives Null for an empty document
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Returns whether to include test files (defaults to false).
    pub fn should_include_test_files(&self) -> bool {
        self.include_test_files.unwrap_or(false)
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    /// Uses globset for matching, which supports `**` for recursive directory matching.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();

        for pattern in &self.excluded_paths {
            if let Ok(glob) = globset::Glob::new(pattern) {
                let matcher = glob.compile_matcher();
                if matcher.is_match(&*path_str) {
                    return true;
                }
            }
        }
        false
    }
}

/// Which evaluators run. Every check defaults to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Checks {
    #[serde(default = "default_true")]
    pub immutable: bool,
    #[serde(default = "default_true")]
    pub nullity: bool,
    #[serde(default = "default_true")]
    pub final_parameters: bool,
    #[serde(default = "default_true")]
    pub blacklist: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Checks {
    fn default() -> Self {
        Self {
            immutable: true,
            nullity: true,
            final_parameters: true,
            blacklist: true,
        }
    }
}

/// Where the rule file comes from.
///
/// Precedence: explicit path (`--rules`), then `POLICYCHECK_RULES`, then the
/// settings file, then `config/blacklist.xml`. Resolution is deferred until
/// the rule store is first needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulesSource {
    pub explicit: Option<PathBuf>,
    pub configured: Option<PathBuf>,
}

impl RulesSource {
    pub fn new(explicit: Option<PathBuf>, configured: Option<PathBuf>) -> Self {
        Self {
            explicit,
            configured,
        }
    }

    /// A source that always resolves to `path`.
    pub fn fixed(path: impl Into<PathBuf>) -> Self {
        Self::new(Some(path.into()), None)
    }

    /// Resolve against the process environment.
    pub fn resolve(&self) -> PathBuf {
        self.resolve_with(std::env::var_os(RULES_ENV_VAR).map(PathBuf::from))
    }

    /// Resolve with an explicit value for the environment variable.
    pub fn resolve_with(&self, env: Option<PathBuf>) -> PathBuf {
        self.explicit
            .clone()
            .or_else(|| env.filter(|p| !p.as_os_str().is_empty()))
            .or_else(|| self.configured.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RULES_PATH))
    }
}

/// Find a settings file in `dir`.
pub fn discover_settings(dir: &Path) -> Option<PathBuf> {
    DEFAULT_SETTINGS_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Validate settings for correctness.
pub fn validate(settings: &Settings) -> anyhow::Result<()> {
    if let Some(rules) = &settings.rules {
        if rules.as_os_str().is_empty() {
            anyhow::bail!("rules path must not be empty");
        }
    }

    // Validate excluded_paths glob patterns compile
    for pattern in &settings.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    Ok(())
}
