//! Configuration module
//!
//! Settings live in a single human-editable `config.json` under the app
//! config directory. Values are resolved with a fixed precedence:
//! explicit flag > environment variable > stored default > fallback.
//!
//! There are no module-level singletons: the process builds one [`Env`]
//! snapshot and one [`Paths`] record at startup and passes them down.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use crate::remote::types::{ContextSize, SearchMode};

pub const APP_NAME: &str = "plx";
pub const DEFAULT_MODEL: &str = "sonar";

pub const ENV_API_KEY: &str = "PLX_API_KEY";
pub const ENV_MODEL: &str = "PLX_MODEL";
pub const ENV_CONFIG_DIR: &str = "PLX_CONFIG_DIR";

/// Recognized keys under `defaults` for `plx config set`.
pub const DEFAULT_KEYS: &[&str] = &[
    "model",
    "stream",
    "searchMode",
    "contextSize",
    "language",
    "safeSearch",
];

/// Snapshot of the environment variables plx cares about.
///
/// Captured once at startup so resolution logic can be tested without
/// mutating process state.
#[derive(Debug, Clone, Default)]
pub struct Env {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub config_dir: Option<PathBuf>,
}

impl Env {
    pub fn from_process() -> Self {
        Self {
            api_key: std::env::var(ENV_API_KEY).ok().filter(|v| !v.is_empty()),
            model: std::env::var(ENV_MODEL).ok().filter(|v| !v.is_empty()),
            config_dir: std::env::var(ENV_CONFIG_DIR)
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Resolved filesystem locations for config, history, and threads.
#[derive(Debug, Clone)]
pub struct Paths {
    config_dir: PathBuf,
}

impl Paths {
    /// Resolve the config directory: `PLX_CONFIG_DIR` env override first,
    /// then the platform config dir (XDG on Linux).
    pub fn resolve(env: &Env) -> Self {
        if let Some(dir) = &env.config_dir {
            return Self {
                config_dir: dir.clone(),
            };
        }

        if let Some(proj) = ProjectDirs::from("", "", APP_NAME) {
            return Self {
                config_dir: proj.config_dir().to_path_buf(),
            };
        }

        Self {
            config_dir: PathBuf::from(format!(".{APP_NAME}")),
        }
    }

    /// Use an explicit directory (tests).
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    pub fn history_file(&self) -> PathBuf {
        self.config_dir.join("history.json")
    }

    pub fn threads_dir(&self) -> PathBuf {
        self.config_dir.join("threads")
    }

    /// Pre-1.0 config location (`~/.plx/config.json`).
    pub fn legacy_config_file() -> Option<PathBuf> {
        BaseDirs::new().map(|b| b.home_dir().join(".plx").join("config.json"))
    }
}

/// Persisted settings (`config.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Defaults>,
}

/// Named default option values.
///
/// Unknown keys are carried in `extra` so hand-edited files round-trip
/// without loss; they are never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Defaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_mode: Option<SearchMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_size: Option<ContextSize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_search: Option<bool>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Defaults {
    /// Set a recognized default from its CLI string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "model" => self.model = Some(value.to_string()),
            "stream" => self.stream = Some(parse_bool(value)?),
            "searchMode" => {
                self.search_mode = Some(
                    SearchMode::from_str(value, true)
                        .map_err(|_| anyhow::anyhow!("Invalid searchMode: {value}. Use web, academic, or sec."))?,
                )
            }
            "contextSize" => {
                self.context_size = Some(
                    ContextSize::from_str(value, true)
                        .map_err(|_| anyhow::anyhow!("Invalid contextSize: {value}. Use low, medium, or high."))?,
                )
            }
            "language" => self.language = Some(value.to_string()),
            "safeSearch" => self.safe_search = Some(parse_bool(value)?),
            _ => anyhow::bail!(
                "Unknown config key: {key}. Valid keys: {}",
                DEFAULT_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Get a recognized default as a display string.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "model" => self.model.clone(),
            "stream" => self.stream.map(|v| v.to_string()),
            "searchMode" => self.search_mode.map(|v| v.to_string()),
            "contextSize" => self.context_size.map(|v| v.to_string()),
            "language" => self.language.clone(),
            "safeSearch" => self.safe_search.map(|v| v.to_string()),
            _ => None,
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => anyhow::bail!("Expected true or false, got: {other}"),
    }
}

impl Settings {
    /// Load settings, or an empty record if the file is absent or corrupt.
    ///
    /// Read and parse failures are swallowed: for a local cache we prefer
    /// availability over strict correctness.
    pub fn load(paths: &Paths) -> Self {
        if let Some(legacy) = Paths::legacy_config_file() {
            Self::migrate_legacy(&legacy, paths);
        }

        match fs::read_to_string(paths.config_file()) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|err| {
                tracing::debug!(%err, "config.json unparsable, starting empty");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Serialize the full record back to disk. No merge: callers must
    /// load, mutate, save.
    pub fn save(&self, paths: &Paths) -> Result<()> {
        fs::create_dir_all(paths.config_dir()).with_context(|| {
            format!("Failed to create config dir {}", paths.config_dir().display())
        })?;
        let data = serde_json::to_string_pretty(self)?;
        fs::write(paths.config_file(), data)
            .with_context(|| format!("Failed to write {}", paths.config_file().display()))?;
        tracing::debug!(path = %paths.config_file().display(), "settings saved");
        Ok(())
    }

    /// Copy the API key (only) forward from a pre-1.0 config file, once.
    ///
    /// Runs only when the current config file does not exist yet. Failures
    /// are ignored: the user can re-enter the key manually.
    pub(crate) fn migrate_legacy(legacy: &Path, paths: &Paths) {
        let current = paths.config_file();
        if !legacy.exists() || current.exists() {
            return;
        }

        let migrate = || -> Result<()> {
            let data = fs::read_to_string(legacy)?;
            let old: serde_json::Value = serde_json::from_str(&data)?;
            let migrated = Settings {
                api_key: old
                    .get("apiKey")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                defaults: None,
            };
            migrated.save(paths)
        };

        if let Err(err) = migrate() {
            tracing::debug!(%err, "legacy config migration failed, ignoring");
        }
    }

    /// API key precedence: explicit flag > `PLX_API_KEY` > stored key.
    pub fn resolve_api_key(&self, explicit: Option<&str>, env: &Env) -> Option<String> {
        explicit
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .or_else(|| env.api_key.clone())
            .or_else(|| self.api_key.clone())
    }

    /// Model precedence: explicit flag > `PLX_MODEL` > stored default >
    /// the hard-coded fallback. Never empty.
    pub fn resolve_model(&self, explicit: Option<&str>, env: &Env) -> String {
        explicit
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .or_else(|| env.model.clone())
            .or_else(|| self.defaults.as_ref().and_then(|d| d.model.clone()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings_with(api_key: Option<&str>, model: Option<&str>) -> Settings {
        Settings {
            api_key: api_key.map(str::to_string),
            defaults: model.map(|m| Defaults {
                model: Some(m.to_string()),
                ..Defaults::default()
            }),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let paths = Paths::at(dir.path());

        let mut defaults = Defaults {
            model: Some("sonar-pro".into()),
            stream: Some(false),
            search_mode: Some(SearchMode::Academic),
            context_size: Some(ContextSize::High),
            language: Some("en".into()),
            safe_search: Some(true),
            ..Defaults::default()
        };
        defaults
            .extra
            .insert("futureKnob".into(), serde_json::json!(42));

        let settings = Settings {
            api_key: Some("pplx-abc123".into()),
            defaults: Some(defaults),
        };
        settings.save(&paths).unwrap();

        let loaded = Settings::load(&paths);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn unknown_default_keys_are_preserved() {
        let dir = tempdir().unwrap();
        let paths = Paths::at(dir.path());

        fs::create_dir_all(paths.config_dir()).unwrap();
        fs::write(
            paths.config_file(),
            r#"{"defaults":{"model":"sonar","someFutureKey":"kept"}}"#,
        )
        .unwrap();

        let loaded = Settings::load(&paths);
        loaded.save(&paths).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(paths.config_file()).unwrap()).unwrap();
        assert_eq!(raw["defaults"]["someFutureKey"], "kept");
    }

    #[test]
    fn save_is_a_full_overwrite_not_a_merge() {
        let dir = tempdir().unwrap();
        let paths = Paths::at(dir.path());

        settings_with(Some("k1"), None).save(&paths).unwrap();
        settings_with(None, Some("sonar-pro")).save(&paths).unwrap();

        let loaded = Settings::load(&paths);
        assert_eq!(loaded.api_key, None);
        assert_eq!(loaded.defaults.unwrap().model.as_deref(), Some("sonar-pro"));
    }

    #[test]
    fn missing_or_corrupt_config_loads_empty() {
        let dir = tempdir().unwrap();
        let paths = Paths::at(dir.path());
        assert_eq!(Settings::load(&paths), Settings::default());

        fs::create_dir_all(paths.config_dir()).unwrap();
        fs::write(paths.config_file(), "{not json").unwrap();
        assert_eq!(Settings::load(&paths), Settings::default());
    }

    #[test]
    fn api_key_precedence_flag_env_stored() {
        let stored = settings_with(Some("stored"), None);
        let env = Env {
            api_key: Some("env".into()),
            ..Env::default()
        };

        assert_eq!(
            stored.resolve_api_key(Some("flag"), &env).as_deref(),
            Some("flag")
        );
        assert_eq!(stored.resolve_api_key(None, &env).as_deref(), Some("env"));
        assert_eq!(
            stored.resolve_api_key(None, &Env::default()).as_deref(),
            Some("stored")
        );
        assert_eq!(
            Settings::default().resolve_api_key(None, &Env::default()),
            None
        );
    }

    #[test]
    fn model_precedence_ends_in_fallback() {
        let stored = settings_with(None, Some("sonar-pro"));
        let env = Env {
            model: Some("sonar-reasoning-pro".into()),
            ..Env::default()
        };

        assert_eq!(stored.resolve_model(Some("flag-model"), &env), "flag-model");
        assert_eq!(stored.resolve_model(None, &env), "sonar-reasoning-pro");
        assert_eq!(stored.resolve_model(None, &Env::default()), "sonar-pro");
        assert_eq!(
            Settings::default().resolve_model(None, &Env::default()),
            DEFAULT_MODEL
        );
    }

    #[test]
    fn legacy_migration_copies_api_key_only() {
        let dir = tempdir().unwrap();
        let legacy = dir.path().join("old").join("config.json");
        fs::create_dir_all(legacy.parent().unwrap()).unwrap();
        fs::write(
            &legacy,
            r#"{"apiKey":"old-key","defaults":{"model":"sonar-pro"}}"#,
        )
        .unwrap();

        let paths = Paths::at(dir.path().join("new"));
        Settings::migrate_legacy(&legacy, &paths);

        let migrated = Settings::load(&paths);
        assert_eq!(migrated.api_key.as_deref(), Some("old-key"));
        assert_eq!(migrated.defaults, None);
    }

    #[test]
    fn legacy_migration_skipped_when_current_config_exists() {
        let dir = tempdir().unwrap();
        let legacy = dir.path().join("old.json");
        fs::write(&legacy, r#"{"apiKey":"old-key"}"#).unwrap();

        let paths = Paths::at(dir.path().join("new"));
        settings_with(Some("current"), None).save(&paths).unwrap();

        Settings::migrate_legacy(&legacy, &paths);
        assert_eq!(Settings::load(&paths).api_key.as_deref(), Some("current"));
    }

    #[test]
    fn defaults_set_validates_keys_and_values() {
        let mut d = Defaults::default();
        d.set("model", "sonar-pro").unwrap();
        d.set("stream", "false").unwrap();
        d.set("searchMode", "academic").unwrap();
        d.set("contextSize", "high").unwrap();

        assert!(d.set("stream", "maybe").is_err());
        assert!(d.set("searchMode", "bogus").is_err());
        assert!(d.set("nonsense", "x").is_err());

        assert_eq!(d.get("stream").as_deref(), Some("false"));
        assert_eq!(d.get("searchMode").as_deref(), Some("academic"));
        assert_eq!(d.get("nonsense"), None);
    }
}
