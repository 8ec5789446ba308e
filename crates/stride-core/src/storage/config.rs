//! TOML-based application configuration.
//!
//! Stores:
//! - Location watch and ticker settings
//! - Profile values used for derived metrics
//! - Storage keys
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use super::history::DEFAULT_HISTORY_KEY;
use crate::error::ConfigError;
use crate::location::{AccuracyTier, WatchOptions};
use crate::metrics::DEFAULT_KCAL_PER_KM;

/// Location watch and ticker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default)]
    pub accuracy_tier: AccuracyTier,
    #[serde(default = "default_min_distance_meters")]
    pub min_distance_meters: f64,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Capacity of the bounded inbox between producers and the session.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// Runner profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_kcal_per_km")]
    pub kcal_per_km: f64,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_history_key")]
    pub history_key: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

// Default functions
fn default_min_distance_meters() -> f64 {
    5.0
}
fn default_min_interval_ms() -> u64 {
    1000
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_queue_capacity() -> usize {
    64
}
fn default_kcal_per_km() -> f64 {
    DEFAULT_KCAL_PER_KM
}
fn default_history_key() -> String {
    DEFAULT_HISTORY_KEY.into()
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            accuracy_tier: AccuracyTier::default(),
            min_distance_meters: default_min_distance_meters(),
            min_interval_ms: default_min_interval_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            kcal_per_km: default_kcal_per_km(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_key: default_history_key(),
        }
    }
}

impl TrackingConfig {
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            accuracy: self.accuracy_tier,
            min_distance_meters: self.min_distance_meters,
            min_interval_ms: self.min_interval_ms,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let unknown = || ConfigError::UnknownKey(key.to_string());

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| {
                                    invalid(format!("cannot parse '{value}' as number"))
                                })?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(unknown());
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    /// Returns `InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        };
        let t = &self.tracking;
        if !t.min_distance_meters.is_finite() || t.min_distance_meters < 0.0 {
            return Err(invalid("tracking.min_distance_meters", "must be >= 0"));
        }
        if t.min_interval_ms == 0 {
            return Err(invalid("tracking.min_interval_ms", "must be > 0"));
        }
        if t.tick_interval_ms == 0 {
            return Err(invalid("tracking.tick_interval_ms", "must be > 0"));
        }
        if t.queue_capacity == 0 {
            return Err(invalid("tracking.queue_capacity", "must be > 0"));
        }
        if !self.profile.kcal_per_km.is_finite() || self.profile.kcal_per_km < 0.0 {
            return Err(invalid("profile.kcal_per_km", "must be >= 0"));
        }
        if self.storage.history_key.is_empty() {
            return Err(invalid("storage.history_key", "must not be empty"));
        }
        Ok(())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::DataDir(e.to_string()))?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed,
    /// or if the default config cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(err) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: err.to_string(),
            }),
        }
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse
    /// or validate. The config is left unchanged on error.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.update(key, value)?;
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_watch_contract() {
        let cfg = Config::default();
        let opts = cfg.tracking.watch_options();
        assert_eq!(opts.min_distance_meters, 5.0);
        assert_eq!(opts.min_interval_ms, 1000);
        assert_eq!(opts.accuracy, AccuracyTier::BestForNavigation);
        assert_eq!(cfg.tracking.tick_interval(), Duration::from_secs(1));
        assert_eq!(cfg.storage.history_key, "run_history");
    }

    #[test]
    fn get_by_dotted_key() {
        let cfg = Config::default();
        assert_eq!(cfg.get("tracking.min_interval_ms").as_deref(), Some("1000"));
        assert_eq!(
            cfg.get("tracking.accuracy_tier").as_deref(),
            Some("best_for_navigation")
        );
        assert!(cfg.get("tracking.nope").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn update_parses_and_validates() {
        let mut cfg = Config::default();
        cfg.update("tracking.min_distance_meters", "2.5").unwrap();
        assert_eq!(cfg.tracking.min_distance_meters, 2.5);
        cfg.update("tracking.accuracy_tier", "balanced").unwrap();
        assert_eq!(cfg.tracking.accuracy_tier, AccuracyTier::Balanced);

        assert!(matches!(
            cfg.update("tracking.tick_interval_ms", "0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.update("tracking.accuracy_tier", "perfect"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.update("tracking", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.update("bogus.key", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert_eq!(cfg.tracking.tick_interval_ms, 1000);
    }

    #[test]
    fn load_writes_defaults_then_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.update("profile.kcal_per_km", "70").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().profile.kcal_per_km, 70.0);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tracking]\nmin_distance_meters = 1.0\n").unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.tracking.min_distance_meters, 1.0);
        assert_eq!(cfg.tracking.queue_capacity, 64);
        assert_eq!(cfg.profile.kcal_per_km, 65.0);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tracking = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
