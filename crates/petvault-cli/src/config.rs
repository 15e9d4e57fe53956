use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use color_eyre::Result;
use dirs::config_dir;
use petvault_core::config::CryptoConfig;
use petvault_persist::PersistenceSettings;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SECRET_ENV: &str = "PETVAULT_SECRET";

/// User-level configuration loaded from `~/.config/petvault/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Override for the save directory.
    pub data_dir: Option<PathBuf>,
    /// Quiet period before a change is written, in milliseconds.
    pub debounce_ms: Option<u64>,
    #[serde(default)]
    pub crypto: CryptoConfig,
    #[serde(default)]
    pub secret: SecretConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct SecretConfig {
    #[serde(default)]
    pub source: SecretSource,
    /// Variable read when `source = "env"`.
    pub env_var: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SecretSource {
    /// Device key generated once and kept in the OS keychain.
    #[default]
    Keyring,
    Env,
}

impl SecretConfig {
    pub fn env_var(&self) -> &str {
        self.env_var.as_deref().unwrap_or(DEFAULT_SECRET_ENV)
    }
}

impl Config {
    pub fn persistence_settings(&self) -> PersistenceSettings {
        let mut settings = PersistenceSettings::new(self.crypto);
        if let Some(ms) = self.debounce_ms {
            settings.debounce = Duration::from_millis(ms);
        }
        settings
    }
}

/// Load config from the default path; if missing, return defaults.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("petvault").join("config.toml"))
}

/// Write the config to the default path unless a file is already there.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    write_to_path_if_missing(config, &default_path()?)
}

fn write_to_path_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use petvault_persist::{DEFAULT_DEBOUNCE, DEFAULT_STORAGE_KEY};

    use super::*;

    #[test]
    fn returns_default_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_from_path(dir.path().join("config.toml")).expect("load");
        assert_eq!(cfg, Config::default());
        assert!(cfg.crypto.enabled);
        assert_eq!(cfg.secret.source, SecretSource::Keyring);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "  \n").expect("write");
        assert_eq!(load_from_path(&path).expect("load"), Config::default());
    }

    #[test]
    fn parses_custom_config() {
        let contents = r#"
            data_dir = "/tmp/petvault-data"
            debounce_ms = 250
            [crypto]
            enabled = true
            key_derivation_iterations = 200000
            [secret]
            source = "env"
            env_var = "MY_PET_SECRET"
        "#;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).expect("write temp config");

        let cfg = load_from_path(&path).expect("load");
        assert_eq!(
            cfg,
            Config {
                data_dir: Some(PathBuf::from("/tmp/petvault-data")),
                debounce_ms: Some(250),
                crypto: CryptoConfig::with_iterations(
                    NonZeroU32::new(200_000).expect("non-zero")
                ),
                secret: SecretConfig {
                    source: SecretSource::Env,
                    env_var: Some("MY_PET_SECRET".into()),
                },
            }
        );
        assert_eq!(cfg.secret.env_var(), "MY_PET_SECRET");
    }

    #[test]
    fn partial_crypto_table_keeps_other_defaults() {
        let cfg: Config = toml::from_str("[crypto]\nenabled = false\n").expect("parse");
        assert_eq!(cfg.crypto, CryptoConfig::disabled());
        assert_eq!(cfg.secret.env_var(), DEFAULT_SECRET_ENV);
    }

    #[test]
    fn zero_iterations_are_rejected() {
        let parsed: Result<Config, _> =
            toml::from_str("[crypto]\nkey_derivation_iterations = 0\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn persistence_settings_follow_config() {
        let defaults = Config::default().persistence_settings();
        assert_eq!(defaults.debounce, DEFAULT_DEBOUNCE);
        assert_eq!(defaults.storage_key, DEFAULT_STORAGE_KEY);

        let cfg = Config {
            debounce_ms: Some(50),
            crypto: CryptoConfig::disabled(),
            ..Config::default()
        };
        let settings = cfg.persistence_settings();
        assert_eq!(settings.debounce, Duration::from_millis(50));
        assert!(!settings.crypto.enabled);
    }

    #[test]
    fn write_default_creates_file_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            data_dir: Some(PathBuf::from("/tmp/petvault-data")),
            ..Config::default()
        };

        write_to_path_if_missing(&cfg, &path).expect("write should succeed");
        let other = Config::default();
        let second = write_to_path_if_missing(&other, &path).expect("second write ok");
        assert_eq!(second, path);
        let loaded = load_from_path(&path).expect("load");
        assert_eq!(loaded, cfg);
    }
}
