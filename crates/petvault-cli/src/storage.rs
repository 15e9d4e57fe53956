use std::{path::PathBuf, sync::Arc};

use crate::config::{Config, SecretSource};
use color_eyre::Result;
use dirs::data_dir;
use petvault_storage::{
    file_store::FileKeyValueStore,
    secret::{EnvSecretProvider, KeyringSecretProvider, SecretProvider},
};
use tracing::debug;

const KEYRING_SERVICE: &str = "petvault";
const KEYRING_ACCOUNT: &str = "save-key";

/// Resolve the default data directory for saves.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("petvault"))
}

/// Build the save store, honouring a `data_dir` override.
pub fn store_from_config(config: &Config) -> Result<FileKeyValueStore> {
    let root = match &config.data_dir {
        Some(root) => root.clone(),
        None => default_data_dir()?,
    };
    debug!(?root, "initializing save store");
    Ok(FileKeyValueStore::new(root))
}

/// Pick where the save secret comes from.
pub fn secret_provider_from_config(config: &Config) -> Arc<dyn SecretProvider> {
    match config.secret.source {
        SecretSource::Keyring => Arc::new(KeyringSecretProvider::new(
            KEYRING_SERVICE,
            KEYRING_ACCOUNT,
        )),
        SecretSource::Env => Arc::new(EnvSecretProvider::new(config.secret.env_var())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_override_is_used() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config {
            data_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let store = store_from_config(&cfg).expect("store");
        assert_eq!(store.root(), dir.path());
    }

    #[tokio::test]
    async fn env_source_reads_configured_variable() {
        let mut cfg = Config::default();
        cfg.secret.source = SecretSource::Env;
        cfg.secret.env_var = Some("PETVAULT_CLI_TEST_UNSET_SECRET".into());

        let err = secret_provider_from_config(&cfg)
            .secret()
            .await
            .expect_err("variable is never set");
        assert!(err.to_string().contains("PETVAULT_CLI_TEST_UNSET_SECRET"));
    }
}
