// # Config Store
//
// Lazily loaded, cached handle to the persisted configuration.
//
// ## Lifecycle
//
// - Load on first access: the file is read and parsed under a lock, so
//   concurrent readers (scheduler and an editing UI) never parse twice
// - Invalidate on save: `save()` writes atomically, then drops the cache
//   so the next `get()` rereads the file
// - Load failures are returned, never cached: a later call retries
//
// ## File Format
//
// ```json
// {
//   "dnsConf": [
//     {
//       "ipv4": { "enable": true, "getType": "url", "url": "https://api.ipify.org", "domains": ["home.example.com"] },
//       "dns": { "name": "alidns", "id": "...", "secret": "..." },
//       "ttl": 600
//     }
//   ],
//   "webhook": { "url": "", "requestBody": "", "headers": [] }
// }
// ```

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Cached configuration handle
///
/// Cloning is not supported; share it behind an `Arc`.
pub struct ConfigStore {
    /// Path to the JSON file
    path: PathBuf,

    /// Cached configuration, `None` until first load or after a save
    cached: Mutex<Option<Arc<Config>>>,
}

impl ConfigStore {
    /// Create a store for the given path without touching the filesystem
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cached: Mutex::new(None),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the configuration, loading it on first access
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<Config>)`: The cached or freshly loaded configuration
    /// - `Err(Error::Config)`: The file is missing, unreadable or unparsable
    pub async fn get(&self) -> Result<Arc<Config>> {
        let mut cached = self.cached.lock().await;
        if let Some(config) = cached.as_ref() {
            return Ok(Arc::clone(config));
        }

        let config = Arc::new(Self::load(&self.path).await?);
        tracing::debug!("Loaded configuration from {}", self.path.display());
        *cached = Some(Arc::clone(&config));
        Ok(config)
    }

    /// Persist the configuration and invalidate the cache
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration to write
    pub async fn save(&self, config: &Config) -> Result<()> {
        let mut cached = self.cached.lock().await;

        let json = serde_json::to_string_pretty(config)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create config directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        // Write to temporary file first
        let temp_path = self.temp_path();
        if let Err(e) = Self::write_temp(&temp_path, json.as_bytes()).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        // Atomic rename (temp -> actual)
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::config(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            )));
        }

        *cached = None;
        tracing::info!("Configuration saved to {}", self.path.display());
        Ok(())
    }

    /// Drop the cached configuration so the next `get()` rereads the file
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn write_temp(temp_path: &Path, contents: &[u8]) -> Result<()> {
        let mut file = fs::File::create(temp_path).await.map_err(|e| {
            Error::config(format!(
                "Failed to create temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;
        file.write_all(contents).await.map_err(|e| {
            Error::config(format!(
                "Failed to write to temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;
        file.flush().await.map_err(|e| {
            Error::config(format!(
                "Failed to flush temp file {}: {}",
                temp_path.display(),
                e
            ))
        })
    }

    async fn load(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path).await.map_err(|e| {
            Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DnsCredentials, DnsEntry};
    use tempfile::tempdir;

    fn sample(name: &str) -> Config {
        Config {
            dns_conf: vec![DnsEntry {
                dns: DnsCredentials {
                    name: name.to_string(),
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_error_and_not_cached() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ddns_config.json");
        let store = ConfigStore::new(&path);

        assert!(matches!(store.get().await, Err(Error::Config(_))));

        // A file appearing later is picked up without an explicit invalidate
        fs::write(&path, serde_json::to_string(&sample("dnspod")).unwrap())
            .await
            .unwrap();
        let config = store.get().await.unwrap();
        assert_eq!(config.dns_conf[0].dns.name, "dnspod");
    }

    #[tokio::test]
    async fn test_get_is_cached_until_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ddns_config.json");
        let store = ConfigStore::new(&path);

        store.save(&sample("alidns")).await.unwrap();
        let first = store.get().await.unwrap();
        assert_eq!(first.dns_conf[0].dns.name, "alidns");

        // Edited behind the store's back: the cache still wins
        fs::write(&path, serde_json::to_string(&sample("cloudflare")).unwrap())
            .await
            .unwrap();
        let second = store.get().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // Saving invalidates
        store.save(&sample("porkbun")).await.unwrap();
        let third = store.get().await.unwrap();
        assert_eq!(third.dns_conf[0].dns.name, "porkbun");
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ddns_config.json");
        let store = ConfigStore::new(&path);

        store.save(&sample("alidns")).await.unwrap();
        let _ = store.get().await.unwrap();

        fs::write(&path, serde_json::to_string(&sample("godaddy")).unwrap())
            .await
            .unwrap();
        store.invalidate().await;
        assert_eq!(store.get().await.unwrap().dns_conf[0].dns.name, "godaddy");
    }

    #[tokio::test]
    async fn test_unparsable_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ddns_config.json");
        fs::write(&path, b"{ not json").await.unwrap();

        let store = ConfigStore::new(&path);
        assert!(matches!(store.get().await, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("ddns_config.json");
        let store = ConfigStore::new(&path);

        store.save(&sample("alidns")).await.unwrap();
        assert!(path.exists());
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_failed_save_removes_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ddns_config.json");
        // A directory in the way makes the rename fail after the temp file is written
        fs::create_dir(&path).await.unwrap();
        let store = ConfigStore::new(&path);

        let err = store.save(&sample("alidns")).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!store.temp_path().exists());
        assert!(path.is_dir());
    }
}
