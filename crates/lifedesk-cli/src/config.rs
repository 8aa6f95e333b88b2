use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use lifedesk_store::{FileStore, DEFAULT_AUTOSAVE_DELAY, DEFAULT_QUOTA_BYTES, DEFAULT_STORE_KEY};

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub store_key: String,
    /// `None` disables the size limit
    pub quota_bytes: Option<usize>,
    pub autosave_delay: Duration,
    pub app_name: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = match env::var("LIFEDESK_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => FileStore::default_dir().context("Could not find data directory")?,
        };

        let quota_bytes: usize = env::var("LIFEDESK_QUOTA_BYTES")
            .unwrap_or_else(|_| DEFAULT_QUOTA_BYTES.to_string())
            .parse()
            .context("LIFEDESK_QUOTA_BYTES must be a number of bytes")?;

        let autosave_ms: u64 = env::var("LIFEDESK_AUTOSAVE_MS")
            .unwrap_or_else(|_| DEFAULT_AUTOSAVE_DELAY.as_millis().to_string())
            .parse()
            .context("LIFEDESK_AUTOSAVE_MS must be a number of milliseconds")?;

        Ok(Self {
            data_dir,
            store_key: env::var("LIFEDESK_STORE_KEY")
                .unwrap_or_else(|_| DEFAULT_STORE_KEY.to_string()),
            quota_bytes: (quota_bytes > 0).then_some(quota_bytes),
            autosave_delay: Duration::from_millis(autosave_ms),
            app_name: env::var("LIFEDESK_APP_NAME").unwrap_or_else(|_| "LifeDesk".to_string()),
        })
    }

    pub fn file_store(&self) -> FileStore {
        let store = FileStore::new(&self.data_dir);
        match self.quota_bytes {
            Some(quota) => store.with_quota(quota),
            None => store,
        }
    }
}
