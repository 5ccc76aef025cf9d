//! Configuration file loading.
//!
//! The config is a TOML file naming exactly one remote store and the
//! tracked save directories:
//!
//! ```toml
//! [s3]
//! bucket = "saves"
//! access_key = "minioadmin"
//! secret_key = "minioadmin"
//! endpoint = "http://localhost:9000"
//!
//! [sync]
//! debounce_secs = 5
//!
//! [[items]]
//! name = "elden-ring"
//! dir = "/home/me/.local/share/elden-ring"
//! process = "eldenring.exe"
//! ```

use savesync_engine::{SyncOptions, TrackedItem};
use savesync_transport::{FtpTransport, S3Config, S3Transport, Transport};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// A configuration problem.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// The file is not valid TOML or misses required fields.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The remote store section is missing or ambiguous.
    #[error("{0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// S3-compatible store. Mutually exclusive with `ftp`.
    pub s3: Option<S3Section>,
    /// FTP store. Mutually exclusive with `s3`.
    pub ftp: Option<FtpSection>,
    /// Engine tuning.
    #[serde(default)]
    pub sync: SyncSection,
    /// Tracked save directories.
    #[serde(default)]
    pub items: Vec<ItemSection>,
}

/// `[s3]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3Section {
    /// Bucket name.
    pub bucket: String,
    /// Access key id.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Custom endpoint URL, for MinIO and other S3-compatible stores.
    pub endpoint: Option<String>,
    /// Region. Defaults to the transport's default when absent.
    pub region: Option<String>,
}

/// `[ftp]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FtpSection {
    /// Server address as `host:port`.
    pub addr: String,
    /// Login user.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Directory on the server under which snapshots are stored.
    #[serde(default)]
    pub sub_dir: String,
}

/// `[sync]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncSection {
    /// Directory for temporary archives.
    pub staging_dir: Option<PathBuf>,
    /// Watcher quiet period in seconds.
    pub debounce_secs: Option<u64>,
}

/// One `[[items]]` entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemSection {
    /// Logical name, used as the remote key prefix.
    pub name: String,
    /// Local save directory.
    pub dir: PathBuf,
    /// Executable name of the game, for sync deferral while it runs.
    pub process: Option<String>,
}

impl Config {
    /// Loads and validates a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.s3, &self.ftp) {
            (Some(_), Some(_)) => Err(ConfigError::Invalid(
                "config declares both [s3] and [ftp]; exactly one remote store is required"
                    .to_owned(),
            )),
            (None, None) => Err(ConfigError::Invalid(
                "config declares no remote store; add an [s3] or [ftp] section".to_owned(),
            )),
            _ => Ok(()),
        }
    }

    /// Connects to the configured remote store.
    pub fn connect(&self) -> Result<Arc<dyn Transport>, savesync_transport::TransportError> {
        if let Some(s3) = &self.s3 {
            let mut s3_config = S3Config::new(&s3.bucket, &s3.access_key, &s3.secret_key);
            if let Some(endpoint) = &s3.endpoint {
                s3_config = s3_config.with_endpoint(endpoint);
            }
            if let Some(region) = &s3.region {
                s3_config = s3_config.with_region(region);
            }
            return Ok(Arc::new(S3Transport::connect(s3_config)?));
        }
        // validate() guarantees one of the two sections is present.
        let ftp = self.ftp.as_ref().ok_or_else(|| {
            savesync_transport::TransportError::auth("no remote store configured")
        })?;
        Ok(Arc::new(FtpTransport::connect(
            &ftp.addr,
            &ftp.user,
            &ftp.password,
            &ftp.sub_dir,
        )?))
    }

    /// Engine options derived from the `[sync]` section.
    pub fn sync_options(&self) -> SyncOptions {
        let mut options = SyncOptions::new();
        if let Some(dir) = &self.sync.staging_dir {
            options = options.with_staging_dir(dir);
        }
        if let Some(secs) = self.sync.debounce_secs {
            options = options.with_debounce(Duration::from_secs(secs));
        }
        options
    }

    /// The tracked items.
    pub fn tracked_items(&self) -> Vec<TrackedItem> {
        self.items
            .iter()
            .map(|item| {
                let mut tracked = TrackedItem::new(&item.name, &item.dir);
                if let Some(process) = &item.process {
                    tracked = tracked.with_process(process);
                }
                tracked
            })
            .collect()
    }

    /// The watcher debounce interval.
    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.sync.debounce_secs.unwrap_or(5))
    }
}
