use chrono::{DateTime, Utc};
use docstore_remote::DEFAULT_SPACE_MAX;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Port the mount server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 4918;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Settings of a [`DocFs`](crate::DocFs).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocFsConfig {
    /// Deadline for every single remote call, in seconds. No deadline when
    /// unset.
    pub call_timeout_secs: Option<u64>,
}

impl DocFsConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }
}

/// Configuration of the `docstore-mount` server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    pub port: u16,
    /// Local directory copied into the store at startup.
    pub seed_dir: Option<PathBuf>,
    /// Subscription date reported by the store profile. Defaults to now.
    pub subscription_date: Option<DateTime<Utc>>,
    /// Quota reported by the store profile, in bytes.
    pub space_max: u64,
    pub fs: DocFsConfig,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            seed_dir: None,
            subscription_date: None,
            space_max: DEFAULT_SPACE_MAX,
            fs: DocFsConfig::default(),
        }
    }
}

impl MountConfig {
    /// Read a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = MountConfig::from_toml("").unwrap();
        assert_eq!(config, MountConfig::default());
        assert_eq!(config.port, 4918);
        assert_eq!(config.fs.call_timeout(), None);
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
port = 8080
seed_dir = "/srv/seed"
subscription_date = "2020-05-01T00:00:00Z"
space_max = 1024

[fs]
call_timeout_secs = 15
"#
        )
        .unwrap();

        let config = MountConfig::load(file.path()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.seed_dir, Some(PathBuf::from("/srv/seed")));
        assert_eq!(
            config.subscription_date.unwrap().to_rfc3339(),
            "2020-05-01T00:00:00+00:00"
        );
        assert_eq!(config.space_max, 1024);
        assert_eq!(config.fs.call_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            MountConfig::from_toml("port = \"not a number\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            MountConfig::load("/nonexistent/docstore.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
