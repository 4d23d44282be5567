use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::cli::GlobalArgs;
use crate::error::{ConfigError, StoreError};
use crate::platform;
use crate::scan::profile::ProfileSource;
use crate::store::SnapshotStore;

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Profile directory used when `--profile` is not given.
    pub profile: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    /// Host for cookies that carry no domain.
    pub host: Option<String>,
    pub json: bool,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io { path: path.to_path_buf(), source });
            }
        };

        toml::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Toml { path: path.to_path_buf(), source })
    }
}

pub struct Config {
    pub profile: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub host: String,
    pub json_output: bool,
    pub verbose: bool,
}

impl Config {
    /// Command-line flags layered over the config file, if one exists.
    pub fn load(global: &GlobalArgs) -> Result<Self, ConfigError> {
        let file = match platform::config_path() {
            Some(path) => {
                let file = FileConfig::read(&path)?;
                if file.is_some() {
                    debug!("loaded config from {}", path.display());
                }
                file.unwrap_or_default()
            }
            None => FileConfig::default(),
        };

        Ok(Self::from_parts(global, file))
    }

    pub fn from_parts(global: &GlobalArgs, file: FileConfig) -> Self {
        Config {
            profile: file.profile.map(|p| platform::expand_tilde(&p)),
            db_path: global
                .db
                .clone()
                .or_else(|| file.db_path.map(|p| platform::expand_tilde(&p))),
            host: file.host.unwrap_or_else(|| "localhost".to_string()),
            json_output: file.json,
            verbose: global.verbose,
        }
    }

    pub fn with_profile(mut self, profile: Option<&PathBuf>) -> Self {
        if let Some(p) = profile {
            self.profile = Some(p.clone());
        }
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json_output |= json;
        self
    }

    pub fn profile_source(&self) -> Option<ProfileSource> {
        self.profile
            .as_ref()
            .map(|p| ProfileSource::new(p).with_host(self.host.clone()))
    }

    pub fn open_store(&self) -> Result<SnapshotStore, StoreError> {
        match &self.db_path {
            Some(path) => SnapshotStore::open(path),
            None => SnapshotStore::open_default(),
        }
    }
}

/// Parse a history age filter such as "7d" or "90m".
pub fn parse_since(input: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(input).map_err(|source| ConfigError::Duration {
        input: input.to_string(),
        source,
    })
}
