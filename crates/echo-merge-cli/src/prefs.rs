// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! On-disk settings: `prefs.json` for the CLI defaults and one
//! `profiles/<name>.json` per saved merge profile.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use echo_merge::{ConfigError, ConfigStore};
use serde::{Deserialize, Serialize};

/// Profile used when neither `--profile` nor the prefs name one.
pub const DEFAULT_PROFILE: &str = "default";

/// Defaults applied when a flag is not given on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliPrefs {
    /// Elements requested from the merge per demand signal.
    pub batch: u64,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Merge profile loaded when `--profile` is absent.
    pub profile: String,
}

impl Default for CliPrefs {
    fn default() -> Self {
        Self {
            batch: 16,
            log_filter: "info".to_owned(),
            profile: DEFAULT_PROFILE.to_owned(),
        }
    }
}

/// The CLI's config directory.
#[derive(Debug)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    /// Opens the user config directory (e.g. `~/.config/echo-merge`).
    pub fn locate() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "echo-merge").ok_or_else(|| {
            ConfigError::Unavailable("no home directory to keep settings in".into())
        })?;
        Self::at(proj.config_dir())
    }

    /// Opens `root`, creating it if needed.
    pub fn at(root: &Path) -> Result<Self, ConfigError> {
        fs::create_dir_all(root.join("profiles"))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Reads `prefs.json`, or `None` before the first run.
    pub fn load_prefs(&self) -> Result<Option<CliPrefs>, ConfigError> {
        let Some(bytes) = read_if_present(&self.prefs_path())? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| ConfigError::Malformed {
                profile: "prefs".to_owned(),
                source,
            })
    }

    /// Writes `prefs.json`.
    pub fn save_prefs(&self, prefs: &CliPrefs) -> Result<(), ConfigError> {
        let bytes = serde_json::to_vec_pretty(prefs).map_err(|source| ConfigError::Malformed {
            profile: "prefs".to_owned(),
            source,
        })?;
        fs::write(self.prefs_path(), bytes)?;
        Ok(())
    }

    fn prefs_path(&self) -> PathBuf {
        self.root.join("prefs.json")
    }

    fn profile_path(&self, profile: &str) -> PathBuf {
        self.root.join("profiles").join(format!("{profile}.json"))
    }
}

impl ConfigStore for ConfigDir {
    fn read(&self, profile: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        read_if_present(&self.profile_path(profile))
    }

    fn write(&self, profile: &str, blob: &[u8]) -> Result<(), ConfigError> {
        fs::write(self.profile_path(profile), blob)?;
        Ok(())
    }
}

fn read_if_present(path: &Path) -> Result<Option<Vec<u8>>, ConfigError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(ConfigError::Io(err)),
    }
}
