// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Merge settings and where they are kept.
//!
//! Settings are grouped into named profiles. A [`ProfileStore`] reads and
//! writes one JSON-encoded [`MergeConfig`] per profile through any
//! [`ConfigStore`] backend (the CLI keeps them under the platform config dir).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-merge runtime settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Overrides the strategy name in tracing spans.
    pub name: Option<String>,
    /// Logs every dispatched event and state transition at `debug`.
    pub trace_transitions: bool,
}

impl MergeConfig {
    /// Sets the span name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Enables per-transition logging.
    pub fn with_trace_transitions(mut self, enabled: bool) -> Self {
        self.trace_transitions = enabled;
        self
    }
}

/// Blob storage backing a [`ProfileStore`], keyed by profile name.
pub trait ConfigStore {
    /// Reads the blob stored for `profile`; `Ok(None)` when there is none.
    fn read(&self, profile: &str) -> Result<Option<Vec<u8>>, ConfigError>;
    /// Replaces the blob stored for `profile`.
    fn write(&self, profile: &str, blob: &[u8]) -> Result<(), ConfigError>;
}

impl<S: ConfigStore + ?Sized> ConfigStore for &S {
    fn read(&self, profile: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        (**self).read(profile)
    }

    fn write(&self, profile: &str, blob: &[u8]) -> Result<(), ConfigError> {
        (**self).write(profile, blob)
    }
}

/// Failures while loading or saving merge settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Profile names become file names: ASCII letters, digits, `-` and `_`.
    #[error("invalid profile name {0:?}")]
    InvalidProfile(String),
    /// The backend could not be read or written.
    #[error("config io failed: {0}")]
    Io(#[from] std::io::Error),
    /// A stored profile is not a valid `MergeConfig` document.
    #[error("profile {profile} is malformed: {source}")]
    Malformed {
        /// Profile that failed to decode.
        profile: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// No backend could be set up (for example no home directory).
    #[error("config store unavailable: {0}")]
    Unavailable(String),
}

/// Loads and saves [`MergeConfig`] profiles.
#[derive(Debug)]
pub struct ProfileStore<S> {
    store: S,
}

impl<S: ConfigStore> ProfileStore<S> {
    /// Wraps a backend.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads `profile`, or `None` if it was never saved.
    pub fn load(&self, profile: &str) -> Result<Option<MergeConfig>, ConfigError> {
        check_profile_name(profile)?;
        let Some(blob) = self.store.read(profile)? else {
            return Ok(None);
        };
        if blob.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&blob)
            .map(Some)
            .map_err(|source| ConfigError::Malformed {
                profile: profile.to_owned(),
                source,
            })
    }

    /// Loads `profile`, saving the default settings under it first if it was
    /// never saved.
    pub fn load_or_create(&self, profile: &str) -> Result<MergeConfig, ConfigError> {
        if let Some(config) = self.load(profile)? {
            return Ok(config);
        }
        let config = MergeConfig::default();
        self.save(profile, &config)?;
        Ok(config)
    }

    /// Saves `config` under `profile`.
    pub fn save(&self, profile: &str, config: &MergeConfig) -> Result<(), ConfigError> {
        check_profile_name(profile)?;
        let blob = serde_json::to_vec_pretty(config).map_err(|source| ConfigError::Malformed {
            profile: profile.to_owned(),
            source,
        })?;
        self.store.write(profile, &blob)
    }
}

fn check_profile_name(profile: &str) -> Result<(), ConfigError> {
    let valid = !profile.is_empty()
        && profile
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidProfile(profile.to_owned()))
    }
}
