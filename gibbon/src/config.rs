/*
 * Created on Thu Jan 11 2024
 *
 * This file is a part of Gibbon
 * Gibbon is a free and open-source authorization engine written by
 * Sayan Nandan ("the Author") that stores users, groups and permissions
 * in a transactional document store and encodes set membership as
 * fixed-length bitmasks, trading a little write amplification for
 * single-read permission checks.
 *
 * Copyright (c) 2024, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

use {
    core::fmt,
    serde::Deserialize,
    std::{
        fs,
        path::{Path, PathBuf},
    },
};

/// Default config file looked up when the caller does not name one
pub const DEFAULT_CONFIG_FILE: &str = "gibbon.yaml";
const DEFAULT_PERMISSION_BYTES: usize = 128;
const DEFAULT_GROUP_BYTES: usize = 128;
const DEFAULT_MUTATION_CONCURRENCY: usize = 16;

/*
    configuration
*/

#[derive(Debug, PartialEq, Clone)]
/// The final, validated configuration
pub struct Configuration {
    pub store: ConfigStore,
    pub universe: ConfigUniverse,
    pub system: ConfigSystem,
}

impl Configuration {
    /// Ephemeral store with the given universe byte lengths and default
    /// fan-out settings
    pub fn for_universe(permission_bytes: usize, group_bytes: usize) -> Self {
        Self {
            store: ConfigStore { path: None },
            universe: ConfigUniverse {
                permission_bytes,
                group_bytes,
            },
            system: ConfigSystem {
                mutation_concurrency: DEFAULT_MUTATION_CONCURRENCY,
            },
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::for_universe(DEFAULT_PERMISSION_BYTES, DEFAULT_GROUP_BYTES)
    }
}

#[derive(Debug, PartialEq, Clone)]
/// Where the store lives. `None` keeps everything in memory.
pub struct ConfigStore {
    pub path: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Clone)]
/// Universe sizing: a mask of `n` bytes addresses `8·n` positions
pub struct ConfigUniverse {
    pub permission_bytes: usize,
    pub group_bytes: usize,
}

#[derive(Debug, PartialEq, Clone)]
/// Engine tunables
pub struct ConfigSystem {
    /// upper bound on the work-units a bulk mutation keeps in flight
    pub mutation_concurrency: usize,
}

/*
    decoded configuration: the raw form we got from the user, not validated
*/

#[derive(Debug, PartialEq, Deserialize, Default)]
pub struct DecodedConfiguration {
    store: Option<DecodedStoreConfig>,
    universe: Option<DecodedUniverseConfig>,
    system: Option<DecodedSystemConfig>,
}

#[derive(Debug, PartialEq, Deserialize)]
struct DecodedStoreConfig {
    path: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Deserialize)]
struct DecodedUniverseConfig {
    permission_bytes: Option<usize>,
    group_bytes: Option<usize>,
}

#[derive(Debug, PartialEq, Deserialize)]
struct DecodedSystemConfig {
    mutation_concurrency: Option<usize>,
}

impl DecodedConfiguration {
    fn validate(self) -> Result<Configuration, ConfigError> {
        let Self {
            store,
            universe,
            system,
        } = self;
        let permission_bytes = universe
            .as_ref()
            .and_then(|u| u.permission_bytes)
            .unwrap_or(DEFAULT_PERMISSION_BYTES);
        let group_bytes = universe
            .as_ref()
            .and_then(|u| u.group_bytes)
            .unwrap_or(DEFAULT_GROUP_BYTES);
        let mutation_concurrency = system
            .as_ref()
            .and_then(|s| s.mutation_concurrency)
            .unwrap_or(DEFAULT_MUTATION_CONCURRENCY);
        if permission_bytes == 0 {
            return Err(ConfigError::invalid("universe.permission_bytes must be >= 1"));
        }
        if group_bytes == 0 {
            return Err(ConfigError::invalid("universe.group_bytes must be >= 1"));
        }
        if mutation_concurrency == 0 {
            return Err(ConfigError::invalid(
                "system.mutation_concurrency must be >= 1",
            ));
        }
        Ok(Configuration {
            store: ConfigStore {
                path: store.and_then(|s| s.path),
            },
            universe: ConfigUniverse {
                permission_bytes,
                group_bytes,
            },
            system: ConfigSystem {
                mutation_concurrency,
            },
        })
    }
}

/*
    loading
*/

/// Load and validate the configuration: the explicit path when one is given,
/// else `./gibbon.yaml`, else (only when searching) the built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<Configuration, ConfigError> {
    match explicit {
        Some(path) => decode_file(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                decode_file(default)
            } else {
                Ok(Configuration::default())
            }
        }
    }
}

fn decode_file(path: &Path) -> Result<Configuration, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        ConfigError::with_src(
            ConfigSource::File,
            ConfigErrorKind::ErrorString(format!(
                "could not load config from `{}` ({e}); execute `gibbonctl init` to set up a deployment",
                path.display()
            )),
        )
    })?;
    let decoded: DecodedConfiguration = serde_yaml::from_str(&raw).map_err(|e| {
        ConfigError::with_src(
            ConfigSource::File,
            ConfigErrorKind::ErrorString(format!("malformed config: {e}")),
        )
    })?;
    decoded.validate()
}

/*
    errors
*/

#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
/// A configuration error (with an optional error origin source)
pub struct ConfigError {
    source: Option<ConfigSource>,
    kind: ConfigErrorKind,
}

impl ConfigError {
    fn _new(source: Option<ConfigSource>, kind: ConfigErrorKind) -> Self {
        Self { source, kind }
    }
    fn with_src(source: ConfigSource, kind: ConfigErrorKind) -> Self {
        Self::_new(Some(source), kind)
    }
    pub(crate) fn invalid(msg: &str) -> Self {
        Self::_new(None, ConfigErrorKind::ErrorString(msg.to_owned()))
    }
    /// New CLI-source error with the given message
    pub fn cli(msg: String) -> Self {
        Self::with_src(ConfigSource::Cli, ConfigErrorKind::ErrorString(msg))
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "config error in {}: ", src.as_str())?,
            None => write!(f, "config error: ")?,
        }
        match &self.kind {
            ConfigErrorKind::ErrorString(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, PartialEq)]
/// The configuration source
pub enum ConfigSource {
    /// Command-line
    Cli,
    /// Configuration file
    File,
}

impl ConfigSource {
    fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::Cli => "CLI",
            ConfigSource::File => "config file",
        }
    }
}

#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
/// Type of configuration error
pub enum ConfigErrorKind {
    /// A custom error output
    ErrorString(String),
}
