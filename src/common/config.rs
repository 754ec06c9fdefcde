// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use super::Error;
use serde::de::DeserializeOwned;
use std::env::var_os;
use std::fs::read_to_string;
use std::path::PathBuf;

/// Configuration parameters for the various wrappers, kept as a TOML document.
///
/// Each wrapper reads its own section, e.g. `[aws]` or `[ldap]`.
#[derive(Clone, Debug)]
pub struct WranglerConfig {
    debug_enabled: bool,
    toml: String,
}

impl WranglerConfig {
    /// Creates a configuration builder.
    pub fn builder() -> WranglerConfigBuilder {
        WranglerConfigBuilder {
            wrangler_config: None,
            debug_enabled: false,
            error: None,
        }
    }

    /// Returns `true` if debug is enabled.
    pub fn debug(&self) -> bool {
        self.debug_enabled
    }

    /// Returns configuration parameters.
    pub fn get<T: DeserializeOwned>(&self) -> Result<T, Error> {
        toml::from_str(&self.toml).map_err(|e: toml::de::Error| Error::String(format!("toml: {e}")))
    }

    /// Returns the raw table of the named section, if present.
    pub fn section(&self, name: &str) -> Result<Option<toml::Table>, Error> {
        let mut root: toml::Table = self.get()?;
        match root.remove(name) {
            None => Ok(None),
            Some(toml::Value::Table(table)) => Ok(Some(table)),
            Some(other) => Err(Error::String(format!(
                "toml: [{name}] must be a table, got {}",
                other.type_str()
            ))),
        }
    }
}

/// Builder for [`WranglerConfig`].
pub struct WranglerConfigBuilder {
    wrangler_config: Option<WranglerConfig>,
    debug_enabled: bool,
    error: Option<Error>,
}

impl WranglerConfigBuilder {
    /// Finishes the builder.
    pub fn build(self) -> Result<WranglerConfig, Error> {
        if let Some(error) = self.error {
            Err(error)
        } else if let Some(wrangler_config) = self.wrangler_config {
            Ok(WranglerConfig {
                debug_enabled: self.debug_enabled,
                ..wrangler_config
            })
        } else {
            Err(Error::String("config not set".to_string()))
        }
    }

    /// Enables or disables debug output.
    pub fn debug(self, debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            ..self
        }
    }

    /// Reads the TOML from `$HOME/{file_name}`, falling back to `./{file_name}`.
    pub fn toml_file(self, file_name: &str) -> Self {
        let home_path = var_os("HOME").map(|home| PathBuf::from(home).join(file_name));
        let local_path = PathBuf::from(".").join(file_name);

        let toml = home_path
            .and_then(|path| read_to_string(path).ok())
            .map(Ok)
            .unwrap_or_else(|| {
                read_to_string(&local_path).map_err(|e| {
                    Error::Io(e, format!("{}: cannot read", local_path.display()))
                })
            });

        match toml {
            Ok(toml) => self.toml_string(toml),
            Err(e) => Self {
                wrangler_config: None,
                error: Some(e),
                ..self
            },
        }
    }

    /// Uses the given TOML text.
    pub fn toml_str(self, toml: &str) -> Self {
        self.toml_string(toml.to_string())
    }

    /// Uses the given TOML text.
    pub fn toml_string(self, toml: String) -> Self {
        Self {
            wrangler_config: Some(WranglerConfig {
                debug_enabled: self.debug_enabled,
                toml,
            }),
            error: None,
            ..self
        }
    }
}
