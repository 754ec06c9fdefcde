// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use crate::common::Error;
use toml::{Table, Value};

const TARGET: &str = "ldap_service";

/// The port used when `port` is not configured.
pub const DEFAULT_LDAP_PORT: u16 = 389;

const KNOWN_KEYS: [&str; 4] = ["root_dn", "server", "port", "server_alias"];

/// Directory server settings, read from the `[ldap]` section:
///
/// ```toml
/// [ldap]
/// root_dn = "OU=Users,DC=example,DC=com"
/// server = "ldap.example.com"
/// port = 389                                # optional
/// server_alias = ["ldap2.example.com"]      # optional
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LdapConfig {
    /// Base DN for binds and searches.
    pub root_dn: String,
    /// Host name of the directory server.
    pub server: String,
    /// TCP port of the directory server.
    pub port: u16,
    /// Other host names of the same directory.
    pub server_alias: Vec<String>,
}

impl LdapConfig {
    /// Validates and reads a TOML table.
    ///
    /// Every problem is logged before the single error is returned.
    pub fn from_table(table: &Table) -> Result<Self, Error> {
        for key in table.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                tracing::warn!(target: TARGET, "Unused ldap_config key: {key}.");
            }
        }

        let mut errors = Vec::new();
        let root_dn = required_string(table, "root_dn", &mut errors);
        let server = required_string(table, "server", &mut errors);
        let port = match table.get("port") {
            None => Some(DEFAULT_LDAP_PORT),
            Some(Value::Integer(port)) => match u16::try_from(*port) {
                Ok(port) => Some(port),
                Err(_) => {
                    errors.push(format!("Invalid value {port} for key port. Expected a TCP port."));
                    None
                }
            },
            Some(other) => {
                errors.push(invalid_type("port", "integer", other));
                None
            }
        };
        let server_alias = match table.get("server_alias") {
            None => Some(Vec::new()),
            Some(Value::Array(aliases)) => aliases
                .iter()
                .map(|alias| alias.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .or_else(|| {
                    errors.push(
                        "Invalid value type for key server_alias. Expected array of strings."
                            .to_string(),
                    );
                    None
                }),
            Some(other) => {
                errors.push(invalid_type("server_alias", "array", other));
                None
            }
        };

        match (root_dn, server, port, server_alias) {
            (Some(root_dn), Some(server), Some(port), Some(server_alias)) if errors.is_empty() => {
                Ok(Self {
                    root_dn,
                    server,
                    port,
                    server_alias,
                })
            }
            _ => {
                for error in &errors {
                    tracing::error!(target: TARGET, "[from_table] {error}");
                }
                Err(Error::from_string("Invalid ldap config object.".to_string()))
            }
        }
    }

    /// `ldap://server:port`.
    pub fn url(&self) -> String {
        format!("ldap://{}:{}", self.server, self.port)
    }
}

fn invalid_type(key: &str, expected: &str, value: &Value) -> String {
    format!(
        "Invalid value type for key {key}. Expected {expected}, got {}.",
        value.type_str()
    )
}

fn required_string(table: &Table, key: &str, errors: &mut Vec<String>) -> Option<String> {
    match table.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            errors.push(invalid_type(key, "string", other));
            None
        }
        None => {
            errors.push(format!("Missing key: {key}."));
            None
        }
    }
}
