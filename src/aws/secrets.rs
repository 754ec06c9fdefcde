// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use super::SecretsManagerClient;
use crate::common::Error;
use serde_json::{Map, Value};
use std::fmt::Write;
use std::path::PathBuf;
use std::str::FromStr;

const TARGET: &str = "aws_secretsmanager";

/// Extensions accepted besides the plain env file.
pub const AVAILABLE_EXTENSIONS: [&str; 1] = ["yaml"];

/// Layout of a generated env file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EnvFileFormat {
    /// `KEY='value'` lines.
    #[default]
    Env,
    /// `KEY: 'value'` lines, written to `{filename}.yaml`.
    Yaml,
}

impl EnvFileFormat {
    fn operator(self) -> &'static str {
        match self {
            Self::Env => "=",
            Self::Yaml => ": ",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Env => "",
            Self::Yaml => ".yaml",
        }
    }
}

impl FromStr for EnvFileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "env" => Ok(Self::Env),
            "yaml" => Ok(Self::Yaml),
            _ => Err(Error::String(format!("Extension '{s}' is not available"))),
        }
    }
}

/// Renders secrets one per line, in insertion order, without a trailing newline.
pub fn render_env(secrets: &Map<String, Value>, format: EnvFileFormat) -> String {
    let operator = format.operator();
    let mut ret = String::new();
    for (i, (key, value)) in secrets.iter().enumerate() {
        if i > 0 {
            ret.push('\n');
        }
        let _ = match value {
            Value::String(s) => write!(ret, "{key}{operator}'{s}'"),
            other => write!(ret, "{key}{operator}'{other}'"),
        };
    }
    ret
}

/// Fetches a secret and parses its `SecretString` as a JSON object.
pub async fn get_secret_json(
    client: &SecretsManagerClient,
    name: &str,
) -> Result<Map<String, Value>, Error> {
    let output = client
        .get_secret_value()
        .secret_id(name)
        .send()
        .await
        .map_err(|e| Error::Anyhow(e.into(), format!("get_secret_value({name})")))?;
    let secret_string = output
        .secret_string()
        .ok_or_else(|| Error::String(format!("get_secret_json({name}): no SecretString")))?;
    serde_json::from_str(secret_string).map_err(|e| Error::Json(e, format!("get_secret_json({name})")))
}

/// Writes an env file from `secrets`, or from the secret `secret_name` when `secrets` is empty.
///
/// Returns the path written, `{filename}` or `{filename}.yaml`.
pub async fn generate_env_from_secretsmanager(
    client: Option<&SecretsManagerClient>,
    secrets: Option<Map<String, Value>>,
    secret_name: Option<&str>,
    filename: &str,
    format: EnvFileFormat,
) -> Result<PathBuf, Error> {
    let secrets = secrets.filter(|s| !s.is_empty());
    let secret_name = secret_name.filter(|s| !s.is_empty());
    let missing_source = || {
        Error::String(
            "You must specify a secrets dictionary or a secret_name to retrieve from AWS.".to_string(),
        )
    };
    if secrets.is_none() && secret_name.is_none() {
        return Err(missing_source());
    }
    if filename.is_empty() {
        return Err(Error::String("Filename argument cannot be empty or null.".to_string()));
    }

    let secrets = match secrets {
        Some(secrets) => secrets,
        None => {
            let name = secret_name.ok_or_else(missing_source)?;
            let client = client.ok_or_else(|| {
                Error::String(format!("generate_env_from_secretsmanager({name}): no client"))
            })?;
            get_secret_json(client, name).await?
        }
    };

    let path = PathBuf::from(format!("{filename}{}", format.extension()));
    tokio::fs::write(&path, render_env(&secrets, format))
        .await
        .map_err(|e| Error::Io(e, format!("write({})", path.display())))?;
    tracing::info!(target: TARGET, "[generate_env_from_secretsmanager] {} keys written to {}", secrets.len(), path.display());
    Ok(path)
}
