// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use std::fmt::{Display, Formatter};

#[cfg(feature = "aws")]
/// A convenient alias for Anyhow so consuming code doesn't need to add to `Cargo.toml`
pub type AnyhowError = anyhow::Error;

#[cfg(feature = "aws")]
/// A convenient alias for Dynamo DB error so consuming code doesn't need to add to `Cargo.toml`
pub type DynamoError = aws_sdk_dynamodb::Error;

#[cfg(feature = "aws")]
/// A convenient alias for Serde Dynamo error so consuming code doesn't need to add to `Cargo.toml`
pub type SerdeError = serde_dynamo::Error;

#[derive(Debug)]
/// An enum that encapsulates a variety of error types.
///
/// # Example
///
/// Error::Io(e, format!("{path}: cannot open"))
pub enum Error {
    #[cfg(feature = "aws")]
    /// Any AWS SDK operation error
    Anyhow(AnyhowError, String),
    #[cfg(feature = "parquet")]
    /// Arrow (in-memory columnar) error
    Arrow(arrow::error::ArrowError, String),
    #[cfg(feature = "aws")]
    /// Dynamo (database) error
    Dynamo(DynamoError, String),
    /// File system error
    Io(std::io::Error, String),
    /// JSON error
    Json(serde_json::Error, String),
    #[cfg(feature = "ldap")]
    /// LDAP (directory) error
    Ldap(ldap3::LdapError, String),
    #[cfg(feature = "parquet")]
    /// Parquet (on disk columnar) error
    Parquet(parquet::errors::ParquetError, String),
    #[cfg(feature = "aws")]
    /// Serde (serialization or deserialization) error
    Serde(SerdeError),
    /// String error.
    String(String),
    #[cfg(feature = "aws")]
    /// YAML error
    Yaml(serde_yaml::Error, String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            #[cfg(feature = "aws")]
            Error::Anyhow(e, source) => write!(f, "{source}: {e}"),
            #[cfg(feature = "parquet")]
            Error::Arrow(e, source) => write!(f, "{source}: {e}"),
            #[cfg(feature = "aws")]
            Error::Dynamo(DynamoError::ConditionalCheckFailedException(_), source) => {
                write!(f, "DynamoDb condition not met by {source}")
            }
            #[cfg(feature = "aws")]
            Error::Dynamo(e, source) => write!(f, "{source}: {e}"),
            Error::Io(e, source) => write!(f, "{source}: {e}"),
            Error::Json(e, source) => write!(f, "{source}: {e}"),
            #[cfg(feature = "ldap")]
            Error::Ldap(e, source) => write!(f, "{source}: {e}"),
            #[cfg(feature = "parquet")]
            Error::Parquet(e, source) => write!(f, "{source}: {e}"),
            #[cfg(feature = "aws")]
            Error::Serde(e) => write!(f, "serde_dynamo: {e}"),
            Error::String(s) => Display::fmt(&s, f),
            #[cfg(feature = "aws")]
            Error::Yaml(e, source) => write!(f, "{source}: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Map `String` to `Error`.
    pub fn from_string(s: String) -> Self {
        Error::String(s)
    }
}
