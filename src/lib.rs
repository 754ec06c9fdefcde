// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

#![warn(missing_docs)]
//! This crate is a collection of thin wrappers that simplify data wrangling on AWS
//! (Athena, Cognito, Dynamo DB, S3, Secrets Manager), LDAP authentication and Parquet
//! writing.

#[cfg(feature = "aws")]
/// A wrapper which provides access to AWS Athena, Cognito, Dynamo DB, S3 and Secrets Manager.
pub mod aws;
#[cfg(feature = "aws")]
pub use aws::*;

/// Types common to multiple wrappers.
pub mod common;
pub use common::*;

#[cfg(feature = "ldap")]
/// A wrapper which provides access to LDAP binds and searches.
pub mod ldap;
#[cfg(feature = "ldap")]
pub use ldap::*;

/// Thread-safe logging.
pub mod log;
pub use log::*;

#[cfg(feature = "parquet")]
/// Chunked Parquet writing.
pub mod transform;
#[cfg(feature = "parquet")]
pub use transform::*;
