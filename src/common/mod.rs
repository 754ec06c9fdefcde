// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

/// Configuration parameters loaded from TOML.
mod config;
/// An enum that encapsulates a variety of error types.
mod error;

pub use self::config::{WranglerConfig, WranglerConfigBuilder};
pub use self::error::Error;
#[cfg(feature = "aws")]
pub use self::error::{AnyhowError, DynamoError, SerdeError};
