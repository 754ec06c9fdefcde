// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

/// Installs the `tracing` subscriber.
mod init;
/// Thread-safe logging.
mod string_logger;
/// Unit tests.
mod tests;

pub use self::init::{init_logger, LogFormat};
pub use self::string_logger::StringLogger;
