// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use std::sync::Once;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Console log output format.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Colored, human readable lines with the level and target of each event.
    #[default]
    Pretty,
}

/// Installs a global subscriber filtered by `RUST_LOG` (default `info`).
///
/// Every wrapper logs under its own target, for example `aws_cognito` or `ldap_service`,
/// so `RUST_LOG=aws_athena=debug` narrows output to one wrapper. Calling this more than
/// once is a no-op, as is calling it after another subscriber was installed.
pub fn init_logger(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(env_filter);
        let _ = match format {
            LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
            LogFormat::Pretty => registry
                .with(fmt::layer().with_target(true).with_ansi(true))
                .try_init(),
        };
    });
}
