// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

/// Directory server settings.
mod config;
/// Binds and searches.
mod service;
/// Unit tests.
mod tests;

pub use self::config::{LdapConfig, DEFAULT_LDAP_PORT};
pub use self::service::{rdn_value, LdapService};
