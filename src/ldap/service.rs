// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use super::config::LdapConfig;
use crate::common::{Error, WranglerConfig};
use ldap3::{Ldap, LdapConnAsync, Scope, SearchEntry};

const TARGET: &str = "ldap_service";

const ALL_FILTER: &str = "(objectClass=*)";
const PERSON_FILTER: &str = "(objectClass=person)";
const GROUP_FILTER: &str = "(objectClass=groupOfNames)";
/// Requests no attributes, only DNs.
const NO_ATTRS: &str = "1.1";

/// Returns the value of the first RDN of a DN, e.g. `jdoe` for `CN=jdoe,OU=Users,DC=example`.
pub fn rdn_value(dn: &str) -> Option<&str> {
    let (_, rest) = dn.split_once('=')?;
    rest.split(',').next()
}

/// A SIMPLE-bound session with a directory server.
///
/// Search results are cached per filter until asked to reset.
pub struct LdapService {
    config: LdapConfig,
    ldap: Option<Ldap>,
    authenticated: bool,
    all_dns: Option<Vec<String>>,
    all_usernames: Option<Vec<String>>,
    all_groups: Option<Vec<String>>,
}

impl LdapService {
    /// Creates a service from the `[ldap]` section.
    pub fn new(wrangler_config: &WranglerConfig) -> Result<Self, Error> {
        let table = wrangler_config.section("ldap")?.unwrap_or_default();
        Ok(Self::with_config(LdapConfig::from_table(&table)?))
    }

    /// Creates a service from an already validated config.
    pub fn with_config(config: LdapConfig) -> Self {
        Self {
            config,
            ldap: None,
            authenticated: false,
            all_dns: None,
            all_usernames: None,
            all_groups: None,
        }
    }

    /// The server settings.
    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    /// Whether the last bind succeeded and no logout followed.
    pub fn is_user_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Binds as `CN={username},{root_dn}`.
    ///
    /// Credentials are trimmed; empty ones are rejected without contacting the server.
    pub async fn auth(&mut self, username: &str, password: &str) -> bool {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            let mut msg = String::new();
            if username.is_empty() {
                msg.push_str("Username argument cannot be null or empty.");
            }
            if password.is_empty() {
                msg.push_str("Password argument cannot be null or empty.");
            }
            tracing::error!(target: TARGET, "[auth] {msg}");
            return false;
        }

        if !self.config.server_alias.is_empty() {
            tracing::debug!(
                target: TARGET,
                "[auth] Referrals to {:?} are not followed.",
                self.config.server_alias
            );
        }

        match self.bind(username, password).await {
            Ok(ldap) => {
                if let Some(mut previous) = self.ldap.replace(ldap) {
                    let _ = previous.unbind().await;
                }
                self.authenticated = true;
                tracing::info!(target: TARGET, "[auth] Successful bind to ldap server.");
            }
            Err(e) => tracing::error!(target: TARGET, "[auth] Cannot bind to ldap server. {e}"),
        }
        self.authenticated
    }

    /// Opens a new connection and binds it as `CN={username},{root_dn}`.
    pub(crate) async fn bind(&self, username: &str, password: &str) -> Result<Ldap, Error> {
        let url = self.config.url();
        let (conn, mut ldap) = LdapConnAsync::new(&url)
            .await
            .map_err(|e| Error::Ldap(e, format!("connect({url})")))?;
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!(target: TARGET, "LDAP connection error: {e}");
            }
        });

        let bind_dn = format!("CN={username},{}", self.config.root_dn);
        match ldap.simple_bind(&bind_dn, password).await.and_then(|r| r.success()) {
            Ok(_) => Ok(ldap),
            Err(e) => {
                let _ = ldap.unbind().await;
                Err(Error::Ldap(e, format!("simple_bind({bind_dn})")))
            }
        }
    }

    async fn search_dns(&mut self, filter: &str) -> Option<Vec<String>> {
        if !self.authenticated {
            tracing::warn!(target: TARGET, "[search] User is not authenticated. Skipping...");
            return None;
        }
        let ldap = self.ldap.as_mut()?;
        let result = ldap
            .search(&self.config.root_dn, Scope::Subtree, filter, vec![NO_ATTRS])
            .await
            .and_then(|r| r.success());
        match result {
            Ok((entries, _)) => Some(
                entries
                    .into_iter()
                    .map(|entry| SearchEntry::construct(entry).dn)
                    .collect(),
            ),
            Err(e) => {
                tracing::error!(target: TARGET, "[search] {filter}: {e}");
                None
            }
        }
    }

    async fn search_rdn_values(&mut self, filter: &str) -> Option<Vec<String>> {
        let dns = self.search_dns(filter).await?;
        Some(
            dns.iter()
                .filter_map(|dn| rdn_value(dn))
                .map(str::to_string)
                .collect(),
        )
    }

    /// Every DN under the root DN.
    pub async fn get_all_ldap_dns(&mut self, reset: bool) -> Option<Vec<String>> {
        if reset || self.all_dns.is_none() {
            self.all_dns = self.search_dns(ALL_FILTER).await;
        }
        self.all_dns.clone()
    }

    /// The names of every person under the root DN.
    pub async fn get_all_ldap_usernames(&mut self, reset: bool) -> Option<Vec<String>> {
        if reset || self.all_usernames.is_none() {
            self.all_usernames = self.search_rdn_values(PERSON_FILTER).await;
        }
        self.all_usernames.clone()
    }

    /// The names of every group under the root DN.
    pub async fn get_all_ldap_groups(&mut self, reset: bool) -> Option<Vec<String>> {
        if reset || self.all_groups.is_none() {
            self.all_groups = self.search_rdn_values(GROUP_FILTER).await;
        }
        self.all_groups.clone()
    }

    /// Unbinds, if connected.
    pub async fn logout(&mut self) {
        if let Some(mut ldap) = self.ldap.take() {
            match ldap.unbind().await {
                Ok(()) => tracing::info!(target: TARGET, "[logout] Successful unbind to ldap server."),
                Err(e) => tracing::error!(target: TARGET, "[logout] {e}"),
            }
        }
        self.authenticated = false;
    }
}
