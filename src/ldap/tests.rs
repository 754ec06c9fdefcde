// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

#[cfg(test)]
mod ldap_tests {
    use crate::common::{Error, WranglerConfig};
    use crate::ldap::{rdn_value, LdapConfig, LdapService, DEFAULT_LDAP_PORT};

    fn table(toml: &str) -> toml::Table {
        toml::from_str(toml).expect("ldap table")
    }

    #[test]
    fn config_tests() {
        let config = LdapConfig::from_table(&table(
            r#"
            root_dn = "OU=Users,DC=example,DC=com"
            server = "ldap.example.com"
            "#,
        ))
        .expect("minimal config");
        assert_eq!(config.port, DEFAULT_LDAP_PORT);
        assert!(config.server_alias.is_empty());
        assert_eq!(config.url(), "ldap://ldap.example.com:389");

        let config = LdapConfig::from_table(&table(
            r#"
            root_dn = "OU=Users,DC=example,DC=com"
            server = "ldap.example.com"
            port = 3389
            server_alias = ["ldap2.example.com"]
            timeout = 5
            "#,
        ))
        .expect("full config with an unused key");
        assert_eq!(config.port, 3389);
        assert_eq!(config.server_alias, ["ldap2.example.com"]);
    }

    #[test]
    fn config_errors() {
        let missing = LdapConfig::from_table(&table(r#"server = "ldap.example.com""#));
        match missing {
            Err(e) => assert_eq!(e.to_string(), "Invalid ldap config object."),
            Ok(config) => panic!("expected error, got {config:?}"),
        }

        let wrong_types = [
            r#"root_dn = 1
               server = "ldap.example.com""#,
            r#"root_dn = "DC=example"
               server = "ldap.example.com"
               port = "389""#,
            r#"root_dn = "DC=example"
               server = "ldap.example.com"
               port = 70000"#,
            r#"root_dn = "DC=example"
               server = "ldap.example.com"
               server_alias = [1, 2]"#,
            r#"root_dn = "DC=example"
               server = "ldap.example.com"
               server_alias = "ldap2.example.com""#,
        ];
        for toml in wrong_types {
            assert!(LdapConfig::from_table(&table(toml)).is_err(), "{toml}");
        }
    }

    #[test]
    fn rdn_tests() {
        assert_eq!(rdn_value("CN=jdoe,OU=Users,DC=example,DC=com"), Some("jdoe"));
        assert_eq!(rdn_value("cn=admins"), Some("admins"));
        assert_eq!(rdn_value("no-rdn"), None);
    }

    #[test]
    fn service_from_config() {
        let wrangler_config = WranglerConfig::builder()
            .toml_str(
                r#"
                [ldap]
                root_dn = "DC=example,DC=com"
                server = "ldap.example.com"
                "#,
            )
            .build()
            .expect("ldap.toml");
        let service = LdapService::new(&wrangler_config).expect("service");
        assert_eq!(service.config().server, "ldap.example.com");
        assert!(!service.is_user_authenticated());

        let without_section = WranglerConfig::builder()
            .toml_str("[aws]\nprofile = \"p\"")
            .build()
            .expect("aws.toml");
        assert!(LdapService::new(&without_section).is_err());
    }

    #[tokio::test]
    async fn unauthenticated_tests() {
        let mut service = LdapService::with_config(LdapConfig {
            root_dn: "DC=example,DC=com".to_string(),
            server: "ldap.invalid".to_string(),
            port: DEFAULT_LDAP_PORT,
            server_alias: Vec::new(),
        });

        assert!(!service.auth("   ", "secret").await);
        assert!(!service.auth("jdoe", "").await);
        assert!(!service.is_user_authenticated());

        assert_eq!(service.get_all_ldap_dns(false).await, None);
        assert_eq!(service.get_all_ldap_usernames(true).await, None);
        assert_eq!(service.get_all_ldap_groups(false).await, None);

        service.logout().await;
        assert!(!service.is_user_authenticated());
    }

    #[tokio::test]
    async fn bind_error_tests() {
        // Nothing listens on port 1 of the loopback interface.
        let mut service = LdapService::with_config(LdapConfig {
            root_dn: "DC=example,DC=com".to_string(),
            server: "127.0.0.1".to_string(),
            port: 1,
            server_alias: Vec::new(),
        });

        match service.bind("jdoe", "secret").await {
            Err(Error::Ldap(e, context)) => {
                println!("{context}: {e}");
                assert_eq!(context, "connect(ldap://127.0.0.1:1)");
            }
            Err(e) => panic!("expected an LDAP error, got {e}"),
            Ok(_) => panic!("bind to a closed port succeeded"),
        }

        assert!(!service.auth("jdoe", "secret").await);
        assert!(!service.is_user_authenticated());
    }
}
