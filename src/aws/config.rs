// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use crate::common::WranglerConfig;
use aws_config::meta::region::RegionProviderChain;
use aws_config::profile::ProfileFileRegionProvider;
use aws_config::{BehaviorVersion, ConfigLoader, Region, SdkConfig};
use serde::Deserialize;

/// A convenient alias for Athena client so consuming code doesn't need to add it to `Cargo.toml`
pub type AthenaClient = aws_sdk_athena::Client;
/// A convenient alias for Cognito user pool client so consuming code doesn't need to add it to `Cargo.toml`
pub type CognitoClient = aws_sdk_cognitoidentityprovider::Client;
/// A convenient alias for Glue (data catalog) client so consuming code doesn't need to add it to `Cargo.toml`
pub type GlueClient = aws_sdk_glue::Client;
/// A convenient alias for Secrets Manager client so consuming code doesn't need to add it to `Cargo.toml`
pub type SecretsManagerClient = aws_sdk_secretsmanager::Client;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AwsSection {
    pub(crate) profile: Option<String>,
    pub(crate) region: Option<String>,
}

#[derive(Deserialize)]
struct ConfigToml {
    #[serde(default)]
    aws: AwsSection,
}

pub(crate) fn aws_section(wrangler_config: &WranglerConfig) -> AwsSection {
    wrangler_config
        .get::<ConfigToml>()
        .map(|ConfigToml { aws }| aws)
        .unwrap_or_default()
}

/// Create an AWS config loader with profile and region.
///
/// An explicit `[aws] region` wins over the region of the `[aws] profile`.
pub fn create_aws_config_loader(wrangler_config: &WranglerConfig) -> ConfigLoader {
    let AwsSection { profile, region } = aws_section(wrangler_config);
    let mut config_loader = aws_config::defaults(BehaviorVersion::v2023_11_09());
    if let Some(profile_name) = profile {
        if wrangler_config.debug() {
            tracing::debug!(target: "aws", "AWS using profile name {profile_name}");
        }
        let profile_region = ProfileFileRegionProvider::builder()
            .profile_name(&profile_name)
            .build();
        config_loader = config_loader.profile_name(&profile_name);
        config_loader = match region {
            Some(region) => config_loader.region(Region::new(region)),
            None => config_loader.region(profile_region),
        };
    } else if let Some(region) = region {
        config_loader =
            config_loader.region(RegionProviderChain::first_try(Region::new(region)).or_default_provider());
    }
    config_loader
}

/// Load AWS configuration with profile and region.
pub async fn load_aws_config(wrangler_config: &WranglerConfig) -> SdkConfig {
    create_aws_config_loader(wrangler_config).load().await
}

/// Creates an Athena client.
pub async fn new_athena_client(wrangler_config: &WranglerConfig) -> AthenaClient {
    AthenaClient::new(&load_aws_config(wrangler_config).await)
}

/// Creates a Cognito user pool client.
pub async fn new_cognito_client(wrangler_config: &WranglerConfig) -> CognitoClient {
    CognitoClient::new(&load_aws_config(wrangler_config).await)
}

/// Creates a Glue client.
pub async fn new_glue_client(wrangler_config: &WranglerConfig) -> GlueClient {
    GlueClient::new(&load_aws_config(wrangler_config).await)
}

/// Creates a Secrets Manager client.
pub async fn new_secrets_client(wrangler_config: &WranglerConfig) -> SecretsManagerClient {
    SecretsManagerClient::new(&load_aws_config(wrangler_config).await)
}
