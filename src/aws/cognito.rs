// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use super::config::CognitoClient;
use super::secret_hash::user_secret_hash;
use crate::common::Error;
use aws_sdk_cognitoidentityprovider::operation::admin_add_user_to_group::AdminAddUserToGroupError;
use aws_sdk_cognitoidentityprovider::operation::admin_create_user::AdminCreateUserError;
use aws_sdk_cognitoidentityprovider::operation::admin_delete_user::AdminDeleteUserError;
use aws_sdk_cognitoidentityprovider::operation::admin_get_user::{
    AdminGetUserError, AdminGetUserOutput,
};
use aws_sdk_cognitoidentityprovider::operation::admin_initiate_auth::{
    AdminInitiateAuthError, AdminInitiateAuthOutput,
};
use aws_sdk_cognitoidentityprovider::operation::admin_remove_user_from_group::AdminRemoveUserFromGroupError;
use aws_sdk_cognitoidentityprovider::operation::admin_set_user_password::AdminSetUserPasswordError;
use aws_sdk_cognitoidentityprovider::operation::create_group::CreateGroupError;
use aws_sdk_cognitoidentityprovider::operation::resend_confirmation_code::ResendConfirmationCodeError;
use aws_sdk_cognitoidentityprovider::types::{
    AttributeType, AuthFlowType, CodeDeliveryDetailsType, GroupType, UserType,
};

const TARGET: &str = "aws_cognito";

/// The admin authentication flow used when none is given.
pub const DEFAULT_AUTH_FLOW: &str = "ADMIN_NO_SRP_AUTH";

/// Logs an unexpected service error and wraps it.
fn failure<E>(function: &str, e: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    tracing::error!(target: TARGET, "[{function}] {e}");
    Error::Anyhow(e.into(), function.to_string())
}

/// Builds a user attribute, e.g. `("email", "someone@example.com")`.
pub fn user_attribute(name: &str, value: &str) -> Result<AttributeType, Error> {
    AttributeType::builder()
        .name(name)
        .value(value)
        .build()
        .map_err(|e| Error::Anyhow(e.into(), format!("user_attribute({name})")))
}

/// Gets a user of a user pool as an administrator. Returns `Ok(None)` if the user is not
/// registered.
pub async fn get_user(
    client: &CognitoClient,
    userpool_id: &str,
    username: &str,
) -> Result<Option<AdminGetUserOutput>, Error> {
    match client
        .admin_get_user()
        .user_pool_id(userpool_id)
        .username(username)
        .send()
        .await
    {
        Ok(user) => Ok(Some(user)),
        Err(e) => match e.into_service_error() {
            AdminGetUserError::UserNotFoundException(_) => {
                tracing::warn!(target: TARGET, "[get_user] User {username} not found. It is not registered.");
                Ok(None)
            }
            e => Err(failure("get_user", e)),
        },
    }
}

/// Lists the users of a user pool.
///
/// `attributes_to_get` limits the returned attributes (all when empty). `filter` has the
/// form `AttributeName Filter-Type "AttributeValue"` and is ignored when empty.
pub async fn get_all_users(
    client: &CognitoClient,
    userpool_id: &str,
    attributes_to_get: &[&str],
    filter: &str,
) -> Result<Vec<UserType>, Error> {
    let attributes_to_get = (!attributes_to_get.is_empty())
        .then(|| attributes_to_get.iter().map(|a| a.to_string()).collect::<Vec<_>>());
    let filter = (!filter.is_empty()).then(|| filter.to_string());

    let mut ret = Vec::new();
    let mut pagination_token = None;
    loop {
        let output = client
            .list_users()
            .user_pool_id(userpool_id)
            .set_attributes_to_get(attributes_to_get.clone())
            .set_filter(filter.clone())
            .set_pagination_token(pagination_token)
            .send()
            .await
            .map_err(|e| failure("get_all_users", e.into_service_error()))?;
        pagination_token = output.pagination_token().map(String::from);
        ret.extend(output.users.unwrap_or_default());
        if pagination_token.is_none() {
            break;
        }
    }
    Ok(ret)
}

/// Lists the users in a group.
pub async fn get_users_from_group(
    client: &CognitoClient,
    userpool_id: &str,
    group_name: &str,
) -> Result<Vec<UserType>, Error> {
    let mut ret = Vec::new();
    let mut next_token = None;
    loop {
        let output = client
            .list_users_in_group()
            .user_pool_id(userpool_id)
            .group_name(group_name)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| failure("get_users_from_group", e.into_service_error()))?;
        next_token = output.next_token().map(String::from);
        ret.extend(output.users.unwrap_or_default());
        if next_token.is_none() {
            break;
        }
    }
    Ok(ret)
}

/// Deletes a user as an administrator. Returns `Ok(false)` if the user did not exist.
pub async fn remove_user_from_userpool(
    client: &CognitoClient,
    userpool_id: &str,
    username: &str,
) -> Result<bool, Error> {
    match client
        .admin_delete_user()
        .user_pool_id(userpool_id)
        .username(username)
        .send()
        .await
    {
        Ok(_) => {
            tracing::info!(target: TARGET, "[remove_user_from_userpool] User {username} deleted.");
            Ok(true)
        }
        Err(e) => match e.into_service_error() {
            AdminDeleteUserError::UserNotFoundException(_) => {
                tracing::warn!(target: TARGET, "[remove_user_from_userpool] User {username} does not exist. Skipping...");
                Ok(false)
            }
            e => Err(failure("remove_user_from_userpool", e)),
        },
    }
}

/// Removes a user from a group. Returns `Ok(false)` if the user did not exist.
pub async fn remove_user_from_group(
    client: &CognitoClient,
    userpool_id: &str,
    username: &str,
    group_name: &str,
) -> Result<bool, Error> {
    match client
        .admin_remove_user_from_group()
        .user_pool_id(userpool_id)
        .username(username)
        .group_name(group_name)
        .send()
        .await
    {
        Ok(_) => {
            tracing::info!(target: TARGET, "[remove_user_from_group] User {username} removed from group {group_name}.");
            Ok(true)
        }
        Err(e) => match e.into_service_error() {
            AdminRemoveUserFromGroupError::UserNotFoundException(_) => {
                tracing::warn!(target: TARGET, "[remove_user_from_group] User {username} does not exist. Skipping...");
                Ok(false)
            }
            e => Err(failure("remove_user_from_group", e)),
        },
    }
}

/// Creates a user in a user pool as an administrator.
///
/// Returns `Ok(None)` if the username is taken. If Cognito cannot deliver the invitation
/// code the half-created user is deleted again and `Ok(None)` is returned.
pub async fn create_user(
    client: &CognitoClient,
    userpool_id: &str,
    username: &str,
    user_attributes: Vec<AttributeType>,
    force_alias_creation: bool,
) -> Result<Option<UserType>, Error> {
    match client
        .admin_create_user()
        .user_pool_id(userpool_id)
        .username(username)
        .set_user_attributes(Some(user_attributes))
        .force_alias_creation(force_alias_creation)
        .send()
        .await
    {
        Ok(output) => Ok(Some(output.user.unwrap_or_else(|| {
            UserType::builder().username(username).build()
        }))),
        Err(e) => match e.into_service_error() {
            AdminCreateUserError::UsernameExistsException(_) => {
                tracing::warn!(target: TARGET, "[create_user] Username {username} already exists. Skipping creation...");
                Ok(None)
            }
            AdminCreateUserError::CodeDeliveryFailureException(_) => {
                tracing::error!(target: TARGET, "[create_user] Code delivery failed!");
                if let Err(e) = remove_user_from_userpool(client, userpool_id, username).await {
                    tracing::error!(target: TARGET, "[create_user] Cannot remove {username}: {e}");
                }
                Ok(None)
            }
            e => Err(failure("create_user", e)),
        },
    }
}

/// Creates a group in a user pool. Returns `Ok(None)` if the group already exists.
pub async fn create_group(
    client: &CognitoClient,
    userpool_id: &str,
    group_name: &str,
    description: &str,
) -> Result<Option<GroupType>, Error> {
    match client
        .create_group()
        .user_pool_id(userpool_id)
        .group_name(group_name)
        .description(description)
        .send()
        .await
    {
        Ok(output) => {
            tracing::info!(target: TARGET, "[create_group] Group {group_name} created.");
            Ok(output.group)
        }
        Err(e) => match e.into_service_error() {
            CreateGroupError::GroupExistsException(_) => {
                tracing::warn!(target: TARGET, "[create_group] A group with the name {group_name} already exists. Skipping...");
                Ok(None)
            }
            e => Err(failure("create_group", e)),
        },
    }
}

/// Adds a user to a group. Returns `Ok(false)` if the user did not exist.
pub async fn add_user_to_group(
    client: &CognitoClient,
    userpool_id: &str,
    username: &str,
    group_name: &str,
) -> Result<bool, Error> {
    match client
        .admin_add_user_to_group()
        .user_pool_id(userpool_id)
        .username(username)
        .group_name(group_name)
        .send()
        .await
    {
        Ok(_) => {
            tracing::info!(target: TARGET, "[add_user_to_group] User {username} added to group {group_name}");
            Ok(true)
        }
        Err(e) => match e.into_service_error() {
            AdminAddUserToGroupError::UserNotFoundException(_) => {
                tracing::warn!(target: TARGET, "[add_user_to_group] User {username} does not exist. Skipping...");
                Ok(false)
            }
            e => Err(failure("add_user_to_group", e)),
        },
    }
}

/// Resends the sign up confirmation code. Returns `Ok(None)` if the user did not exist.
pub async fn resend_confirmation_code(
    client: &CognitoClient,
    client_id: &str,
    username: &str,
) -> Result<Option<CodeDeliveryDetailsType>, Error> {
    match client
        .resend_confirmation_code()
        .client_id(client_id)
        .username(username)
        .send()
        .await
    {
        Ok(output) => {
            tracing::info!(target: TARGET, "[resend_confirmation_code] Confirmation code sent to user {username}");
            Ok(Some(output.code_delivery_details.unwrap_or_else(|| {
                CodeDeliveryDetailsType::builder().build()
            })))
        }
        Err(e) => match e.into_service_error() {
            ResendConfirmationCodeError::UserNotFoundException(_) => {
                tracing::warn!(target: TARGET, "[resend_confirmation_code] User {username} does not exist. Skipping...");
                Ok(None)
            }
            e => Err(failure("resend_confirmation_code", e)),
        },
    }
}

/// Sets a user's password as an administrator. Returns `Ok(false)` if the user did not
/// exist.
///
/// A temporary password (`permanent == false`) puts the user in `FORCE_CHANGE_PASSWORD`
/// and the next sign in answers with the `NEW_PASSWORD_REQUIRED` challenge.
pub async fn set_user_password(
    client: &CognitoClient,
    userpool_id: &str,
    username: &str,
    password: &str,
    permanent: bool,
) -> Result<bool, Error> {
    match client
        .admin_set_user_password()
        .user_pool_id(userpool_id)
        .username(username)
        .password(password)
        .permanent(permanent)
        .send()
        .await
    {
        Ok(_) => Ok(true),
        Err(e) => match e.into_service_error() {
            AdminSetUserPasswordError::UserNotFoundException(_) => {
                tracing::warn!(target: TARGET, "[set_user_password] User {username} does not exist. Skipping...");
                Ok(false)
            }
            e => Err(failure("set_user_password", e)),
        },
    }
}

/// Initiates an admin authentication flow (default `ADMIN_NO_SRP_AUTH`).
///
/// When the app client has a secret, pass it so the `SECRET_HASH` parameter is sent.
/// Returns `Ok(None)` if the user does not exist.
pub async fn authenticate_user(
    client: &CognitoClient,
    userpool_id: &str,
    client_id: &str,
    username: &str,
    password: &str,
    auth_flow: Option<&str>,
    app_client_secret: Option<&str>,
) -> Result<Option<AdminInitiateAuthOutput>, Error> {
    let mut req = client
        .admin_initiate_auth()
        .user_pool_id(userpool_id)
        .client_id(client_id)
        .auth_flow(AuthFlowType::from(auth_flow.unwrap_or(DEFAULT_AUTH_FLOW)))
        .auth_parameters("USERNAME", username)
        .auth_parameters("PASSWORD", password)
        .client_metadata("username", username);
    if let Some(secret_hash) =
        app_client_secret.and_then(|secret| user_secret_hash(client_id, secret, username))
    {
        req = req.auth_parameters("SECRET_HASH", secret_hash);
    }

    match req.send().await {
        Ok(output) => {
            tracing::info!(target: TARGET, "[authenticate_user] User {username} authenticated.");
            Ok(Some(output))
        }
        Err(e) => match e.into_service_error() {
            AdminInitiateAuthError::UserNotFoundException(_) => {
                tracing::warn!(target: TARGET, "[authenticate_user] User {username} does not exist.");
                Ok(None)
            }
            e => Err(failure("authenticate_user", e)),
        },
    }
}
