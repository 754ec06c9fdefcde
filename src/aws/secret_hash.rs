// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the Cognito `SECRET_HASH` for app clients that have a client secret.
///
/// This is the base 64 encoding of HMAC-SHA256 over `username + client_id`, keyed by the
/// app client secret. Returns `None` if any argument is empty.
pub fn user_secret_hash(client_id: &str, app_client_secret: &str, username: &str) -> Option<String> {
    if client_id.is_empty() || app_client_secret.is_empty() || username.is_empty() {
        return None;
    }
    let mut mac = HmacSha256::new_from_slice(app_client_secret.as_bytes()).ok()?;
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());
    Some(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}
