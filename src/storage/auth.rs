//! Drive API credentials.
//!
//! Either a fixed bearer token or an OAuth2 refresh-token grant. The grant is
//! run by `yup-oauth2`'s authorized-user flow, which also caches the exchanged
//! access token until it expires.

use google_drive3::yup_oauth2::authorized_user::AuthorizedUserSecret;
use secrecy::{ExposeSecret, SecretString};

use crate::error::AuthError;

/// How to obtain Drive access tokens.
#[derive(Debug, Clone)]
pub enum DriveAuth {
    /// Use this bearer token as-is.
    AccessToken(SecretString),
    /// Exchange a long-lived refresh token with Google's token endpoint.
    RefreshToken {
        client_id: String,
        client_secret: SecretString,
        refresh_token: SecretString,
    },
}

impl DriveAuth {
    /// Short label for startup output.
    pub fn mode(&self) -> &'static str {
        match self {
            DriveAuth::AccessToken(_) => "static token",
            DriveAuth::RefreshToken { .. } => "refresh token",
        }
    }
}

/// Credentials in the shape of an `authorized_user` JSON key file.
pub(crate) fn authorized_user_secret(
    client_id: &str,
    client_secret: &SecretString,
    refresh_token: &SecretString,
) -> Result<AuthorizedUserSecret, AuthError> {
    serde_json::from_value(serde_json::json!({
        "type": "authorized_user",
        "client_id": client_id,
        "client_secret": client_secret.expose_secret(),
        "refresh_token": refresh_token.expose_secret(),
    }))
    .map_err(|e| AuthError::Setup(format!("authorized-user secret: {e}")))
}
