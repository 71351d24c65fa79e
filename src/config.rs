//! Configuration types, built from environment variables.

use std::net::IpAddr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::mail::MailgunConfig;
use crate::storage::{DriveAuth, DriveConfig};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SIGNATURE_MAX_AGE_SECS: u64 = 900;
const DEFAULT_ATTACHMENT_HOSTS: &str = "mailgun.net,mailgun.org";
const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com";

/// Webhook signature settings.
#[derive(Debug, Clone)]
pub struct SignatureConfig {
    pub signing_key: SecretString,
    pub max_age: Duration,
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Timeout applied to every outbound HTTP request.
    pub http_timeout: Duration,
    pub mailgun: MailgunConfig,
    /// `None` disables signature verification.
    pub signature: Option<SignatureConfig>,
    pub drive: DriveConfig,
    pub drive_auth: DriveAuth,
}

impl AppConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key → value lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = parse_or(&get, "PORT", DEFAULT_PORT)?;
        let bind_addr = parse_or(&get, "BIND_ADDR", IpAddr::from([0, 0, 0, 0]))?;
        let http_timeout =
            Duration::from_secs(parse_or(&get, "HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?);

        let api_key = get("MAILGUN_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("MAILGUN_API_KEY".into()))?;
        let attachment_hosts: Vec<String> = get("MAILGUN_ATTACHMENT_HOSTS")
            .unwrap_or_else(|| DEFAULT_ATTACHMENT_HOSTS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let signature = match get("MAILGUN_WEBHOOK_SIGNING_KEY") {
            Some(key) => Some(SignatureConfig {
                signing_key: SecretString::from(key),
                max_age: Duration::from_secs(parse_or(
                    &get,
                    "MAILGUN_SIGNATURE_MAX_AGE_SECS",
                    DEFAULT_SIGNATURE_MAX_AGE_SECS,
                )?),
            }),
            None => None,
        };

        let drive_auth = match get("DRIVE_ACCESS_TOKEN") {
            Some(token) => DriveAuth::AccessToken(SecretString::from(token)),
            None => {
                let missing = |key: &str| ConfigError::MissingRequired {
                    key: key.to_string(),
                    hint: "Set DRIVE_ACCESS_TOKEN, or GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET \
                           and GOOGLE_REFRESH_TOKEN"
                        .to_string(),
                };
                DriveAuth::RefreshToken {
                    client_id: get("GOOGLE_CLIENT_ID").ok_or_else(|| missing("GOOGLE_CLIENT_ID"))?,
                    client_secret: SecretString::from(
                        get("GOOGLE_CLIENT_SECRET")
                            .ok_or_else(|| missing("GOOGLE_CLIENT_SECRET"))?,
                    ),
                    refresh_token: SecretString::from(
                        get("GOOGLE_REFRESH_TOKEN")
                            .ok_or_else(|| missing("GOOGLE_REFRESH_TOKEN"))?,
                    ),
                }
            }
        };

        Ok(Self {
            bind_addr,
            port,
            http_timeout,
            mailgun: MailgunConfig {
                api_key: SecretString::from(api_key),
                attachment_hosts,
            },
            signature,
            drive: DriveConfig {
                api_base: get("DRIVE_API_BASE")
                    .unwrap_or_else(|| DEFAULT_DRIVE_API_BASE.to_string()),
                parent_folder_id: get("DRIVE_PARENT_FOLDER_ID"),
            },
            drive_auth,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
    }
}
