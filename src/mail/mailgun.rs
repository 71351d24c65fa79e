//! Mailgun attachment downloads.
//!
//! Stored-message attachments are served from `storage.<region>.mailgun.net`
//! behind HTTP basic auth (`api:<key>`). The key is only ever sent to hosts
//! on the configured allowlist.

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use super::AttachmentFetcher;
use super::types::{AttachmentRef, FetchedAttachment};
use crate::error::FetchError;

const OCTET_STREAM: &str = "application/octet-stream";

/// Mailgun client configuration.
#[derive(Debug, Clone)]
pub struct MailgunConfig {
    pub api_key: SecretString,
    /// Hosts (and their subdomains) attachments may be fetched from. `*` allows any.
    pub attachment_hosts: Vec<String>,
}

/// Downloads attachments from Mailgun message storage.
pub struct MailgunClient {
    config: MailgunConfig,
    client: reqwest::Client,
}

impl MailgunClient {
    pub fn new(config: MailgunConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn validate_url(&self, raw: &str) -> Result<Url, FetchError> {
        let invalid = |reason: &str| FetchError::InvalidReference {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("unsupported URL scheme"));
        }
        let host = url.host_str().ok_or_else(|| invalid("URL has no host"))?;
        if !is_host_allowed(&self.config.attachment_hosts, host) {
            return Err(invalid("host is not an allowed attachment host"));
        }
        Ok(url)
    }
}

#[async_trait]
impl AttachmentFetcher for MailgunClient {
    async fn download_attachment(
        &self,
        attachment: &AttachmentRef,
    ) -> Result<FetchedAttachment, FetchError> {
        let url = self.validate_url(&attachment.url)?;
        let request_failed = |e: reqwest::Error| FetchError::RequestFailed {
            url: attachment.url.clone(),
            reason: e.to_string(),
        };

        let resp = self
            .client
            .get(url)
            .basic_auth("api", Some(self.config.api_key.expose_secret()))
            .send()
            .await
            .map_err(request_failed)?;

        if !resp.status().is_success() {
            return Err(FetchError::Unavailable {
                url: attachment.url.clone(),
                status: resp.status().as_u16(),
            });
        }

        let served_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = resp.bytes().await.map_err(request_failed)?.to_vec();

        let mime_type = resolve_mime_type(served_type.as_deref(), attachment.content_type.as_deref());
        let ext = resolve_extension(attachment.name.as_deref(), &mime_type);

        debug!(
            url = %attachment.url,
            bytes = data.len(),
            mime_type = %mime_type,
            ext = %ext,
            "Downloaded attachment"
        );

        Ok(FetchedAttachment {
            data,
            mime_type,
            ext,
        })
    }
}

/// Check a URL host against the allowlist.
///
/// - `*` in list → allow all
/// - `example.com` → `example.com` and any subdomain
pub fn is_host_allowed(allowed: &[String], host: &str) -> bool {
    let host = host.trim_end_matches('.').to_lowercase();
    allowed.iter().any(|entry| {
        let entry = entry.trim().trim_start_matches('.').to_lowercase();
        entry == "*"
            || (!entry.is_empty()
                && (host == entry
                    || host
                        .strip_suffix(entry.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))))
    })
}

/// Pick the served content type, then the declared one, then octet-stream.
/// Parameters such as `charset` are dropped.
pub fn resolve_mime_type(served: Option<&str>, declared: Option<&str>) -> String {
    [served, declared]
        .into_iter()
        .flatten()
        .filter_map(|raw| raw.parse::<mime::Mime>().ok())
        .map(|m| m.essence_str().to_string())
        .find(|essence| essence != OCTET_STREAM)
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// Extension from the original file name, else from the MIME type, else `bin`.
pub fn resolve_extension(file_name: Option<&str>, mime_type: &str) -> String {
    if let Some(ext) = file_name.and_then(extension_from_name) {
        return ext;
    }

    let preferred = match mime_type {
        "text/plain" => Some("txt"),
        "text/html" => Some("html"),
        "image/jpeg" => Some("jpg"),
        "image/tiff" => Some("tiff"),
        "application/vnd.ms-excel" => Some("xls"),
        "application/msword" => Some("doc"),
        OCTET_STREAM => Some("bin"),
        _ => None,
    };

    preferred
        .or_else(|| {
            mime_guess::get_mime_extensions_str(mime_type).and_then(|exts| exts.first().copied())
        })
        .unwrap_or("bin")
        .to_string()
}

fn extension_from_name(name: &str) -> Option<String> {
    let (stem, ext) = name.trim().rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    let ext: String = ext
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (!ext.is_empty() && ext.len() <= 10).then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(hosts: &[&str]) -> MailgunClient {
        MailgunClient::new(
            MailgunConfig {
                api_key: SecretString::from("key-test"),
                attachment_hosts: hosts.iter().map(|h| h.to_string()).collect(),
            },
            reqwest::Client::new(),
        )
    }

    // ── Host allowlist ──────────────────────────────────────────

    #[test]
    fn allowlist_matches_domain_and_subdomains() {
        let allowed = vec!["mailgun.net".to_string()];
        assert!(is_host_allowed(&allowed, "mailgun.net"));
        assert!(is_host_allowed(&allowed, "storage-us-east4.api.mailgun.net"));
        assert!(is_host_allowed(&allowed, "Storage.MAILGUN.net"));
        assert!(!is_host_allowed(&allowed, "evilmailgun.net"));
        assert!(!is_host_allowed(&allowed, "mailgun.net.evil.com"));
    }

    #[test]
    fn allowlist_wildcard_and_empty() {
        assert!(is_host_allowed(&["*".to_string()], "127.0.0.1"));
        assert!(!is_host_allowed(&[], "mailgun.net"));
        assert!(!is_host_allowed(&[String::new()], "mailgun.net"));
    }

    #[test]
    fn validate_rejects_malformed_and_foreign_urls() {
        let c = client(&["mailgun.net"]);
        assert!(c.validate_url("https://storage.mailgun.net/v3/x").is_ok());
        for bad in [
            "",
            "not a url",
            "ftp://storage.mailgun.net/x",
            "https://example.com/x",
            "file:///etc/passwd",
        ] {
            assert!(
                matches!(c.validate_url(bad), Err(FetchError::InvalidReference { .. })),
                "expected {bad} to be rejected"
            );
        }
    }

    // ── MIME type and extension ─────────────────────────────────

    #[test]
    fn mime_prefers_served_type_without_params() {
        assert_eq!(
            resolve_mime_type(Some("text/csv; charset=utf-8"), Some("application/pdf")),
            "text/csv"
        );
    }

    #[test]
    fn mime_skips_octet_stream_and_garbage() {
        assert_eq!(
            resolve_mime_type(Some("application/octet-stream"), Some("application/pdf")),
            "application/pdf"
        );
        assert_eq!(resolve_mime_type(Some("???"), None), OCTET_STREAM);
        assert_eq!(resolve_mime_type(None, None), OCTET_STREAM);
    }

    #[test]
    fn extension_from_file_name_first() {
        assert_eq!(resolve_extension(Some("Sales Q3.XLSX"), "application/pdf"), "xlsx");
        assert_eq!(resolve_extension(Some("archive.tar.gz"), OCTET_STREAM), "gz");
    }

    #[test]
    fn extension_from_mime_type() {
        assert_eq!(resolve_extension(None, "application/pdf"), "pdf");
        assert_eq!(resolve_extension(None, "text/plain"), "txt");
        assert_eq!(resolve_extension(None, "image/jpeg"), "jpg");
        assert_eq!(resolve_extension(Some(".hidden"), "text/csv"), "csv");
        assert_eq!(resolve_extension(Some("noext"), "text/csv"), "csv");
    }

    #[test]
    fn extension_fallback_is_bin() {
        assert_eq!(resolve_extension(None, OCTET_STREAM), "bin");
        assert_eq!(resolve_extension(None, "application/x-made-up"), "bin");
    }
}
