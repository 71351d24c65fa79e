//! Inbound webhook payload types.
//!
//! The provider posts either JSON or a url-encoded form. In the form
//! encoding every value is a string, so `attachments` arrives as a JSON
//! document inside a string field. Both encodings deserialize into the same
//! [`InboundMessage`].

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// One inbound email notification. Lives for a single request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    /// Raw subject line.
    #[serde(default)]
    pub subject: String,
    /// Copy of the `Subject` header, posted alongside `subject` by some routes.
    #[serde(default, rename = "Subject")]
    pub subject_header: Option<String>,
    /// Attachments to re-upload, in the order the provider listed them.
    #[serde(default, deserialize_with = "attachment_list")]
    pub attachments: Vec<AttachmentRef>,
    /// Top-level signature timestamp (form-encoded webhooks).
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    /// Top-level signature token (form-encoded webhooks).
    #[serde(default)]
    pub token: Option<String>,
    /// Signature digest, or the whole signature envelope for JSON webhooks.
    #[serde(default)]
    pub signature: Option<SignatureField>,
}

impl InboundMessage {
    /// The subject to route by, falling back to the raw header copy.
    pub fn subject_line(&self) -> &str {
        if self.subject.trim().is_empty() {
            self.subject_header.as_deref().unwrap_or_default()
        } else {
            &self.subject
        }
    }

    /// Collect the signature fields regardless of how they were encoded.
    pub fn webhook_signature(&self) -> Option<WebhookSignature> {
        match self.signature.as_ref()? {
            SignatureField::Envelope(sig) => Some(sig.clone()),
            SignatureField::Digest(digest) => Some(WebhookSignature {
                timestamp: self.timestamp.clone()?,
                token: self.token.clone()?,
                signature: digest.clone(),
            }),
        }
    }
}

/// Reference to an attachment held by the email provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Download URL. Left empty when absent so the fetch for this
    /// attachment fails in its turn.
    #[serde(default)]
    pub url: String,
    /// Content type declared by the sender.
    #[serde(
        default,
        rename = "contentType",
        alias = "content-type",
        alias = "content_type"
    )]
    pub content_type: Option<String>,
    /// Original file name.
    #[serde(default)]
    pub name: Option<String>,
    /// Size in bytes, when reported.
    #[serde(default)]
    pub size: Option<u64>,
}

/// Attachment content downloaded from the provider.
#[derive(Debug, Clone)]
pub struct FetchedAttachment {
    pub data: Vec<u8>,
    pub mime_type: String,
    /// Extension without the leading dot.
    pub ext: String,
}

/// `signature` is a hex digest in form posts and an object in JSON posts.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignatureField {
    Digest(String),
    Envelope(WebhookSignature),
}

/// Provider signature over `timestamp ‖ token`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebhookSignature {
    pub timestamp: Timestamp,
    pub token: String,
    pub signature: String,
}

/// Unix timestamp as sent by the provider, kept verbatim since it is signed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Text(String),
    Number(u64),
}

impl Timestamp {
    /// The exact text that was signed.
    pub fn as_signed_text(&self) -> String {
        match self {
            Timestamp::Text(s) => s.clone(),
            Timestamp::Number(n) => n.to_string(),
        }
    }

    pub fn as_secs(&self) -> Option<u64> {
        match self {
            Timestamp::Text(s) => s.trim().parse().ok(),
            Timestamp::Number(n) => Some(*n),
        }
    }
}

/// Accept a JSON array, a string holding a JSON array, an empty string, or null.
fn attachment_list<'de, D>(deserializer: D) -> Result<Vec<AttachmentRef>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<AttachmentRef>),
        Encoded(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(Raw::List(list)) => Ok(list),
        Some(Raw::Encoded(text)) if text.trim().is_empty() => Ok(Vec::new()),
        Some(Raw::Encoded(text)) => serde_json::from_str(&text)
            .map_err(|e| de::Error::custom(format!("attachments is not a JSON list: {e}"))),
    }
}
