//! Email-provider side: webhook payloads, signatures, attachment downloads.

pub mod mailgun;
pub mod signature;
pub mod types;

pub use mailgun::{MailgunClient, MailgunConfig};
pub use signature::SignatureVerifier;
pub use types::{AttachmentRef, FetchedAttachment, InboundMessage, WebhookSignature};

use async_trait::async_trait;

use crate::error::FetchError;

/// Retrieves attachment content referenced by an inbound message.
#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    /// Download one attachment with its MIME type and file extension.
    async fn download_attachment(
        &self,
        attachment: &AttachmentRef,
    ) -> Result<FetchedAttachment, FetchError>;
}
