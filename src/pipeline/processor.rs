//! Report processor — files the attachments of one inbound message.
//!
//! Flow:
//! 1. Subject → `(structure, report name)`
//! 2. Structure → destination folder (lookup-or-create)
//! 3. Attachments, one at a time in listed order → download → upload as
//!    `<report name>.<ext>`
//!
//! Nothing is retried and nothing is rolled back.

use std::sync::Arc;

use tracing::{debug, info};

use super::types::{FilingReceipt, UploadedFile};
use crate::error::Result;
use crate::mail::{AttachmentFetcher, InboundMessage};
use crate::storage::{FileStore, FolderResolver, NewFile};
use crate::subject::parse_subject_line;

/// Sequences parsing, folder resolution, downloads and uploads.
pub struct ReportProcessor {
    fetcher: Arc<dyn AttachmentFetcher>,
    store: Arc<dyn FileStore>,
    resolver: FolderResolver,
}

impl ReportProcessor {
    pub fn new(fetcher: Arc<dyn AttachmentFetcher>, store: Arc<dyn FileStore>) -> Self {
        let resolver = FolderResolver::new(Arc::clone(&store));
        Self {
            fetcher,
            store,
            resolver,
        }
    }

    /// File every attachment of `message`. Stops at the first failure.
    pub async fn process(&self, message: &InboundMessage) -> Result<FilingReceipt> {
        let subject = parse_subject_line(message.subject_line())?;
        info!(
            structure = %subject.normalized_structure,
            report = %subject.normalized_report_name,
            attachments = message.attachments.len(),
            "Received report email"
        );

        let folder = self.resolver.resolve(&subject.normalized_structure).await?;
        debug!(
            structure = %subject.normalized_structure,
            folder_id = %folder.id,
            "Resolved destination folder"
        );

        let mut uploaded = Vec::with_capacity(message.attachments.len());
        for attachment in &message.attachments {
            let fetched = self.fetcher.download_attachment(attachment).await?;
            let name = format!("{}.{}", subject.normalized_report_name, fetched.ext);
            debug!(name = %name, bytes = fetched.data.len(), "Uploading attachment");

            let file_id = self
                .store
                .create_file(NewFile {
                    name: name.clone(),
                    parent_id: folder.id.clone(),
                    mime_type: fetched.mime_type,
                    data: fetched.data,
                })
                .await?;
            uploaded.push(UploadedFile { file_id, name });
        }

        info!(
            folder_id = %folder.id,
            uploaded = uploaded.len(),
            "Finished filing attachments"
        );

        Ok(FilingReceipt {
            folder,
            structure: subject.normalized_structure,
            report_name: subject.normalized_report_name,
            uploaded,
        })
    }
}
