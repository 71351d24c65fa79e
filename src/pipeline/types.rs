//! Pipeline result types.

use serde::Serialize;

use crate::storage::RemoteFolder;

/// Outcome of filing one inbound message.
#[derive(Debug, Clone, Serialize)]
pub struct FilingReceipt {
    /// Folder the attachments were filed under.
    pub folder: RemoteFolder,
    /// Normalized folder path derived from the subject.
    pub structure: String,
    /// Normalized report name derived from the subject.
    pub report_name: String,
    /// Uploaded files, in attachment order.
    pub uploaded: Vec<UploadedFile>,
}

/// One file created in the storage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub file_id: String,
    pub name: String,
}
