//! Report filing pipeline.
//!
//! Every inbound message flows through:
//! 1. `parse_subject_line()` — folder path and report name
//! 2. `FolderResolver::resolve()` — lookup-or-create the destination folder
//! 3. For each attachment, in order: `download_attachment()` then `create_file()`
//!
//! The first failure stops the request. Files already uploaded stay uploaded.

pub mod processor;
pub mod types;

pub use processor::ReportProcessor;
pub use types::{FilingReceipt, UploadedFile};
