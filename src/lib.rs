//! report-drop — files emailed report attachments into Google Drive folders.

pub mod config;
pub mod error;
pub mod mail;
pub mod pipeline;
pub mod server;
pub mod storage;
pub mod subject;
