//! Storage-provider side: folder lookup/creation and file uploads.

pub mod auth;
pub mod drive;
pub mod resolver;

pub use auth::DriveAuth;
pub use drive::{DriveClient, DriveConfig};
pub use resolver::FolderResolver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{FolderError, UploadError};

/// A folder owned by the storage service. Never cached across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolder {
    pub id: String,
    pub name: String,
}

/// A file to create inside a folder.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub parent_id: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Remote file storage operations.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Find a folder with exactly this name, if one exists.
    async fn find_folder_by_name(&self, name: &str) -> Result<Option<RemoteFolder>, FolderError>;

    /// Create a folder with this name.
    async fn create_folder(&self, name: &str) -> Result<RemoteFolder, FolderError>;

    /// Create a file and return its id.
    async fn create_file(&self, file: NewFile) -> Result<String, UploadError>;
}
