//! Lookup-or-create folder resolution.

use std::sync::Arc;

use tracing::{debug, info};

use super::{FileStore, RemoteFolder};
use crate::error::FolderError;

/// Resolves a normalized folder path to a remote folder.
///
/// Resolution is two explicit calls: `find_folder_by_name`, then
/// `create_folder` only when nothing was found. Repeating it with the same
/// name returns the same folder. Two requests racing on a brand-new name can
/// still both create a folder; lookups return the oldest match, so later
/// requests settle on one of them.
#[derive(Clone)]
pub struct FolderResolver {
    store: Arc<dyn FileStore>,
}

impl FolderResolver {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, name: &str) -> Result<RemoteFolder, FolderError> {
        if let Some(folder) = self.store.find_folder_by_name(name).await? {
            debug!(name = %name, id = %folder.id, "Located existing folder");
            return Ok(folder);
        }

        info!(name = %name, "No folder with this name, creating one");
        self.store.create_folder(name).await
    }
}
