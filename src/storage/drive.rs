//! Google Drive v3 client on top of the generated `google-drive3` hub.
//!
//! Folders are plain Drive files with the folder MIME type. Uploads use the
//! hub's simple upload protocol, a single `multipart/related` request.

use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use google_drive3::api::{File, Scope};
use google_drive3::hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use google_drive3::hyper_util::client::legacy::Client;
use google_drive3::hyper_util::client::legacy::connect::HttpConnector;
use google_drive3::hyper_util::rt::TokioExecutor;
use google_drive3::yup_oauth2::AuthorizedUserAuthenticator;
use google_drive3::yup_oauth2::client::CustomHyperClientBuilder;
use google_drive3::DriveHub;
use secrecy::ExposeSecret;
use tracing::{debug, info};

use super::auth::{DriveAuth, authorized_user_secret};
use super::{FileStore, NewFile, RemoteFolder};
use crate::error::{AuthError, FolderError, UploadError};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

type Connector = HttpsConnector<HttpConnector>;

/// Drive client configuration.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// API root, e.g. `https://www.googleapis.com`.
    pub api_base: String,
    /// Create and look up folders under this parent instead of anywhere.
    pub parent_folder_id: Option<String>,
}

/// Drive-backed [`FileStore`].
pub struct DriveClient {
    hub: DriveHub<Connector>,
    parent_folder_id: Option<String>,
    timeout: Duration,
}

impl DriveClient {
    /// Build the hub and its authenticator. No request is made until first use.
    pub async fn connect(
        config: DriveConfig,
        auth: &DriveAuth,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| AuthError::Setup(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();

        // Plain http is allowed so the API base can point at a local server.
        let connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector.clone());

        let mut hub = match auth {
            DriveAuth::AccessToken(token) => {
                DriveHub::new(client, token.expose_secret().to_string())
            }
            DriveAuth::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
            } => {
                let secret = authorized_user_secret(client_id, client_secret, refresh_token)?;
                let authenticator = AuthorizedUserAuthenticator::with_client(
                    secret,
                    CustomHyperClientBuilder::from(
                        Client::builder(TokioExecutor::new()).build(connector),
                    ),
                )
                .build()
                .await
                .map_err(|e| AuthError::Setup(format!("authenticator: {e}")))?;
                DriveHub::new(client, authenticator)
            }
        };

        let root = format!("{}/", config.api_base.trim_end_matches('/'));
        hub.base_url(format!("{root}drive/v3/"));
        hub.root_url(root);

        Ok(Self {
            hub,
            parent_folder_id: config.parent_folder_id,
            timeout,
        })
    }

    /// Run one hub call under the request timeout.
    async fn bounded<T, F>(&self, call: F) -> Result<T, CallFailure>
    where
        F: Future<Output = google_drive3::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(CallFailure::from),
            Err(_) => Err(CallFailure::Transport(format!(
                "timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl FileStore for DriveClient {
    async fn find_folder_by_name(&self, name: &str) -> Result<Option<RemoteFolder>, FolderError> {
        let q = folder_query(name, self.parent_folder_id.as_deref());

        // Oldest first, so racing creators converge on the same folder.
        let call = self
            .hub
            .files()
            .list()
            .q(&q)
            .order_by("createdTime")
            .page_size(1)
            .supports_all_drives(true)
            .include_items_from_all_drives(true)
            .param("fields", "files(id,name)")
            .add_scope(Scope::Full)
            .doit();
        let (_, list) = self
            .bounded(call)
            .await
            .map_err(|f| f.into_folder_error(name, FolderAction::Lookup))?;

        let found = list
            .files
            .unwrap_or_default()
            .into_iter()
            .find_map(|file| remote_folder(file, name));
        debug!(name = %name, found = found.is_some(), "Folder lookup");
        Ok(found)
    }

    async fn create_folder(&self, name: &str) -> Result<RemoteFolder, FolderError> {
        let metadata = File {
            name: Some(name.to_string()),
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            parents: self.parent_folder_id.clone().map(|parent| vec![parent]),
            ..Default::default()
        };

        let call = self
            .hub
            .files()
            .create(metadata)
            .supports_all_drives(true)
            .param("fields", "id,name")
            .add_scope(Scope::Full)
            .doit_without_upload();
        let (_, created) = self
            .bounded(call)
            .await
            .map_err(|f| f.into_folder_error(name, FolderAction::Create))?;

        let folder = remote_folder(created, name).ok_or_else(|| FolderError::CreateFailed {
            name: name.to_string(),
            reason: "response has no folder id".into(),
        })?;
        info!(name = %folder.name, id = %folder.id, "Created Drive folder");
        Ok(folder)
    }

    async fn create_file(&self, file: NewFile) -> Result<String, UploadError> {
        let name = file.name.clone();
        let mime_type: mime::Mime = file
            .mime_type
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);
        let metadata = File {
            name: Some(file.name),
            parents: Some(vec![file.parent_id]),
            ..Default::default()
        };

        let call = self
            .hub
            .files()
            .create(metadata)
            .supports_all_drives(true)
            .param("fields", "id")
            .add_scope(Scope::Full)
            .upload(Cursor::new(file.data), mime_type);
        let (_, created) = self
            .bounded(call)
            .await
            .map_err(|f| f.into_upload_error(&name))?;

        created.id.ok_or_else(|| UploadError::RequestFailed {
            name,
            reason: "response has no file id".into(),
        })
    }
}

/// Why a hub call produced no result.
#[derive(Debug)]
enum CallFailure {
    Auth(AuthError),
    Status { status: u16, detail: String },
    Transport(String),
}

#[derive(Debug, Clone, Copy)]
enum FolderAction {
    Lookup,
    Create,
}

impl From<google_drive3::Error> for CallFailure {
    fn from(err: google_drive3::Error) -> Self {
        match err {
            google_drive3::Error::MissingToken(e) => {
                CallFailure::Auth(AuthError::TokenUnavailable(e.to_string()))
            }
            google_drive3::Error::BadRequest(body) => CallFailure::Status {
                status: body["error"]["code"]
                    .as_u64()
                    .and_then(|code| u16::try_from(code).ok())
                    .unwrap_or(400),
                detail: body["error"]["message"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| body.to_string()),
            },
            google_drive3::Error::Failure(resp) => CallFailure::Status {
                status: resp.status().as_u16(),
                detail: resp.status().to_string(),
            },
            other => CallFailure::Transport(other.to_string()),
        }
    }
}

impl CallFailure {
    fn into_folder_error(self, name: &str, action: FolderAction) -> FolderError {
        let reason = match self {
            CallFailure::Auth(e) => return FolderError::Auth(e),
            CallFailure::Status { status, detail } => format!("HTTP {status}: {detail}"),
            CallFailure::Transport(reason) => reason,
        };
        let name = name.to_string();
        match action {
            FolderAction::Lookup => FolderError::LookupFailed { name, reason },
            FolderAction::Create => FolderError::CreateFailed { name, reason },
        }
    }

    fn into_upload_error(self, name: &str) -> UploadError {
        match self {
            CallFailure::Auth(e) => UploadError::Auth(e),
            CallFailure::Status { status, detail } => UploadError::Rejected {
                name: name.to_string(),
                status,
                reason: detail,
            },
            CallFailure::Transport(reason) => UploadError::RequestFailed {
                name: name.to_string(),
                reason,
            },
        }
    }
}

fn remote_folder(file: File, requested: &str) -> Option<RemoteFolder> {
    Some(RemoteFolder {
        id: file.id.filter(|id| !id.is_empty())?,
        name: file.name.unwrap_or_else(|| requested.to_string()),
    })
}

/// Drive search query for a non-trashed folder with exactly this name.
pub fn folder_query(name: &str, parent_folder_id: Option<&str>) -> String {
    let mut q = format!(
        "name = '{}' and mimeType = '{FOLDER_MIME_TYPE}' and trashed = false",
        escape_query_value(name)
    );
    if let Some(parent) = parent_folder_id {
        q.push_str(&format!(" and '{}' in parents", escape_query_value(parent)));
    }
    q
}

/// Escape a value for use inside a single-quoted Drive query string.
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
