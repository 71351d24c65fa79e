//! HTTP surface: `POST /receive` webhook and `GET /` health check.

use std::sync::Arc;

use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use tower_http::trace::TraceLayer;

use crate::error::{Error, WebhookError};
use crate::mail::{InboundMessage, SignatureVerifier};
use crate::pipeline::ReportProcessor;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<ReportProcessor>,
    /// Signature verifier (None if verification is disabled).
    pub verifier: Option<SignatureVerifier>,
}

/// Build the Axum router for the webhook service.
pub fn routes(processor: Arc<ReportProcessor>, verifier: Option<SignatureVerifier>) -> Router {
    let state = AppState {
        processor,
        verifier,
    };

    Router::new()
        .route("/", get(health))
        .route("/receive", post(receive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> &'static str {
    "report-drop is working"
}

// ── Webhook ─────────────────────────────────────────────────────────────

/// Inbound message decoded from a JSON or url-encoded body.
pub struct WebhookPayload(pub InboundMessage);

impl<S> FromRequest<S> for WebhookPayload
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let message = if is_form {
            let Form(message) = Form::<InboundMessage>::from_request(req, state)
                .await
                .map_err(|e| WebhookError::InvalidPayload(e.body_text()))?;
            message
        } else {
            let Json(message) = Json::<InboundMessage>::from_request(req, state)
                .await
                .map_err(|e| WebhookError::InvalidPayload(e.body_text()))?;
            message
        };

        Ok(Self(message))
    }
}

async fn receive(
    State(state): State<AppState>,
    WebhookPayload(message): WebhookPayload,
) -> Result<impl IntoResponse, Error> {
    if let Some(verifier) = &state.verifier {
        verifier.verify(message.webhook_signature().as_ref())?;
    }

    let receipt = state.processor.process(&message).await?;
    Ok(Json(receipt))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::*;
    use crate::error::{FetchError, FolderError, UploadError};
    use crate::mail::{AttachmentFetcher, AttachmentRef, FetchedAttachment};
    use crate::storage::{FileStore, NewFile, RemoteFolder};

    struct NoopFetcher;

    #[async_trait]
    impl AttachmentFetcher for NoopFetcher {
        async fn download_attachment(
            &self,
            _attachment: &AttachmentRef,
        ) -> Result<FetchedAttachment, FetchError> {
            Ok(FetchedAttachment {
                data: b"%PDF".to_vec(),
                mime_type: "application/pdf".into(),
                ext: "pdf".into(),
            })
        }
    }

    struct FixedStore;

    #[async_trait]
    impl FileStore for FixedStore {
        async fn find_folder_by_name(
            &self,
            name: &str,
        ) -> Result<Option<RemoteFolder>, FolderError> {
            Ok(Some(RemoteFolder {
                id: "folder-1".into(),
                name: name.into(),
            }))
        }

        async fn create_folder(&self, _name: &str) -> Result<RemoteFolder, FolderError> {
            unimplemented!("folders always exist in this stub")
        }

        async fn create_file(&self, file: NewFile) -> Result<String, UploadError> {
            Ok(format!("id-{}", file.name))
        }
    }

    fn app(verifier: Option<SignatureVerifier>) -> Router {
        let processor = Arc::new(ReportProcessor::new(Arc::new(NoopFetcher), Arc::new(FixedStore)));
        routes(processor, verifier)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.oneshot(request).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    fn json_post(body: &str) -> Request<Body> {
        Request::post("/receive")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_returns_plain_text() {
        let resp = app(None)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"report-drop is working");
    }

    #[tokio::test]
    async fn json_webhook_files_attachments() {
        let (status, body) = send(
            app(None),
            json_post(
                r#"{"subject": "Reports/Sales - Weekly",
                    "attachments": [{"url": "https://mg/a", "contentType": "application/pdf"}]}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["folder"]["id"], "folder-1");
        assert_eq!(body["structure"], "reports/sales");
        assert_eq!(body["uploaded"][0]["name"], "weekly.pdf");
        assert_eq!(body["uploaded"][0]["file_id"], "id-weekly.pdf");
    }

    #[tokio::test]
    async fn form_webhook_with_encoded_attachments() {
        let request = Request::post("/receive")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(
                "subject=Reports%2FSales+-+Weekly\
                 &attachments=%5B%7B%22url%22%3A%22https%3A%2F%2Fmg%2Fa%22%7D%5D\
                 &sender=reports%40example.com",
            ))
            .unwrap();

        let (status, body) = send(app(None), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["uploaded"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (status, body) = send(app(None), json_post("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "webhook");
    }

    #[tokio::test]
    async fn unparseable_subject_is_unprocessable() {
        let (status, body) = send(app(None), json_post(r#"{"subject": "Weekly"}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "parse");
        assert!(body["message"].as_str().unwrap().contains("Weekly"));
    }

    #[tokio::test]
    async fn unsigned_webhook_rejected_when_verifier_configured() {
        let verifier = SignatureVerifier::new(SecretString::from("k"), Duration::from_secs(900));
        let (status, body) = send(
            app(Some(verifier)),
            json_post(r#"{"subject": "Reports - Weekly"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "webhook");
    }
}
