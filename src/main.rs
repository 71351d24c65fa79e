use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use report_drop::config::AppConfig;
use report_drop::mail::{MailgunClient, SignatureVerifier};
use report_drop::pipeline::ReportProcessor;
use report_drop::server::routes;
use report_drop::storage::DriveClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading any configuration
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("failed to build HTTP client")?;

    // ── Email provider ──────────────────────────────────────────────────
    let fetcher = Arc::new(MailgunClient::new(config.mailgun.clone(), http));

    let verifier = config
        .signature
        .as_ref()
        .map(|sig| SignatureVerifier::new(sig.signing_key.clone(), sig.max_age));

    // ── Storage provider ────────────────────────────────────────────────
    let store = Arc::new(
        DriveClient::connect(config.drive.clone(), &config.drive_auth, config.http_timeout)
            .await
            .context("failed to set up Drive client")?,
    );

    let processor = Arc::new(ReportProcessor::new(fetcher, store));
    let app = routes(processor, verifier.clone());

    let addr = SocketAddr::new(config.bind_addr, config.port);
    eprintln!("📬 report-drop v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://{}/receive", addr);
    eprintln!("   Drive: {} ({})", config.drive.api_base, config.drive_auth.mode());
    eprintln!(
        "   Parent folder: {}",
        config.drive.parent_folder_id.as_deref().unwrap_or("(none)")
    );
    eprintln!(
        "   Attachment hosts: {}",
        config.mailgun.attachment_hosts.join(", ")
    );
    if verifier.is_some() {
        eprintln!("   Signatures: verified\n");
    } else {
        eprintln!("   Signatures: NOT verified\n");
        tracing::warn!("MAILGUN_WEBHOOK_SIGNING_KEY not set; webhook signatures are not verified");
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Webhook server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Webhook server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
