use std::sync::Arc;

use anyhow::Context;

use memos_relay::channels::{BarkChannel, TelegramChannel, build_client};
use memos_relay::config::RelayConfig;
use memos_relay::forward::Forwarder;
use memos_relay::webhook::{WebhookState, webhook_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RelayConfig::from_env().context("Failed to load configuration")?;
    let timeout = config.request_timeout();

    eprintln!("📮 memos-relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://{}/api/webhook/memos", config.listen_addr);
    eprintln!("   Memos: {}", config.memos.base_url);
    eprintln!(
        "   Bark: {}",
        if config.bark.enabled {
            format!(
                "enabled ({}, {} recipients configured)",
                config.bark.server_url,
                config.bark.device_keys.len()
            )
        } else {
            "disabled".to_string()
        }
    );
    eprintln!(
        "   Telegram: {}",
        if config.telegram.enabled {
            format!(
                "enabled ({} chats configured)",
                config.telegram.chat_ids.len()
            )
        } else {
            "disabled".to_string()
        }
    );

    let RelayConfig {
        listen_addr,
        memos,
        bark,
        telegram,
        ..
    } = config;

    if bark.enabled && bark.device_keys.is_empty() {
        tracing::warn!("Bark is enabled but no device keys are configured");
    }
    if telegram.enabled && telegram.chat_ids.is_empty() {
        tracing::warn!("Telegram is enabled but no chat ids are configured");
    }

    let bark = Arc::new(BarkChannel::new(
        Arc::new(bark),
        build_client(timeout).context("Failed to build Bark HTTP client")?,
    ));
    let telegram = Arc::new(TelegramChannel::new(
        Arc::new(telegram),
        build_client(timeout).context("Failed to build Telegram HTTP client")?,
    ));

    let forwarder = Arc::new(Forwarder::new(Arc::new(memos), bark, telegram));
    let app = webhook_routes(WebhookState { forwarder });

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "Webhook server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Webhook server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
