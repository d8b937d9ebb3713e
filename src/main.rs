use std::net::SocketAddr;
use std::sync::Arc;

use mail_relay::config::AppConfig;
use mail_relay::relay::RelayProcessor;
use mail_relay::sender;
use mail_relay::server::relay_routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let AppConfig {
        relay: relay_config,
        transport: transport_config,
        server: server_config,
    } = AppConfig::from_env()?;

    let sender = sender::from_config(transport_config)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        mailbox = %relay_config.mailbox,
        to_marker = %relay_config.markers.to,
        from_marker = %relay_config.markers.from,
        nametags = relay_config.nametags.len(),
        transport = sender.name(),
        "Mail relay configured"
    );

    let processor = Arc::new(RelayProcessor::new(Arc::new(relay_config), sender));
    let app = relay_routes(processor, server_config.max_body_bytes);

    let addr = SocketAddr::new(server_config.bind, server_config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Webhook server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
