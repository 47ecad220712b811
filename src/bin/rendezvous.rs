//! roomlink-rendezvous - claim registry for roomlink rooms.
//!
//! Usage: `roomlink-rendezvous [config.toml]`

use roomlink::config::{Config, validation};
use roomlink::rendezvous::RendezvousServer;
use roomlink::{http, metrics, telemetry};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path).map_err(|e| {
            error!(path = %config_path, error = %e, "Failed to load config");
            e
        })?
    } else {
        info!(path = %config_path, "No config file, using defaults");
        Config::default()
    };

    if let Err(errors) = validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("configuration has {} error(s)", errors.len());
    }

    if let Some(m) = &config.metrics {
        metrics::init();
        let port = m.port;
        tokio::spawn(async move {
            http::run_http_server(port).await;
        });
        info!(port, "Prometheus HTTP server started");
    }

    let listener = TcpListener::bind(config.rendezvous.listen).await?;
    let server = RendezvousServer::new(config.session.max_line_len);

    tokio::select! {
        result = server.run(listener) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}
