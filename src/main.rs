//! roomlink - terminal chat client.
//!
//! Usage: `roomlink [config.toml] [room]`

use anyhow::Context;
use roomlink::chat::{ChatPayload, Input};
use roomlink::config::{Config, validation};
use roomlink::rendezvous::TcpRendezvous;
use roomlink::session::Session;
use roomlink::{PeerId, http, metrics, telemetry};
use roomlink_proto::ChatEvent;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "config.toml".to_string());

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

    let room = args
        .next()
        .or_else(|| config.chat.room.clone())
        .context("no room given on the command line or in [chat]")?;

    if let Some(m) = &config.metrics {
        metrics::init();
        let port = m.port;
        tokio::spawn(async move {
            http::run_http_server(port).await;
        });
    }

    let author = config.identity.name.clone();
    let rendezvous = TcpRendezvous::from_config(&config.rendezvous, &config.session);
    let session = Session::with_identity(
        PeerId::random(),
        Arc::new(rendezvous),
        config.session.clone(),
    );

    session.on_status(|status| println!("-- {} ({})", status.status.as_str(), status.label));
    for event in ChatEvent::ALL {
        session.on(event.as_str(), move |payload| {
            match ChatPayload::decode(event, payload) {
                Ok(chat) => println!("{}", chat.render()),
                Err(e) => warn!(event = %event, error = %e, "Malformed chat payload"),
            }
        });
    }

    info!(room = %room, name = %author, "Joining room");
    match session.connect(&room).await {
        Ok(role) => info!(?role, "Joined room"),
        // Already reported on the status stream; typed lines queue until a retry.
        Err(e) => warn!(error = %e, code = e.error_code(), "Could not join room"),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match Input::parse(&line) {
            Input::Quit => break,
            Input::Empty => {}
            Input::Invalid(usage) => println!("-- {usage}"),
            input => {
                let Some(payload) = input.into_payload(&author) else {
                    continue;
                };
                let value = payload.to_value()?;
                session.emit(payload.event().as_str(), value)?;
            }
        }
    }

    session.close();
    info!("Goodbye");
    Ok(())
}
