//! slircbridge - relays an IRC channel to an HTTP event API and back.

use std::sync::Arc;

use slirc_bridge::bridge::{ClaimBoard, CommandIntake, Dispatcher, HttpEventSink};
use slirc_bridge::config::{self, Config};
use slirc_bridge::network::{Connection, ConnectionOptions};
use slirc_bridge::{http, metrics};
use slirc_proto::ConnectionState;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if std::env::var("SLIRC_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(path = %config_path, error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        server = %config.irc.address(),
        nick = %config.irc.nick,
        channel = %config.irc.channel,
        "Starting slircbridge"
    );

    metrics::init();

    let sink = HttpEventSink::new(config.bridge.event_url.clone(), config.timeouts.delivery())?;
    info!(url = %sink.url(), "Delivering events");

    let conn = Arc::new(
        Connection::open(
            &config.irc.address(),
            config.irc.registration(),
            ConnectionOptions::from(&config),
        )
        .await
        .map_err(|e| {
            error!(error = %e, code = e.error_code(), "Failed to connect");
            e
        })?,
    );

    // Command intake
    let listener = tokio::net::TcpListener::bind(config.bridge.listen_addr())
        .await
        .map_err(|e| {
            error!(addr = %config.bridge.listen_addr(), error = %e, "Failed to bind intake listener");
            e
        })?;
    let http_shutdown = CancellationToken::new();
    let server = tokio::spawn(http::serve(
        listener,
        http::router(CommandIntake::new(conn.handle())),
        http_shutdown.clone(),
    ));

    let mut dispatcher = Dispatcher::new(
        config.irc.nick.clone(),
        Arc::new(sink),
        config.bridge.max_in_flight,
    );
    if config.extensions.claims {
        info!("Claims extension enabled");
        dispatcher = dispatcher.with_claims(ClaimBoard::spawn());
    }

    let mut state = conn.subscribe_state();
    tokio::select! {
        _ = dispatcher.run(&conn) => {}
        // With the write side gone PINGs go unanswered; stop instead of waiting
        // for the server to time us out.
        _ = state.wait_for(|s| matches!(s, ConnectionState::Failed(_))) => {
            dispatcher.drain().await;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted; shutting down");
            conn.close().await;
            dispatcher.drain().await;
            http_shutdown.cancel();
            let _ = server.await;
            return Ok(());
        }
    }

    // The link is gone; no reconnect, leave restarts to the supervisor.
    conn.close().await;
    http_shutdown.cancel();
    match server.await {
        Ok(Err(e)) => warn!(error = %e, "Intake server error"),
        Err(e) => warn!(error = %e, "Intake server task failed"),
        Ok(Ok(())) => {}
    }

    let state = conn.state();
    error!(state = ?state, "Connection to server lost");
    anyhow::bail!("connection to {} lost: {:?}", conn.addr(), state)
}
