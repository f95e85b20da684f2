mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use mm_client::{Homeserver, MatrixClient, build_http_client, login, normalize_homeserver_url};
use mm_store::{AccountLayout, Materializer, StdoutSink};
use mm_sync::{EngineConfig, Session, SyncEngine};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries artifact paths only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mm=info,mm_sync=info,mm_store=info,mm_client=info".into()
            }),
        )
        .init();

    let config = Config::parse();

    let homeserver = normalize_homeserver_url(&config.server)?;
    let root = config.storage_root()?;
    let http = build_http_client(config.certificate.as_deref(), config.request_timeout())?;

    let creds = match login(&http, &homeserver, &config.username, &config.password).await {
        Ok(creds) => creds,
        Err(e) => {
            error!("Login to {} failed: {}", homeserver, e);
            std::process::exit(1);
        }
    };

    let server_name = creds
        .home_server
        .clone()
        .or_else(|| homeserver.host_str().map(str::to_string))
        .context("homeserver URL has no host")?;
    let layout = AccountLayout::new(&root, &server_name, &creds.user_id)?;
    layout.ensure().await?;

    let session = Arc::new(Session::new(&creds));
    let client = Arc::new(MatrixClient::new(http, homeserver.clone(), creds.access_token.clone()));
    let materializer = Materializer::new(homeserver, Arc::new(StdoutSink));
    let engine_config = EngineConfig {
        long_poll: config.long_poll(),
        retry_delay: config.retry_delay(),
    };

    let engine = SyncEngine::new(client.clone(), session, layout, materializer, engine_config);
    engine.resume().await?;

    info!("Syncing as {}", creds.user_id);
    tokio::select! {
        _ = engine.run() => {}
        _ = shutdown_signal() => {}
    }

    if let Err(e) = client.logout().await {
        warn!("Logout failed: {}", e);
    } else {
        info!("Logged out");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("No SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
