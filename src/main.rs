use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use bot::Bot;
use config::Config;
use dotenv::dotenv;
use extractor::YtDlp;
use grammers_client::{Client, Config as ClientConfig, InitParams};
use grammers_mtsender::{FixedReconnect, ReconnectionPolicy};
use grammers_session::Session;
use log::info;
use simplelog::TermLogger;
use workflow::{Limits, Workflow};

mod bot;
mod classifier;
mod command;
mod config;
mod error;
mod extractor;
mod media;
mod models;
mod workflow;

async fn health_check() -> &'static str {
    "OK"
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv().ok();

    TermLogger::init(
        log::LevelFilter::Info,
        simplelog::ConfigBuilder::new()
            .set_time_format_rfc3339()
            .build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .context("error initializing termlogger")?;

    let config = Config::from_env().context("invalid configuration")?;

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("cannot create {}", config.work_dir.display()))?;
    info!("Downloading into {}", config.work_dir.display());

    static RECONNECTION_POLICY: &dyn ReconnectionPolicy = &FixedReconnect {
        attempts: 3,
        delay: Duration::from_secs(5),
    };
    let client = Client::connect(ClientConfig {
        api_id: config.api_id,
        api_hash: config.api_hash.clone(),
        session: Session::load_file_or_create(&config.session_file)?,
        params: InitParams {
            reconnection_policy: RECONNECTION_POLICY,
            ..Default::default()
        },
    })
    .await?;

    // Authorize as a bot if needed
    if !client.is_authorized().await? {
        info!("Not authorized, signing in");
        client.bot_sign_in(&config.bot_token).await?;
    }
    client.session().save_to_file(&config.session_file)?;

    let workflow = Workflow::new(
        YtDlp::new(config.ytdlp_bin.clone()),
        config.work_dir.clone(),
        Limits::from_config(&config),
    );
    let bot = Bot::new(client, workflow).await?;

    let app = Router::new().route("/", get(health_check));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;

    info!("TikTok downloader bot is running");
    tokio::select! {
        _ = bot.run() => {},
        _ = axum::serve(listener, app) => {},
    }

    Ok(())
}
