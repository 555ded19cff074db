pub mod bot;
pub mod calendar;
pub mod cli;
pub mod convert;
pub mod grid;
pub mod health;
pub mod models;
pub mod settings;
pub mod timetable;
mod utils;

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use tokio_util::sync::CancellationToken;

use bot::TelegramClient;
use cli::{Cli, Command};
use convert::{convert_workbook, load_timetable};
use settings::Settings;

fn serve(settings: Settings) -> Result<()> {
    let token = settings.bot_token()?.to_string();
    let client = TelegramClient::new(&token)?;
    let settings = Arc::new(settings);

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async move {
        let cancel_token = CancellationToken::new();
        let listener = health::bind(settings.port).await?;

        let health = tokio::spawn(health::health_server(listener, cancel_token.clone()));
        let bot = tokio::spawn(bot::bot_loop(client, Arc::clone(&settings), cancel_token.clone()));

        info!("Bot started. Press Ctrl+C to stop.");
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {err}");
        }
        cancel_token.cancel();

        health.await.context("health check task failed to join")?;
        bot.await.context("bot task failed to join")?;
        Ok::<(), anyhow::Error>(())
    })
}

fn convert(settings: &Settings, input: &std::path::Path, output: Option<std::path::PathBuf>, json: bool) -> Result<()> {
    if json {
        let timetable = load_timetable(input, settings)?;
        let rendered = serde_json::to_string_pretty(&timetable)?;
        match output {
            Some(path) => fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?,
            None => println!("{rendered}"),
        }
        return Ok(());
    }

    let converted = convert_workbook(input, settings)?;
    let path = output.unwrap_or_else(|| converted.file_name().into());
    fs::write(&path, &converted.ics).with_context(|| format!("failed to write {}", path.display()))?;
    info!(
        "wrote {} lessons from {} weeks to {}",
        converted.lessons,
        converted.weeks,
        path.display()
    );
    Ok(())
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve => serve(settings),
        Command::Convert { input, output, json } => convert(&settings, &input, output, json),
    }
}
