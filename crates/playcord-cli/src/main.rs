mod cli;
mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use playcord_core::vlcrc::{configure_vlc, default_vlcrc_path, read_vlcrc};
use playcord_core::{AppConfig, CoreError};
use playcord_detect::VlcClient;
use playcord_runtime::{Runtime, RuntimeError};

use crate::cli::{Cli, Command, PlayerArgs, SetupArgs};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("could not serialize output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not locate VLC's config file")]
    NoVlcrc,
    #[error("failed to wait for shutdown signal: {0}")]
    Signal(std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = logging::init_logging(&AppConfig::log_dir());

    let config_path = cli.config.unwrap_or_else(AppConfig::config_path);
    let result = match cli.command.unwrap_or(Command::Run(PlayerArgs::default())) {
        Command::Run(args) => run(&config_path, &args).await,
        Command::Check(args) => check(&config_path, &args).await,
        Command::SetupVlc(args) => setup_vlc(&config_path, &args),
        Command::Classify { titles } => classify(&titles),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Config file, then vlcrc, then command-line overrides.
fn load_config(path: &Path, args: &PlayerArgs) -> Result<AppConfig, CliError> {
    let mut config = AppConfig::load_from(path)?;
    tracing::debug!(path = %path.display(), "Loaded config");

    if config.player.read_vlcrc {
        if let Some(vlcrc) = default_vlcrc_path() {
            match read_vlcrc(&vlcrc) {
                Ok(Some(settings)) => config.apply_vlcrc(&settings),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Could not read VLC config"),
            }
        }
    }

    if let Some(port) = args.port {
        config.player.http_port = port;
    }
    if let Some(password) = &args.password {
        config.player.http_password = password.clone();
    }
    Ok(config)
}

async fn run(config_path: &Path, args: &PlayerArgs) -> Result<ExitCode, CliError> {
    let config = load_config(config_path, args)?;
    let runtime = Runtime::new(config)?.with_config_path(config_path);

    let diagnosis = runtime.check_player().await;
    if diagnosis.reachable {
        tracing::info!("{}", diagnosis.message);
    } else {
        tracing::warn!("{}", diagnosis.message);
    }

    runtime.start().await;
    tracing::info!("Press Ctrl-C to exit");

    let signal = tokio::signal::ctrl_c().await;
    tracing::info!("Shutting down");
    runtime.shutdown().await;

    signal.map_err(CliError::Signal)?;
    Ok(ExitCode::SUCCESS)
}

async fn check(config_path: &Path, args: &PlayerArgs) -> Result<ExitCode, CliError> {
    let config = load_config(config_path, args)?;
    let client = VlcClient::new(config.player.endpoint());
    let diagnosis = client.check().await;

    println!("{}", diagnosis.message);
    Ok(if diagnosis.reachable {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn setup_vlc(config_path: &Path, args: &SetupArgs) -> Result<ExitCode, CliError> {
    let vlcrc: PathBuf = default_vlcrc_path().ok_or(CliError::NoVlcrc)?;
    let mut config = AppConfig::load_from(config_path)?;
    let port = args.port.unwrap_or(config.player.http_port);

    let setup = configure_vlc(&vlcrc, port, !args.no_http, args.password.clone())?;

    config.player.http_port = setup.port;
    config.player.http_enabled = setup.http_enabled;
    if let Some(password) = &setup.password {
        config.player.http_password = password.clone();
    }
    config.save_to(config_path)?;

    println!("Updated {}", setup.path.display());
    println!("  http-port: {}", setup.port);
    if let Some(password) = &setup.password {
        println!("  http-password: {password}");
    }
    println!(
        "  HTTP interface: {}",
        if setup.http_enabled { "enabled" } else { "disabled" }
    );
    println!("Restart VLC for the changes to take effect.");
    Ok(ExitCode::SUCCESS)
}

fn classify(titles: &[String]) -> Result<ExitCode, CliError> {
    for title in titles {
        let entry = serde_json::json!({
            "title": title,
            "classification": playcord_parse::classify(title),
        });
        println!("{}", serde_json::to_string_pretty(&entry)?);
    }
    Ok(ExitCode::SUCCESS)
}
