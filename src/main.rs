//! Voice Recorder CLI entry point

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use voice_recorder::cli::{
    app::{load_merged_config, run_session, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    ctl_cmd::handle_ctl_command,
    logging::init_logging,
    presenter::Presenter,
    SessionOptions,
};
use voice_recorder::domain::config::{AppConfig, ConstraintsConfig};
use voice_recorder::domain::recording::{AudioFormat, Duration};
use voice_recorder::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let presenter = Presenter::new();

    // Handle subcommands
    match cli.command {
        Some(Commands::Config { action }) => {
            let store = XdgConfigStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            return ExitCode::SUCCESS;
        }
        Some(Commands::Ctl { action }) => {
            if let Err(e) = handle_ctl_command(action, &presenter).await {
                presenter.error(&e);
                return ExitCode::from(EXIT_ERROR);
            }
            return ExitCode::SUCCESS;
        }
        Some(Commands::Session) | None => {}
    }

    // Build CLI config from args
    let cli_config = AppConfig {
        format: cli.format.map(|f| AudioFormat::from(f).to_string()),
        chunk_interval: cli.chunk_interval.clone(),
        output_dir: cli.output_dir.clone(),
        input_device: cli.device.clone(),
        monitor: if cli.monitor { Some(true) } else { None },
        constraints: cli.channels.map(|n| ConstraintsConfig {
            channel_count: Some(n),
            ..Default::default()
        }),
    };

    // Merge config
    let config = load_merged_config(cli_config).await;

    let format = match config.format.as_ref() {
        Some(s) => match s.parse::<AudioFormat>() {
            Ok(f) => f,
            Err(e) => {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_USAGE_ERROR);
            }
        },
        None => AudioFormat::default(),
    };

    let chunk_interval = match config.chunk_interval.as_ref() {
        Some(s) => match s.parse::<Duration>() {
            Ok(d) => d,
            Err(e) => {
                presenter.error(&format!("Invalid chunk-interval: {}", e));
                return ExitCode::from(EXIT_USAGE_ERROR);
            }
        },
        None => Duration::default_chunk_interval(),
    };

    let constraints = config.constraints_or_default();
    if let Err(e) = constraints.validate() {
        presenter.error(&e.to_string());
        return ExitCode::from(EXIT_USAGE_ERROR);
    }

    let options = SessionOptions {
        format,
        chunk_interval,
        output_dir: config.output_dir().unwrap_or_else(|| PathBuf::from(".")),
        input_device: config.input_device().map(str::to_string),
        monitor: config.monitor_or_default(),
        constraints,
    };

    run_session(options).await
}
