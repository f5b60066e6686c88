// src/main.rs
use clap::{CommandFactory, Parser};
use neis_lookup::cli::Args;
use neis_lookup::commands::{
    handle_config_update_command, handle_list_config_command, handle_lookup_command,
};
use neis_lookup::logging::setup_logging;
use neis_lookup::{AppError, Config, Lookup};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    let config = Config::load().await;
    let (log_file_path, _guard) = setup_logging(&args, config.as_ref().ok()).await?;
    tracing::info!("Logs are being written to: {log_file_path}");

    if args.list_config {
        return handle_list_config_command().await;
    }

    if args.is_config_update() {
        return handle_config_update_command(&args).await;
    }

    let config = config?;

    let Some(command) = &args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    let lookup = Lookup::from_config(&config)?;
    let sweeper = lookup
        .cache()
        .spawn_sweeper(Duration::from_secs(config.cache_sweep_interval_seconds));

    let result = handle_lookup_command(&lookup, command).await;
    sweeper.abort();
    result
}
