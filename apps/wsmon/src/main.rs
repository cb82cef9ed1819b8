use std::process::ExitCode;

use clap::Parser;
use logger::LevelFilter;
use tracing::{error, info, warn};
use wsmon::cli::Cli;
use wsmon::config::Config;
use wsmon::error::AppError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init_with_level(if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO });

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "wsmon exited with an error");
            eprintln!("wsmon: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = Config::from_config(cli.conf_file.as_deref())?;
    if let Some(path) = cli.results_file {
        config = config.with_results_file(path);
    }
    let settings = config.resolve()?;

    if cli.check_config {
        println!("{config}");
        return Ok(());
    }

    wsmon::run(settings, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    info!("received ctrl-c, shutting down");
}
