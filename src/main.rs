use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use tracing::instrument::WithSubscriber;
use tracing::{debug, error};

pub mod config;
use config::app_config::{AppConfig, Startup, load_config, setup_resolver, setup_tls_connector};
use config::cli::Cli;
pub mod error;
use error::ConfigError;
pub mod http_probe;
use http_probe::{Prober, report};
pub mod logging;
pub mod output;
pub mod pool;
use pool::Dispatcher;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let config = match load_config(Cli::parse()) {
        Ok(Startup::Run(config)) => config,
        Ok(Startup::Usage) => {
            eprintln!("{}", Cli::command().render_help());
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            logging::fatal(&err);
            return ExitCode::FAILURE;
        }
    };

    let logger = logging::dispatch(config.log_level);
    run(config, logger.clone()).with_subscriber(logger).await
}

async fn run(config: AppConfig, logger: tracing::Dispatch) -> ExitCode {
    debug!(
        action = "main",
        url = %config.url,
        total = config.total,
        concurrent = config.concurrent,
        "starting"
    );

    let prober = match build_prober(&config) {
        Ok(prober) => Arc::new(prober),
        Err(err) => {
            error!(action = "main", error = %report(&err), "invalid network configuration");
            return ExitCode::FAILURE;
        }
    };

    let dispatcher = Dispatcher::new(prober, config.concurrent, logger);
    let mut stdout = std::io::stdout();
    match dispatcher
        .run(&config.url, config.total, &config.output, &mut stdout)
        .await
    {
        Ok(received) => {
            debug!(action = "main", received, "done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(action = "main", error = %err, "failed to write results");
            ExitCode::FAILURE
        }
    }
}

fn build_prober(config: &AppConfig) -> Result<Prober, ConfigError> {
    let resolver = setup_resolver(&config.dns_hosts)?;
    let connector = setup_tls_connector()?;
    Ok(Prober::new(resolver, connector, config.timeout))
}
