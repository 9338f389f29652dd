//! SQL Practice - a browser-based SQL practice server.

use std::sync::Arc;

use sql_practice::cli::Cli;
use sql_practice::error::Result;
use sql_practice::logging;
use sql_practice::practice::PracticeService;
use sql_practice::server;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = cli.resolve_config()?;

    let addr = config.server.socket_addr()?;
    let service = PracticeService::from_config(&config.practice)?;

    server::start_server(Arc::new(service), addr).await
}
