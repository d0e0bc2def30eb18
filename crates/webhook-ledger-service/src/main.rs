//! # Webhook-Ledger Service
//!
//! Binary entry point for the webhook-ledger HTTP service.
//!
//! This executable:
//! - Loads `.env` and settings from the environment
//! - Initializes structured logging
//! - Connects to the event database and ensures the schema exists
//! - Starts the HTTP server from webhook-ledger-api
//!
//! Exit codes: 1 bind failure, 2 server failure, 3 invalid settings,
//! 4 event database unavailable.

mod logging;

use tracing::{error, info};
use webhook_ledger_api::{start_server, AppState, ServiceError};
use webhook_ledger_core::{Database, Settings};

#[tokio::main]
async fn main() {
    // A missing .env file is normal outside development.
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info", false);
            error!(error = %e, "Failed to load settings; aborting");
            std::process::exit(3);
        }
    };

    logging::init(&settings.log_level, settings.log_json);
    info!(dotenv_loaded, "Starting webhook-ledger service");

    let database = match Database::connect(&settings.database()).await {
        Ok(database) => database,
        Err(e) => {
            error!(error = %e, "Event database unavailable; aborting");
            std::process::exit(4);
        }
    };

    if let Err(e) = database.ensure_schema().await {
        error!(error = %e, "Failed to create event schema; aborting");
        std::process::exit(4);
    }

    let state = AppState::from_settings(&settings, database);

    if let Err(e) = start_server(&settings, state).await {
        error!(error = %e, "HTTP server failed");
        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
        };
        std::process::exit(exit_code);
    }
}
