use std::process::ExitCode;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use notes_store::{Config, Database, UserService};

#[derive(Debug, Serialize)]
struct HealthReport<'a> {
    database: &'a str,
    users: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Log setup
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    // Fetch env variables
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let db = match Database::connect(&config).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to create database client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let users = UserService::new(db.store());
    let result = users.get_user_count().await;

    let code = match result {
        Ok(count) => {
            let report = HealthReport {
                database: db.name(),
                users: count,
            };
            match serde_json::to_string(&report) {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!("Failed to encode health report: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Err(e) => {
            tracing::error!("Health check failed: {e}");
            ExitCode::FAILURE
        }
    };

    db.close().await;
    code
}
