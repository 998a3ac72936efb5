//! Content Migrate Main Entry Point
//!
//! Exports a content store into a snapshot, imports a snapshot into a content store,
//! or both, depending on `MIGRATION_MODE`.

use content_migrate::{Dependencies, MigrationError};
use dotenv::dotenv;
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("content_migrate=info,content_migrate_repository=info")
    });

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "content-migrate",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "content-migrate",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), MigrationError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    info!("Starting content migration");

    let deps = match Dependencies::new() {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    // Item failures do not fail the run; they are reported here.
    match deps.orchestrator.run().await {
        Ok(report) => {
            report.log_summary();
            let failures = report.failure_count();
            if failures > 0 {
                warn!(failures, "Content migration completed with failures");
            } else {
                info!("Content migration completed successfully");
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Content migration failed");
            Err(e)
        }
    }
}
