pub mod db;
pub mod errors;
pub mod factory;
pub mod models;
pub mod query;
pub mod storage;
pub mod store;

pub use crate::errors::{AppError, AppResult};
pub use crate::store::GtdStore;

use crate::db::Database;
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Opens `<app_data_dir>/gtd.sqlite`, starts logging at the configured level and loads the state.
/// Backups default to `<app_data_dir>/backups` when no directory is configured.
pub fn open_store(app_data_dir: &Path) -> AppResult<GtdStore> {
    let db = Database::new(&app_data_dir.join("gtd.sqlite"))?;
    let mut settings = db.get_settings()?;
    if settings.backup_dir.as_deref().map_or(true, |dir| dir.trim().is_empty()) {
        settings.backup_dir = Some(app_data_dir.join("backups").to_string_lossy().to_string());
    }
    if let Err(error) = init_tracing(app_data_dir, &settings.log_level) {
        eprintln!("failed to initialize logging: {}", error);
    }
    tracing::info!(path = %db.path().to_string_lossy(), "store opened");
    Ok(GtdStore::with_settings(Arc::new(db), &settings))
}

/// `RUST_LOG` wins over `default_level`. Only the first call in a process installs a subscriber.
pub fn init_tracing(app_data_dir: &Path, default_level: &str) -> Result<(), String> {
    let log_dir = app_data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "gtd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

/// The message a user-facing surface shows for a failed operation.
pub fn to_client_error(error: AppError) -> String {
    error.user_message().to_string()
}
