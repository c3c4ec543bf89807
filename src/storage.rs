use crate::db::KeyValueStore;
use crate::errors::{AppError, AppResult};
use crate::factory::non_blank;
use crate::models::{AppState, Milestone, Project, Task, UiState};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const STORAGE_KEY: &str = "gtd-personal-v1";

const INVALID_FORMAT: &str = "Formato inválido de backup.";
const MISSING_COLLECTIONS: &str = "Backup inválido: faltam coleções obrigatórias.";

/// Reads the persisted state. Never fails: anything unreadable falls back to defaults.
pub fn load_state(store: &dyn KeyValueStore, key: &str) -> AppState {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return AppState::default(),
        Err(error) => {
            tracing::warn!(key, error = %error, "failed to read persisted state, using defaults");
            return AppState::default();
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => merge_over_defaults(map),
        Ok(_) => {
            tracing::warn!(key, "persisted state is not an object, using defaults");
            AppState::default()
        }
        Err(error) => {
            tracing::warn!(key, error = %error, "persisted state is not valid JSON, using defaults");
            AppState::default()
        }
    }
}

pub fn save_state(store: &dyn KeyValueStore, key: &str, state: &AppState) -> AppResult<()> {
    let raw = serde_json::to_string(state)?;
    store.set(key, &raw)?;
    tracing::debug!(
        key,
        tasks = state.tasks.len(),
        projects = state.projects.len(),
        milestones = state.milestones.len(),
        "state saved"
    );
    Ok(())
}

pub fn export_backup(state: &AppState) -> AppResult<String> {
    serde_json::to_string_pretty(state).map_err(AppError::from)
}

/// Parses backup text into a fresh state with the UI cursor reset.
pub fn import_backup(raw: &str) -> AppResult<AppState> {
    let parsed: Value = serde_json::from_str(raw)
        .map_err(|error| AppError::BackupParse(format!("JSON inválido: {}", error)))?;

    let mut map = match parsed {
        Value::Object(map) => map,
        Value::Array(_) => return Err(AppError::BackupShape(MISSING_COLLECTIONS.to_string())),
        _ => return Err(AppError::BackupShape(INVALID_FORMAT.to_string())),
    };

    let (Some(Value::Array(tasks)), Some(Value::Array(projects)), Some(Value::Array(milestones))) =
        (map.remove("tasks"), map.remove("projects"), map.remove("milestones"))
    else {
        return Err(AppError::BackupShape(MISSING_COLLECTIONS.to_string()));
    };

    let tasks: Vec<Task> = decode_collection("tasks", tasks)?;
    let projects: Vec<Project> = decode_collection("projects", projects)?;
    let milestones: Vec<Milestone> = decode_collection("milestones", milestones)?;

    Ok(AppState {
        tasks,
        projects,
        milestones: milestones.into_iter().map(normalize_milestone).collect(),
        ui: UiState::default(),
    })
}

pub fn reset_storage(store: &dyn KeyValueStore, key: &str) -> AppResult<()> {
    store.remove(key)?;
    tracing::info!(key, "persisted state removed");
    Ok(())
}

pub fn backup_file_name(date: NaiveDate) -> String {
    format!("gtd-backup-{}.json", date.format("%Y-%m-%d"))
}

pub fn write_backup_file(dir: &Path, state: &AppState, date: NaiveDate) -> AppResult<PathBuf> {
    fs::create_dir_all(dir).map_err(|error| AppError::Io(error.to_string()))?;
    let path = dir.join(backup_file_name(date));
    let text = export_backup(state)?;
    fs::write(&path, text).map_err(|error| AppError::Io(error.to_string()))?;
    Ok(path)
}

pub fn read_backup_file(path: &Path) -> AppResult<AppState> {
    let text = fs::read_to_string(path)
        .map_err(|error| AppError::Io(format!("{}: {}", path.to_string_lossy(), error)))?;
    import_backup(&text)
}

pub fn normalize_milestone(milestone: Milestone) -> Milestone {
    Milestone {
        planned_date: non_blank(milestone.planned_date),
        completed_date: non_blank(milestone.completed_date),
        ..milestone
    }
}

fn merge_over_defaults(mut map: Map<String, Value>) -> AppState {
    let mut state = AppState::default();
    if let Some(value) = map.remove("tasks") {
        state.tasks = decode_readable("tasks", value);
    }
    if let Some(value) = map.remove("projects") {
        state.projects = decode_readable("projects", value);
    }
    if let Some(value) = map.remove("milestones") {
        let milestones: Vec<Milestone> = decode_readable("milestones", value);
        state.milestones = milestones.into_iter().map(normalize_milestone).collect();
    }
    if let Some(value) = map.remove("ui") {
        state.ui = decode_or_default("ui", value);
    }
    state
}

fn decode_or_default<T: DeserializeOwned + Default>(field: &str, value: Value) -> T {
    serde_json::from_value(value).unwrap_or_else(|error| {
        tracing::warn!(field, error = %error, "discarding unreadable persisted field");
        T::default()
    })
}

/// Keeps every record that decodes; unreadable ones are dropped with a warning.
fn decode_readable<T: DeserializeOwned>(collection: &str, value: Value) -> Vec<T> {
    let Value::Array(items) = value else {
        tracing::warn!(collection, "persisted collection is not an array, using defaults");
        return Vec::new();
    };
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(collection, index, error = %error, "skipping unreadable persisted record");
                None
            }
        })
        .collect()
}

fn decode_collection<T: DeserializeOwned>(collection: &str, items: Vec<Value>) -> AppResult<Vec<T>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|error| {
                AppError::BackupShape(format!(
                    "Backup inválido: registro {} de {} ilegível ({}).",
                    index, collection, error
                ))
            })
        })
        .collect()
}
