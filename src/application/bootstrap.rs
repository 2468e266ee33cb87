use crate::infrastructure::config::{ensure_default_configs, load_configs};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::{initialize_database, is_corrupt_database};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct BootstrapResult {
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub database_path: PathBuf,
    /// Where an unreadable database was moved before a fresh one was created.
    pub quarantined_database: Option<PathBuf>,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let logs_dir = workspace_root.join("logs");
    let database_path = state_dir.join("planner.sqlite");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&state_dir)?;
    fs::create_dir_all(&logs_dir)?;

    ensure_default_configs(&config_dir)?;
    let _ = load_configs(&config_dir)?;

    let quarantined_database = match initialize_database(&database_path) {
        Ok(()) => None,
        Err(error) if is_corrupt_database(&error) => {
            let quarantine = database_path.with_extension(format!(
                "sqlite.corrupt-{}",
                Utc::now().format("%Y%m%d%H%M%S")
            ));
            tracing::warn!(
                path = %database_path.display(),
                moved_to = %quarantine.display(),
                %error,
                "database is unreadable, starting with an empty history"
            );
            fs::rename(&database_path, &quarantine)?;
            initialize_database(&database_path)?;
            Some(quarantine)
        }
        Err(error) => return Err(error),
    };

    Ok(BootstrapResult {
        config_dir,
        logs_dir,
        database_path,
        quarantined_database,
    })
}
