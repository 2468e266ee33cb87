use crate::infrastructure::error::InfraError;
use rusqlite::Connection;
use std::path::Path;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

pub fn initialize_database(path: &Path) -> Result<(), InfraError> {
    let connection = Connection::open(path)?;
    connection.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// True when the file exists but SQLite refuses it as a database.
pub fn is_corrupt_database(error: &InfraError) -> bool {
    matches!(
        error,
        InfraError::Sqlite(rusqlite::Error::SqliteFailure(failure, _))
            if failure.code == rusqlite::ErrorCode::NotADatabase
                || failure.code == rusqlite::ErrorCode::DatabaseCorrupt
    )
}
