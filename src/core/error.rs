use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestampError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Path error: {0}")]
    Path(String),
    #[error("Key not found: {0}")]
    KeyNotFound(String),
    #[error("Malformed record: {0}")]
    MalformedRecord(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("Validation error: {0}")]
    Validation(String),
}
