use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid table name '{0}': only alphanumeric, underscore, and dot characters are allowed")]
    InvalidTableName(String),

    #[error("Column '{column}' missing or not {expected}")]
    Column {
        column: String,
        expected: &'static str,
    },
}
