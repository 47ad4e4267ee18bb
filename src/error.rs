use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("Missing {table} entry for pollutant '{parameter}'")]
    MissingStandard { table: String, parameter: String },

    #[error("Unknown pollutant: {0}")]
    UnknownPollutant(String),

    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
