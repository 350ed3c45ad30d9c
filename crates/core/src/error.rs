use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    #[error("Invalid value in row {row}, column {column}: {reason}")]
    InvalidValue {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("Insufficient data: {usable_rows} usable rows, at least {required} required")]
    InsufficientData { usable_rows: usize, required: usize },

    #[error("Unknown campaign: {0}")]
    UnknownCampaign(i64),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CampaignError {
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    pub fn invalid_value(row: usize, column: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            row,
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}
