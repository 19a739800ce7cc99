use crate::types::DataFamily;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Retrieval failed for {family} records: {reason}")]
    Retrieval { family: DataFamily, reason: String },

    #[error("Invalid assessment area: {0}")]
    InvalidAssessmentArea(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
