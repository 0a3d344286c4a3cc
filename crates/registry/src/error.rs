use thiserror::Error;

/// Aggregated error kinds the request surface matches on (see §7 of the
/// engine's error handling design). Unlike a blanket `anyhow::Error`, callers
/// can distinguish `NotFound` from `DuplicateName` without downcasting.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("filter {0:?} already exists")]
    DuplicateName(String),

    #[error("filter {0:?} not found")]
    NotFound(String),

    #[error("illegal load format: {0}")]
    IllegalLoadFormat(String),

    #[error("dump failed: {0}")]
    DumpFailed(String),
}

impl From<classic::ClassicFilterError> for EngineError {
    fn from(e: classic::ClassicFilterError) -> Self {
        match e {
            classic::ClassicFilterError::InvalidOptions => {
                EngineError::InvalidOptions(e.to_string())
            }
            other => EngineError::IllegalLoadFormat(other.to_string()),
        }
    }
}

impl From<rotated::RotatedFilterError> for EngineError {
    fn from(e: rotated::RotatedFilterError) -> Self {
        match e {
            rotated::RotatedFilterError::InvalidOptions => {
                EngineError::InvalidOptions(e.to_string())
            }
            rotated::RotatedFilterError::IllegalLoadFormat(msg) => {
                EngineError::IllegalLoadFormat(msg)
            }
            rotated::RotatedFilterError::Persist(_) => EngineError::DumpFailed(e.to_string()),
            other => EngineError::IllegalLoadFormat(other.to_string()),
        }
    }
}

impl From<persist::PersistError> for EngineError {
    fn from(e: persist::PersistError) -> Self {
        EngineError::DumpFailed(e.to_string())
    }
}

impl From<format::FormatError> for EngineError {
    fn from(e: format::FormatError) -> Self {
        EngineError::IllegalLoadFormat(e.to_string())
    }
}
