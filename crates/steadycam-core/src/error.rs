use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StabilizerError {
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Not initialized")]
    NotInitialized,

    #[error("Feature detection found {found} points (need {required})")]
    FeatureDetection { found: usize, required: usize },

    #[error("Tracking kept {tracked} points (need {required})")]
    Tracking { tracked: usize, required: usize },

    #[error("Transform estimation failed: {0}")]
    TransformEstimation(String),

    #[error("Transform application failed: {0}")]
    TransformApplication(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, StabilizerError>;
