use thiserror::Error;

/// Failures raised before a request reaches the relay pipeline.
///
/// Generation and delivery failures never surface as errors: the pipeline
/// reports them to the user and records a `FailureKind` instead.
#[derive(Debug, Error)]
pub enum ParleyError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input rejected before any remote call was made.
    #[error("Input too long: {len} characters (max {max})")]
    Validation { len: usize, max: usize },
}

impl ParleyError {
    /// Short error code string used in log fields.
    pub fn code(&self) -> &'static str {
        match self {
            ParleyError::Config(_) => "CONFIG_ERROR",
            ParleyError::Validation { .. } => "VALIDATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ParleyError>;
