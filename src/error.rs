use thiserror::Error;

/// Failures the pipeline branches on
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The symbol list could not be obtained; aborts the run
    #[error("symbol discovery failed: {0}")]
    Discovery(String),

    #[error("request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("configuration error: {0}")]
    Config(String),
}
