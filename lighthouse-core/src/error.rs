use thiserror::Error;

#[derive(Error, Debug)]
pub enum LighthouseError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Backend requires authentication but no credentials were sent")]
    AuthRequired,

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl LighthouseError {
    /// True for errors that a later attempt may not hit again.
    pub fn is_transient(&self) -> bool {
        match self {
            LighthouseError::Http(_) => true,
            LighthouseError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
