use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid selection `{token}`: {reason}")]
    InvalidSelection { token: String, reason: &'static str },

    #[error("Search request failed with HTTP {status}: {message}")]
    SearchRequest { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit still in effect after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("Transport error after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("Could not decode search response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("Search query cannot be empty")]
    EmptyQuery,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_selection(token: &str, reason: &'static str) -> Self {
        Self::InvalidSelection {
            token: token.to_string(),
            reason,
        }
    }

    /// Whether the user can fix this by entering different input.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidSelection { .. })
    }
}
