use thiserror::Error;

/// Everything that can go wrong between a button press and the FlexPBX API.
///
/// The `Display` text is what ends up in toasts and inline banners, so API
/// messages are passed through verbatim.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// `success: false` reported by the server.
    #[error("{0}")]
    Api(String),

    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Client-side guard tripped; no request was sent.
    #[error("{0}")]
    Precondition(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ConsoleError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// True when the request never left the client.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }
}

pub type Result<T, E = ConsoleError> = std::result::Result<T, E>;
