use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the resolver, the stores and configuration loading.
#[derive(Debug, Error)]
pub enum Error {
    /// Input could not be classified as a playable link
    #[error("unsupported link: use a YouTube, Cloudinary or direct video link")]
    InvalidLink,

    /// A required form field was left empty
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Transport-level failure talking to the remote store
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote store answered with a non-success status
    #[error("store returned {status}: {message}")]
    Api { status: u16, message: String },

    /// A mutation was attempted without a signed-in session
    #[error("not signed in")]
    Unauthorized,

    /// No record with the given id
    #[error("video {0} not found")]
    NotFound(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode/decode value: {0}")]
    Codec(#[from] serde_json::Error),

    /// A platform capability (fullscreen, renderer) is unavailable
    #[error("{0} unavailable")]
    Capability(String),

    /// Configuration is incomplete for the selected backend
    #[error("configuration required: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error came from the backing store rather than from input.
    pub fn is_store_failure(&self) -> bool {
        !matches!(self, Error::InvalidLink | Error::MissingField(_) | Error::Capability(_) | Error::Config(_))
    }
}
