use thiserror::Error;

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds produced by the core engine.
///
/// Per-URL failures (filtered, HTTP, oversize, filesystem, cancelled) are
/// captured on a `DownloadResult` and never surface here; the variants below
/// are used for pre-flight configuration errors and for the pieces of the
/// HTTP client/sink/scanner internals that need a typed error to propagate
/// up to the point where a `DownloadResult` is assembled.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid URL on line {line}: {reason}")]
    InvalidUrl { line: usize, reason: String },

    #[error("conflicting auth options: only one of bearer/basic/custom-authorization may be set")]
    ConflictingAuth,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {code}: {text}")]
    HttpStatus { code: u16, text: String },

    #[error("response exceeded the {limit} byte engine cap")]
    OverSize { limit: u64 },

    #[error("too many redirects (max {max})")]
    TooManyRedirects { max: usize },

    #[error("request timed out")]
    Timeout,

    #[error("download cancelled by user")]
    Cancelled,

    #[error("filtered: {0}")]
    Filtered(String),

    #[error("filesystem error: {0}")]
    FilesystemWrite(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Format error with a short, user-facing suggestion (CLI front-end style).
    pub fn with_suggestion(&self) -> String {
        match self {
            Error::InvalidUrl { line, reason } => {
                format!("invalid URL on line {line}: {reason} (expected an absolute http:// or https:// URL)")
            }
            Error::ConflictingAuth => {
                "conflicting auth options (suggestion: pass only one of --bearer, --basic, --custom-authorization)".to_string()
            }
            Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                format!("file not found: {e} (suggestion: check the path passed to --input/--config/--headers-file)")
            }
            Error::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                format!("permission denied: {e} (suggestion: check write permissions on the output directory)")
            }
            other => other.to_string(),
        }
    }

    /// True for errors that should not be retried per §4.5/§7 (client errors 4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::HttpStatus { code, .. } if (400..500).contains(code))
    }
}
