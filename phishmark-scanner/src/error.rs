use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(usize),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::HttpStatus(status.as_u16())
        } else if err.is_connect() || err.is_request() {
            FetchError::ConnectionFailed(err.to_string())
        } else {
            FetchError::Other(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("DNS resolution failed: {0}")]
    Dns(String),

    #[error("WHOIS query failed: {0}")]
    Whois(String),

    #[error("Rank service error: {0}")]
    Rank(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;
