//! Errors raised by a transport while issuing a request.

use serde_json::Value;

/// A failed outbound call, as reported by a [`Transport`](super::Transport).
///
/// The driver never inspects the variant; it hands the whole value to the
/// injected error factory.
#[derive(Debug)]
pub enum TransportError {
    /// The target URL could not be built from the base URL and path.
    InvalidUrl(String),
    /// A header name or value is not valid HTTP.
    InvalidHeader(String),
    /// The request could not be sent or its body could not be read.
    Request(reqwest::Error),
    /// The server answered with a non-2xx status while `simple` was on.
    Status { status: u16, body: Value },
}

impl TransportError {
    /// The HTTP status code, when the failure came from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            TransportError::InvalidHeader(name) => write!(f, "Invalid header: {}", name),
            TransportError::Request(err) => write!(f, "Request failed: {}", err),
            TransportError::Status { status, body } => {
                write!(f, "HTTP {} error: {}", status, body)
            }
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Request(err) => Some(err),
            _ => None,
        }
    }
}
