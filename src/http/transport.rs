use async_trait::async_trait;
use serde_json::Value;

use super::error::TransportError;
use super::options::{Headers, RequestOptions};

/// Status, headers and decoded body of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct FullResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Value,
}

/// What a successful call resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The decoded response body, or the output of a transform.
    Body(Value),
    /// The whole response, when `resolve_with_full_response` is set.
    Full(FullResponse),
}

impl Reply {
    /// Returns the body, dropping status and headers of a full response.
    pub fn into_body(self) -> Value {
        match self {
            Reply::Body(body) => body,
            Reply::Full(response) => response.body,
        }
    }
}

/// Issues a single request described by an options record.
///
/// The driver treats implementations as opaque: it neither retries nor
/// inspects what comes back.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, options: RequestOptions) -> Result<Reply, TransportError>;
}
