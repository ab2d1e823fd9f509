//! The domain error the driver wraps transport failures in by default.

use crate::http::TransportError;

/// A failed call against the HTTP store.
///
/// Keeps the transport error it was built from; it is reachable through
/// [`StoreError::cause`] and `source()`.
#[derive(Debug)]
pub struct StoreError {
    cause: TransportError,
}

impl StoreError {
    pub fn new(cause: TransportError) -> Self {
        Self { cause }
    }

    pub fn cause(&self) -> &TransportError {
        &self.cause
    }

    pub fn into_cause(self) -> TransportError {
        self.cause
    }

    /// The HTTP status code, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        self.cause.status()
    }
}

impl From<TransportError> for StoreError {
    fn from(cause: TransportError) -> Self {
        Self::new(cause)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP store error: {}", self.cause)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
