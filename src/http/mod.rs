//! HTTP driver: the verb surface, the options record and the transports behind it.

mod client;
mod driver;
mod error;
mod event;
mod options;
mod transport;

pub use client::ReqwestTransport;
pub use driver::HttpDriver;
pub use error::TransportError;
pub use event::{ListenerId, LogEvent, LogListener, NEW_REQUEST_MESSAGE};
pub use options::{Headers, RequestOptions, RequestOverrides, Transform};
pub use transport::{FullResponse, Reply, Transport};

#[cfg(test)]
pub use transport::MockTransport;
