//! A thin HTTP driver for dependency-injection containers.
//!
//! [`HttpDriver`] exposes `get`, `post`, `put` and `del`/`delete` over a
//! pluggable [`Transport`](http::Transport). Every call builds a fresh
//! [`RequestOptions`](http::RequestOptions) record from defaults and caller
//! overrides, notifies log listeners, and wraps any failure with an injected
//! error factory ([`StoreError`] unless told otherwise).

pub mod config;
pub mod error;
pub mod http;
pub mod plugin;

pub use config::DriverConfig;
pub use error::StoreError;
pub use http::{HttpDriver, Reply, RequestOverrides, TransportError};
