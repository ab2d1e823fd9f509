//! The verb surface every caller goes through.

use std::sync::{Arc, PoisonError, RwLock};

use log::{Level, debug};
use reqwest::Method;
use serde_json::{Map, Value};

use super::client::ReqwestTransport;
use super::error::TransportError;
use super::event::{Listeners, ListenerId, LogEvent, NEW_REQUEST_MESSAGE};
use super::options::{Headers, RequestOptions, RequestOverrides};
use super::transport::{Reply, Transport};
use crate::config::DriverConfig;
use crate::error::StoreError;

/// Wraps a transport behind `get`/`post`/`put`/`del`.
///
/// Every verb funnels through [`HttpDriver::call_url`], which fills in the
/// default options, notifies log listeners, sends the request and hands any
/// failure to the injected error factory. The driver keeps no state between
/// calls apart from its base URL.
pub struct HttpDriver<E = StoreError> {
    base_url: RwLock<Option<String>>,
    transport: Arc<dyn Transport>,
    error_factory: Arc<dyn Fn(TransportError) -> E + Send + Sync>,
    listeners: Listeners,
}

impl<E> HttpDriver<E> {
    /// Creates a driver with no base URL.
    ///
    /// `error_factory` turns every transport failure into the caller's
    /// error type; it receives the original error untouched.
    pub fn new<T, F>(transport: T, error_factory: F) -> Self
    where
        T: Transport + 'static,
        F: Fn(TransportError) -> E + Send + Sync + 'static,
    {
        Self {
            base_url: RwLock::new(None),
            transport: Arc::new(transport),
            error_factory: Arc::new(error_factory),
            listeners: Listeners::default(),
        }
    }

    pub fn base_url(&self) -> Option<String> {
        self.base_url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the base URL. The value is not validated.
    pub fn set_base_url(&self, base_url: impl Into<String>) {
        *self.base_url.write().unwrap_or_else(PoisonError::into_inner) = Some(base_url.into());
    }

    pub fn clear_base_url(&self) {
        *self.base_url.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Registers a listener called with the options record of every request,
    /// right before it is sent.
    pub fn on_log<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&LogEvent<'_>) + Send + Sync + 'static,
    {
        self.listeners.subscribe(Arc::new(listener))
    }

    /// Removes a listener. Returns false if it was already gone.
    pub fn off_log(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Builds the options record for one call and sends it.
    ///
    /// `headers` defaults to none, `body` to null and `opts` to no
    /// overrides. Anything set in `opts` wins, including `method`, `url`
    /// and `body`.
    #[tracing::instrument(skip(self, headers, body, opts))]
    pub async fn call_url(
        &self,
        method: Method,
        url: &str,
        headers: Option<Headers>,
        body: Option<Value>,
        opts: Option<RequestOverrides>,
    ) -> Result<Reply, E> {
        let overrides = opts.unwrap_or_default();
        if overrides.reshapes_request() {
            debug!("Request options override the method, URL or body of {} {}", method, url);
        }

        let options = RequestOptions::defaults(
            self.base_url(),
            method,
            url,
            headers.unwrap_or_default(),
            body.unwrap_or(Value::Null),
        )
        .with_overrides(overrides);

        self.emit_request(&options);

        self.transport
            .send(options)
            .await
            .map_err(|err| (self.error_factory)(err))
    }

    fn emit_request(&self, options: &RequestOptions) {
        debug!("{}: {} {}", NEW_REQUEST_MESSAGE, options.method, options.url);
        self.listeners.emit(&LogEvent {
            level: Level::Debug,
            message: NEW_REQUEST_MESSAGE,
            payload: options,
        });
    }

    /// Performs a GET request.
    pub async fn get(
        &self,
        url: &str,
        headers: Option<Headers>,
        opts: Option<RequestOverrides>,
    ) -> Result<Reply, E> {
        self.call_url(Method::GET, url, headers, None, opts).await
    }

    /// Performs a POST request. `data` defaults to an empty object.
    pub async fn post(
        &self,
        url: &str,
        data: Option<Value>,
        headers: Option<Headers>,
        opts: Option<RequestOverrides>,
    ) -> Result<Reply, E> {
        let data = data.unwrap_or_else(|| Value::Object(Map::new()));
        self.call_url(Method::POST, url, headers, Some(data), opts)
            .await
    }

    /// Performs a PUT request. `data` defaults to an empty object.
    pub async fn put(
        &self,
        url: &str,
        data: Option<Value>,
        headers: Option<Headers>,
        opts: Option<RequestOverrides>,
    ) -> Result<Reply, E> {
        let data = data.unwrap_or_else(|| Value::Object(Map::new()));
        self.call_url(Method::PUT, url, headers, Some(data), opts).await
    }

    /// Performs a DELETE request.
    ///
    /// There is no body parameter; a body can still be sent through `opts`.
    pub async fn del(
        &self,
        url: &str,
        headers: Option<Headers>,
        opts: Option<RequestOverrides>,
    ) -> Result<Reply, E> {
        self.call_url(Method::DELETE, url, headers, None, opts).await
    }

    /// Same as [`HttpDriver::del`].
    pub async fn delete(
        &self,
        url: &str,
        headers: Option<Headers>,
        opts: Option<RequestOverrides>,
    ) -> Result<Reply, E> {
        self.del(url, headers, opts).await
    }
}

impl HttpDriver<StoreError> {
    /// Creates a reqwest-backed driver wrapping failures in [`StoreError`].
    pub fn from_config(config: &DriverConfig) -> anyhow::Result<Self> {
        let client = config.build_client()?;
        let driver = HttpDriver::new(ReqwestTransport::new(client), StoreError::new);
        if let Some(base_url) = &config.base_url {
            driver.set_base_url(base_url.clone());
        }
        Ok(driver)
    }
}
