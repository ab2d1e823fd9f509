//! The per-call options record and the default-fill merge that builds it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::warn;
use reqwest::Method;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::transport::FullResponse;

/// Header name to header value.
pub type Headers = BTreeMap<String, String>;

/// Post-processes a response before the call resolves.
///
/// When set, the transport hands the full response to the closure and the
/// call resolves with whatever it returns.
#[derive(Clone)]
pub struct Transform(Arc<dyn Fn(FullResponse) -> Value + Send + Sync>);

impl Transform {
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(FullResponse) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(transform))
    }

    pub fn apply(&self, response: FullResponse) -> Value {
        (self.0)(response)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// Two transforms are equal when they share the same closure.
impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Everything a transport needs to issue one request.
///
/// Built fresh for every call and never reused. Serializes with the field
/// names `baseUrl`, `body`, `gzip`, `headers`, `json`, `method`,
/// `resolveWithFullResponse` and `url`; `simple` and `timeout` appear only
/// when set, and `extra` keys are flattened into the same object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub base_url: Option<String>,
    /// `Value::Null` means the request carries no payload.
    pub body: Value,
    pub gzip: bool,
    pub headers: Headers,
    pub json: bool,
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
    pub resolve_with_full_response: bool,
    pub url: String,
    /// Reject non-2xx responses. Transports treat `None` as `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simple: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_timeout"
    )]
    pub timeout: Option<Duration>,
    #[serde(skip)]
    pub transform: Option<Transform>,
    /// Caller-supplied keys with no dedicated field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestOptions {
    /// The record a call gets before any override is applied.
    pub fn defaults(
        base_url: Option<String>,
        method: Method,
        url: impl Into<String>,
        headers: Headers,
        body: Value,
    ) -> Self {
        Self {
            base_url,
            body,
            gzip: true,
            headers,
            json: true,
            method,
            resolve_with_full_response: false,
            url: url.into(),
            simple: None,
            timeout: None,
            transform: None,
            extra: Map::new(),
        }
    }

    /// Shallow default-fill: every field set in `overrides` replaces the
    /// default, everything else is kept.
    ///
    /// Nothing is protected. An override can replace `method`, `url` or
    /// `body` as easily as `gzip`, so a stray key in caller options changes
    /// the request itself. Extra keys are replaced whole, never merged.
    ///
    /// An extra key that names a field (`method`, `baseUrl`, `timeout`, ...)
    /// sets that field, so the serialized record always matches what the
    /// transport sends. A typed override of the same field wins over it.
    pub fn with_overrides(mut self, overrides: RequestOverrides) -> Self {
        let RequestOverrides {
            base_url,
            body,
            gzip,
            headers,
            json,
            method,
            resolve_with_full_response,
            url,
            simple,
            timeout,
            transform,
            extra,
        } = overrides;

        for (key, value) in extra {
            if let Some(value) = self.apply_field(&key, value) {
                self.extra.insert(key, value);
            }
        }

        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        if let Some(body) = body {
            self.body = body;
        }
        if let Some(gzip) = gzip {
            self.gzip = gzip;
        }
        if let Some(headers) = headers {
            self.headers = headers;
        }
        if let Some(json) = json {
            self.json = json;
        }
        if let Some(method) = method {
            self.method = method;
        }
        if let Some(full) = resolve_with_full_response {
            self.resolve_with_full_response = full;
        }
        if let Some(url) = url {
            self.url = url;
        }
        if simple.is_some() {
            self.simple = simple;
        }
        if timeout.is_some() {
            self.timeout = timeout;
        }
        if transform.is_some() {
            self.transform = transform;
        }
        self
    }

    /// Applies `value` to the field serialized as `key`.
    ///
    /// Returns the value back when `key` names no field. A value of the
    /// wrong type for its field is dropped.
    fn apply_field(&mut self, key: &str, value: Value) -> Option<Value> {
        let applied = match key {
            "baseUrl" => match value {
                Value::Null => {
                    self.base_url = None;
                    true
                }
                Value::String(base_url) => {
                    self.base_url = Some(base_url);
                    true
                }
                _ => false,
            },
            "body" => {
                self.body = value;
                true
            }
            "gzip" => value.as_bool().map(|gzip| self.gzip = gzip).is_some(),
            "json" => value.as_bool().map(|json| self.json = json).is_some(),
            "resolveWithFullResponse" => value
                .as_bool()
                .map(|full| self.resolve_with_full_response = full)
                .is_some(),
            "simple" => value
                .as_bool()
                .map(|simple| self.simple = Some(simple))
                .is_some(),
            "headers" => match serde_json::from_value::<Headers>(value) {
                Ok(headers) => {
                    self.headers = headers;
                    true
                }
                Err(_) => false,
            },
            "method" => value
                .as_str()
                .and_then(|method| Method::from_bytes(method.as_bytes()).ok())
                .map(|method| self.method = method)
                .is_some(),
            "url" => match value {
                Value::String(url) => {
                    self.url = url;
                    true
                }
                _ => false,
            },
            "timeout" => value
                .as_u64()
                .map(|millis| self.timeout = Some(Duration::from_millis(millis)))
                .is_some(),
            // A transform is a closure and has no serialized form.
            "transform" => false,
            _ => return Some(value),
        };

        if !applied {
            warn!("Dropping option '{}': value does not fit the field", key);
        }
        None
    }
}

fn serialize_method<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(method.as_str())
}

fn serialize_timeout<S: Serializer>(
    timeout: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match timeout {
        Some(timeout) => {
            serializer.serialize_u64(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
        }
        None => serializer.serialize_none(),
    }
}

/// Caller-supplied transport options for a single call.
///
/// Every field left as `None` falls back to the driver's default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOverrides {
    /// `Some(None)` sends the call without any base URL, even when the
    /// driver has one.
    pub base_url: Option<Option<String>>,
    pub body: Option<Value>,
    pub gzip: Option<bool>,
    pub headers: Option<Headers>,
    pub json: Option<bool>,
    pub method: Option<Method>,
    pub resolve_with_full_response: Option<bool>,
    pub url: Option<String>,
    pub simple: Option<bool>,
    pub timeout: Option<Duration>,
    pub transform: Option<Transform>,
    pub extra: Map<String, Value>,
}

impl RequestOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(Some(base_url.into()));
        self
    }

    /// Ignores the driver's base URL for this call.
    pub fn without_base_url(mut self) -> Self {
        self.base_url = Some(None);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn gzip(mut self, gzip: bool) -> Self {
        self.gzip = Some(gzip);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn json(mut self, json: bool) -> Self {
        self.json = Some(json);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn resolve_with_full_response(mut self, full: bool) -> Self {
        self.resolve_with_full_response = Some(full);
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn simple(mut self, simple: bool) -> Self {
        self.simple = Some(simple);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Sets an option by its serialized name. Names of existing fields
    /// (`method`, `baseUrl`, ...) set that field; any other key is carried
    /// in the record and the log payload, and transports ignore keys they
    /// do not understand.
    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// True when the overrides replace the method, URL or body of the call.
    pub fn reshapes_request(&self) -> bool {
        self.method.is_some()
            || self.url.is_some()
            || self.body.is_some()
            || ["method", "url", "body"]
                .iter()
                .any(|key| self.extra.contains_key(*key))
    }
}
