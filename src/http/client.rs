//! Transport backed by a reqwest `Client`.

use async_trait::async_trait;
use log::debug;
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue,
};
use reqwest::{Client, RequestBuilder, Url};
use serde_json::Value;

use super::error::TransportError;
use super::options::{Headers, RequestOptions};
use super::transport::{FullResponse, Reply, Transport};

/// Sends options records through a shared reqwest `Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a new transport wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    fn build_request(&self, options: &RequestOptions) -> Result<RequestBuilder, TransportError> {
        let url = resolve_url(options.base_url.as_deref(), &options.url)?;
        let mut headers = header_map(&options.headers)?;

        if options.json && !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        // The client decodes gzip on its own; ask for an uncompressed body instead.
        if !options.gzip && !headers.contains_key(ACCEPT_ENCODING) {
            headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        }

        let mut request = self
            .client
            .request(options.method.clone(), url)
            .headers(headers);

        request = match (&options.body, options.json) {
            (Value::Null, _) => request,
            (body, true) => request.json(body),
            (Value::String(text), false) => request.body(text.clone()),
            (body, false) => request.body(body.to_string()),
        };

        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        for key in options.extra.keys() {
            debug!("Ignoring unsupported transport option '{}'", key);
        }

        Ok(request)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, options), fields(method = %options.method, url = %options.url))]
    async fn send(&self, options: RequestOptions) -> Result<Reply, TransportError> {
        let request = self.build_request(&options)?;

        let response = request.send().await.map_err(TransportError::Request)?;
        let status = response.status();
        let headers = response_headers(response.headers());
        let text = response.text().await.map_err(TransportError::Request)?;
        let body = decode_body(&text, options.json);

        debug!("{} {} -> {}", options.method, options.url, status);

        if options.simple.unwrap_or(true) && !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response = FullResponse {
            status: status.as_u16(),
            headers,
            body,
        };

        if let Some(transform) = &options.transform {
            return Ok(Reply::Body(transform.apply(response)));
        }

        if options.resolve_with_full_response {
            Ok(Reply::Full(response))
        } else {
            Ok(Reply::Body(response.body))
        }
    }
}

/// Joins `url` onto `base_url` with exactly one `/` between them.
///
/// Without a base URL, `url` must be absolute. With one, `url` must be a
/// path: anything starting with `//` or containing `://` is rejected. An
/// empty path resolves to the base URL itself.
pub(crate) fn resolve_url(base_url: Option<&str>, url: &str) -> Result<Url, TransportError> {
    let target = match base_url {
        None => url.to_string(),
        Some(_) if url.starts_with("//") || url.contains("://") => {
            return Err(TransportError::InvalidUrl(format!(
                "'{}' must be a path when a base URL is set",
                url
            )));
        }
        Some(base) if url.is_empty() => base.to_string(),
        Some(base) => match (base.ends_with('/'), url.starts_with('/')) {
            (true, true) => format!("{}{}", base, &url[1..]),
            (false, false) => format!("{}/{}", base, url),
            _ => format!("{}{}", base, url),
        },
    };

    Url::parse(&target).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", target, e)))
}

fn header_map(headers: &Headers) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TransportError::InvalidHeader(name.clone()))?;
        let mut value = HeaderValue::from_str(value)
            .map_err(|_| TransportError::InvalidHeader(name.to_string()))?;
        if name == AUTHORIZATION {
            value.set_sensitive(true);
        }
        map.insert(name, value);
    }
    Ok(map)
}

fn response_headers(headers: &HeaderMap) -> Headers {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.to_string(), value.to_string()))
        })
        .collect()
}

/// JSON bodies that fail to parse come back as a string, empty ones as null.
fn decode_body(text: &str, json: bool) -> Value {
    if !json {
        return Value::String(text.to_string());
    }
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{RequestOverrides, Transform};
    use mockito::Matcher;
    use reqwest::Method;
    use serde_json::json;

    fn options(base_url: &str, method: Method, url: &str, body: Value) -> RequestOptions {
        RequestOptions::defaults(
            Some(base_url.to_string()),
            method,
            url,
            Headers::new(),
            body,
        )
    }

    #[test]
    fn test_resolve_url_without_base() {
        let url = resolve_url(None, "https://api.test/x").unwrap();
        assert_eq!(url.as_str(), "https://api.test/x");
    }

    #[test]
    fn test_resolve_url_relative_without_base_fails() {
        let result = resolve_url(None, "/items");
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_url_joins_with_single_slash() {
        for (base, path) in [
            ("https://host", "items"),
            ("https://host/", "items"),
            ("https://host", "/items"),
            ("https://host/", "/items"),
        ] {
            let url = resolve_url(Some(base), path).unwrap();
            assert_eq!(url.as_str(), "https://host/items", "{} + {}", base, path);
        }
    }

    #[test]
    fn test_resolve_url_keeps_base_path() {
        let url = resolve_url(Some("https://host/api/v1"), "/items/1").unwrap();
        assert_eq!(url.as_str(), "https://host/api/v1/items/1");
    }

    #[test]
    fn test_resolve_url_empty_path_is_base() {
        let url = resolve_url(Some("https://host/api"), "").unwrap();
        assert_eq!(url.as_str(), "https://host/api");
    }

    #[test]
    fn test_resolve_url_rejects_absolute_url_with_base() {
        let result = resolve_url(Some("https://host"), "https://other/x");
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_url_accepts_path_with_colon() {
        let url = resolve_url(Some("https://host/api"), "users:1").unwrap();
        assert_eq!(url.as_str(), "https://host/api/users:1");
    }

    #[test]
    fn test_resolve_url_rejects_scheme_relative_with_base() {
        let result = resolve_url(Some("https://host"), "//evil/x");
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_url_rejects_embedded_scheme_with_base() {
        let result = resolve_url(Some("https://host"), "redirect?to=https://other");
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(r#"{"a":1}"#, true), json!({"a": 1}));
        assert_eq!(decode_body("", true), Value::Null);
        assert_eq!(decode_body("plain", true), json!("plain"));
        assert_eq!(decode_body(r#"{"a":1}"#, false), json!(r#"{"a":1}"#));
    }

    #[test]
    fn test_header_map_rejects_invalid_name() {
        let mut headers = Headers::new();
        headers.insert("bad header".to_string(), "x".to_string());
        assert!(matches!(
            header_map(&headers),
            Err(TransportError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_header_map_marks_authorization_sensitive() {
        let mut headers = Headers::new();
        headers.insert("Authorization".to_string(), "Bearer t".to_string());
        let map = header_map(&headers).unwrap();
        assert!(map.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[tokio::test]
    async fn test_send_get_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/items")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"name": "a"}]"#)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(Client::new());
        let reply = transport
            .send(options(&server.url(), Method::GET, "/items", Value::Null))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply, Reply::Body(json!([{"name": "a"}])));
    }

    #[tokio::test]
    async fn test_send_post_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/items")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"name": "a"})))
            .with_status(201)
            .with_body(r#"{"id": 1}"#)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(Client::new());
        let reply = transport
            .send(options(
                &server.url(),
                Method::POST,
                "items",
                json!({"name": "a"}),
            ))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply.into_body(), json!({"id": 1}));
    }

    #[tokio::test]
    async fn test_send_text_body_when_json_disabled() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/note")
            .match_body("hello")
            .with_status(200)
            .with_body(r#"{"kept": "as text"}"#)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(Client::new());
        let opts = options(&server.url(), Method::PUT, "/note", json!("hello"))
            .with_overrides(RequestOverrides::new().json(false));
        let reply = transport.send(opts).await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply, Reply::Body(json!(r#"{"kept": "as text"}"#)));
    }

    #[tokio::test]
    async fn test_send_identity_encoding_when_gzip_disabled() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/plain")
            .match_header("accept-encoding", "identity")
            .with_status(200)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(Client::new());
        let opts = options(&server.url(), Method::GET, "/plain", Value::Null)
            .with_overrides(RequestOverrides::new().gzip(false));
        let reply = transport.send(opts).await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply, Reply::Body(Value::Null));
    }

    #[tokio::test]
    async fn test_send_caller_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/items/1")
            .match_header("authorization", "Bearer t")
            .with_status(204)
            .create_async()
            .await;

        let mut opts = options(&server.url(), Method::DELETE, "/items/1", Value::Null);
        opts.headers
            .insert("Authorization".to_string(), "Bearer t".to_string());

        let transport = ReqwestTransport::new(Client::new());
        transport.send(opts).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_rejects_non_2xx_by_default() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body(r#"{"message": "not here"}"#)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(Client::new());
        let result = transport
            .send(options(&server.url(), Method::GET, "/missing", Value::Null))
            .await;

        mock.assert_async().await;
        match result {
            Err(TransportError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, json!({"message": "not here"}));
            }
            other => panic!("Expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_resolves_non_2xx_when_not_simple() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_header("x-reason", "gone")
            .create_async()
            .await;

        let transport = ReqwestTransport::new(Client::new());
        let opts = options(&server.url(), Method::GET, "/missing", Value::Null).with_overrides(
            RequestOverrides::new()
                .simple(false)
                .resolve_with_full_response(true),
        );
        let reply = transport.send(opts).await.unwrap();

        mock.assert_async().await;
        match reply {
            Reply::Full(response) => {
                assert_eq!(response.status, 404);
                assert_eq!(response.headers.get("x-reason").unwrap(), "gone");
                assert_eq!(response.body, Value::Null);
            }
            other => panic!("Expected full response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_applies_transform() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/count")
            .with_status(200)
            .with_body(r#"{"count": 3}"#)
            .create_async()
            .await;

        let transform = Transform::new(|response| json!({
            "status": response.status,
            "count": response.body["count"],
        }));
        let transport = ReqwestTransport::new(Client::new());
        let opts = options(&server.url(), Method::GET, "/count", Value::Null)
            .with_overrides(RequestOverrides::new().transform(transform));
        let reply = transport.send(opts).await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply, Reply::Body(json!({"status": 200, "count": 3})));
    }

    #[tokio::test]
    async fn test_send_invalid_url_fails_before_request() {
        let transport = ReqwestTransport::new(Client::new());
        let result = transport
            .send(RequestOptions::defaults(
                None,
                Method::GET,
                "/relative",
                Headers::new(),
                Value::Null,
            ))
            .await;
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_send_connection_failure_is_request_error() {
        let transport = ReqwestTransport::new(Client::new());
        let result = transport
            .send(RequestOptions::defaults(
                None,
                Method::GET,
                "http://127.0.0.1:1/",
                Headers::new(),
                Value::Null,
            ))
            .await;
        assert!(matches!(result, Err(TransportError::Request(_))));
    }
}
