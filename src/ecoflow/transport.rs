use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, Method};
use serde_json::Value;
use url::Url;

use crate::error::Result;

/// A fully signed request, ready to go on the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Sent as the JSON body when present.
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Sends one HTTP request and hands back the raw status and body.
///
/// Non-2xx statuses are not errors at this layer; only network failures are.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest { method, url, headers, body } = request;

        let mut builder = self.http.request(method, url).headers(headers);
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use httpmock::{Method as MockMethod, MockServer};
    use reqwest::header::HeaderValue;
    use serde_json::json;

    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn sends_method_headers_and_json_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(MockMethod::POST)
                    .path("/iot-open/sign/device/quota")
                    .header("sign", "abc")
                    .json_body(json!({"sn": "SN123"}));
                then.status(200).json_body(json!({"code": "0"}));
            })
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("sign", HeaderValue::from_static("abc"));
        let request = HttpRequest {
            method: Method::POST,
            url: Url::parse(&server.url("/iot-open/sign/device/quota")).unwrap(),
            headers,
            body: Some(json!({"sn": "SN123"})),
        };

        let response = HttpTransport::new().send(request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, json!({"code": "0"}));
    }

    #[tokio::test]
    async fn non_success_status_is_returned_not_raised() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(MockMethod::GET).path("/iot-open/sign/device/quota/all");
                then.status(401).body("unauthorized");
            })
            .await;

        let request = HttpRequest {
            method: Method::GET,
            url: Url::parse(&server.url("/iot-open/sign/device/quota/all?sn=SN123")).unwrap(),
            headers: HeaderMap::new(),
            body: None,
        };

        let response = HttpTransport::new().send(request).await.unwrap();
        assert_eq!(response.status, 401);
        assert_eq!(response.body, b"unauthorized");
    }

    #[tokio::test]
    async fn connection_failure_is_a_transport_error() {
        // Port 9 (discard) on localhost is not expected to accept connections.
        let request = HttpRequest {
            method: Method::GET,
            url: Url::parse("http://127.0.0.1:9/").unwrap(),
            headers: HeaderMap::new(),
            body: None,
        };

        let err = HttpTransport::new().send(request).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
