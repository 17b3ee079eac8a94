pub mod models;
pub mod signing;
pub mod transport;

use std::{collections::HashMap, fmt, sync::Arc};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::Config,
    error::{Error, Result},
    request_log::{self, LogSink},
};

use self::{
    models::GetQuotasRequest,
    transport::{HttpRequest, HttpTransport, Transport},
};

pub const QUOTA_PATH: &str = "/iot-open/sign/device/quota";
pub const QUOTA_ALL_PATH: &str = "/iot-open/sign/device/quota/all";

/// Signed client for the EcoFlow Open API device quota endpoints.
///
/// Cheap to clone; clones share the transport and log sink.
#[derive(Clone)]
pub struct EcoflowClient {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    log: Arc<dyn LogSink>,
    base_url: String,
    sn: String,
    access_key: String,
    secret_key: String,
}

impl fmt::Debug for EcoflowClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcoflowClient")
            .field("base_url", &self.inner.base_url)
            .field("sn", &self.inner.sn)
            .field("access_key", &self.inner.access_key)
            .finish_non_exhaustive()
    }
}

impl EcoflowClient {
    pub fn new(config: &Config) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self::with_parts(config, transport, request_log::from_config(config))
    }

    pub fn with_parts(
        config: &Config,
        transport: Arc<dyn Transport>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                log,
                base_url: config.base_url.clone(),
                sn: config.sn.clone(),
                access_key: config.access_key.clone(),
                secret_key: config.secret_key.clone(),
            }),
        }
    }

    /// Serial number of the device this client addresses.
    pub fn sn(&self) -> &str {
        &self.inner.sn
    }

    /// Change device settings.
    pub async fn set_device_quota<P>(&self, payload: &P) -> Result<Value>
    where
        P: Serialize + ?Sized,
    {
        let result = self
            .request(Method::PUT, QUOTA_PATH, &[], Some(payload))
            .await;
        self.logged("set_device_quota", result).await
    }

    /// Fetch every quota of the configured device.
    pub async fn get_all_device_quotas(&self) -> Result<Value> {
        let sn = self.inner.sn.as_str();
        let result = self
            .request::<Value>(Method::GET, QUOTA_ALL_PATH, &[("sn", sn)], None)
            .await;
        self.logged("get_all_device_quotas", result).await
    }

    /// Fetch the quotas named in `payload`.
    pub async fn get_device_quotas<P>(&self, payload: &P) -> Result<Value>
    where
        P: Serialize + ?Sized,
    {
        let result = self
            .request(Method::POST, QUOTA_PATH, &[], Some(payload))
            .await;
        self.logged("get_device_quotas", result).await
    }

    /// Fetch selected quotas of the configured device by name.
    pub async fn query_quotas<I, S>(&self, quotas: I) -> Result<Value>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let body = GetQuotasRequest::new(self.inner.sn.clone(), quotas);
        self.get_device_quotas(&body).await
    }

    async fn request<P>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        payload: Option<&P>,
    ) -> Result<Value>
    where
        P: Serialize + ?Sized,
    {
        let url = self.full_url(path, query)?;
        let body = payload
            .map(|p| serde_json::to_value(p).map_err(|e| Error::Flatten(e.to_string())))
            .transpose()?;
        self.send(method, url, body).await
    }

    /// Sign `payload`, send it, and parse the `200 OK` response body.
    ///
    /// A missing payload is signed as an empty object and no body is sent.
    async fn send(&self, method: Method, url: Url, payload: Option<Value>) -> Result<Value> {
        let empty = Value::Object(Map::new());
        let to_sign = payload.as_ref().unwrap_or(&empty);

        let nonce = signing::generate_nonce();
        let timestamp = signing::generate_timestamp();
        let ctx = signing::SigningContext {
            payload: to_sign,
            nonce: &nonce,
            timestamp: &timestamp,
        };
        let headers = signing::build_signed_headers_inner(
            &self.inner.access_key,
            &self.inner.secret_key,
            &ctx,
        )?;
        self.inner
            .log
            .append(&format!(
                "Signed {method} {url} with nonce = {nonce}, timestamp = {timestamp}"
            ))
            .await;
        debug!(method = %method, url = %url, nonce = %nonce, timestamp = %timestamp, "Signed EcoFlow request");

        let response = self
            .inner
            .transport
            .send(HttpRequest {
                method: method.clone(),
                url: url.clone(),
                headers: to_header_map(headers)?,
                body: payload,
            })
            .await?;

        if response.status != 200 {
            return Err(Error::Status {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        let json: Value = serde_json::from_slice(&response.body).map_err(Error::Decode)?;
        info!(method = %method, url = %url, status = response.status, "EcoFlow request succeeded");
        self.inner
            .log
            .append(&format!("Request to EcoFlow successful - {json}"))
            .await;

        Ok(json)
    }

    fn full_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}{}", self.inner.base_url.trim_end_matches('/'), path);
        let mut url = Url::parse(&raw).map_err(|source| Error::Url { url: raw, source })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Report a failed operation on both log channels.
    async fn logged<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!(operation, error = %e, "EcoFlow request failed");
            self.inner
                .log
                .append(&format!("ERROR - {operation} failed: {e}"))
                .await;
        }
        result
    }
}

/// Convert our string `HashMap` into a `reqwest::header::HeaderMap`.
fn to_header_map(map: HashMap<String, String>) -> Result<HeaderMap> {
    let mut header_map = HeaderMap::new();
    for (k, v) in map {
        let name = HeaderName::from_bytes(k.as_bytes())
            .map_err(|_| Error::Header { name: k.clone() })?;
        let value = HeaderValue::from_str(&v).map_err(|_| Error::Header { name: k.clone() })?;
        header_map.insert(name, value);
    }
    Ok(header_map)
}
