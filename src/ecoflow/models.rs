use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Generic response envelope
//
// Every EcoFlow Open API response wraps its payload in the same outer object:
//
// Success:
//   { "code": "0", "message": "Success", "data": <T>, "eagleEyeTraceId": "...", "tid": "..." }
//
// Failure:
//   { "code": "8521", "message": "signature is wrong", "eagleEyeTraceId": "...", "tid": "..." }
//
// `data` is absent on most failures and on write calls that return nothing.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T = Value> {
    /// `"0"` on success, an error code otherwise.
    pub code: String,

    #[serde(default)]
    pub message: Option<String>,

    pub data: Option<T>,

    /// Server-side trace ID, useful for support queries.
    #[serde(default)]
    pub eagle_eye_trace_id: Option<String>,

    #[serde(default)]
    pub tid: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        self.code == "0"
    }

    /// Convert into `Result<Option<T>>`, mapping a non-zero `code` to [`Error::Api`].
    pub fn into_data(self) -> Result<Option<T>> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(Error::Api {
                code: self.code,
                message: self.message.unwrap_or_else(|| "(no message)".to_owned()),
            })
        }
    }
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Interpret a JSON value returned by [`EcoflowClient`](super::EcoflowClient).
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(Error::Decode)
    }
}

/// Quota name → current value, as returned by both quota read endpoints.
pub type QuotaMap = Map<String, Value>;

/// Full response type: `ApiResponse<QuotaMap>`.
pub type QuotaResponse = ApiResponse<QuotaMap>;

// ---------------------------------------------------------------------------
// Get selected quotas - POST /iot-open/sign/device/quota
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GetQuotasRequest {
    pub sn: String,
    pub params: QuotaSelection,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotaSelection {
    /// Quota names, e.g. `"pd.soc"` or `"inv.inputWatts"`.
    pub quotas: Vec<String>,
}

impl GetQuotasRequest {
    pub fn new<I, S>(sn: impl Into<String>, quotas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sn: sn.into(),
            params: QuotaSelection {
                quotas: quotas.into_iter().map(Into::into).collect(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Set quota - PUT /iot-open/sign/device/quota
// ---------------------------------------------------------------------------

/// A single device setting change.
///
/// `module_type` and `operate_type` select the command; `params` carries its
/// arguments, e.g. `{"enabled": 1}` for `operate_type = "acOutCfg"`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetQuotaRequest {
    pub sn: String,
    pub module_type: u32,
    pub operate_type: String,
    pub params: Map<String, Value>,
}
