//! Client for the EcoFlow Open API device quota endpoints.
//!
//! Requests are signed with the EcoFlow HMAC-SHA256 scheme: the payload is
//! flattened into sorted `key=value` pairs, the access key, nonce and
//! timestamp are appended, and the result is keyed with the secret key.
//!
//! ```no_run
//! # async fn demo() -> ecoflow_client::Result<()> {
//! use ecoflow_client::{Config, EcoflowClient};
//!
//! let config = Config::new("R351ZEB4HF5A0000", "access-key", "secret-key");
//! let client = EcoflowClient::new(&config);
//! let quotas = client.get_all_device_quotas().await?;
//! println!("{quotas}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod ecoflow;
pub mod error;
pub mod request_log;

pub use config::Config;
pub use ecoflow::{
    models::{ApiResponse, GetQuotasRequest, QuotaMap, QuotaResponse, SetQuotaRequest},
    transport::{HttpRequest, HttpResponse, HttpTransport, Transport},
    EcoflowClient,
};
pub use error::{Error, Result};
pub use request_log::{FileLog, LogSink, NoopLog};
