use std::{fmt, path::PathBuf};

use anyhow::{Context, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.ecoflow.com";
pub const DEFAULT_LOG_FILE: &str = "log.txt";

#[derive(Clone)]
pub struct Config {
    pub base_url: String,
    /// Serial number of the device addressed by `quota/all`.
    pub sn: String,
    pub access_key: String,
    /// HMAC key only; never sent over the wire.
    pub secret_key: String,
    /// Append request traces to `log_file` when set.
    pub log_enabled: bool,
    pub log_file: PathBuf,
}

impl Config {
    pub fn new(
        sn: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            sn: sn.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            log_enabled: false,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: optional("ECOFLOW_BASE_URL", DEFAULT_BASE_URL),
            sn: required("ECOFLOW_SN")?,
            access_key: required("ECOFLOW_ACCESS_KEY")?,
            secret_key: required("ECOFLOW_SECRET_KEY")?,
            log_enabled: parse_flag(&optional("ECOFLOW_LOG", "0"))
                .context("ECOFLOW_LOG must be one of 1/0, true/false, yes/no, on/off")?,
            log_file: PathBuf::from(optional("ECOFLOW_LOG_FILE", DEFAULT_LOG_FILE)),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("sn", &self.sn)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("log_enabled", &self.log_enabled)
            .field("log_file", &self.log_file)
            .finish()
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow::anyhow!("unrecognised flag value: {other:?}")),
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_defaults() {
        let c = Config::new("SN123", "AK", "SK");
        assert_eq!(c.base_url, DEFAULT_BASE_URL);
        assert_eq!(c.log_file, PathBuf::from("log.txt"));
        assert!(!c.log_enabled);
    }

    #[test]
    fn builders_override_defaults() {
        let c = Config::new("SN123", "AK", "SK")
            .with_base_url("http://localhost:9000")
            .with_logging(true)
            .with_log_file("/tmp/ecoflow.log");
        assert_eq!(c.base_url, "http://localhost:9000");
        assert!(c.log_enabled);
        assert_eq!(c.log_file, PathBuf::from("/tmp/ecoflow.log"));
    }

    #[test]
    fn debug_redacts_secret_key() {
        let c = Config::new("SN123", "AK", "very-secret");
        let out = format!("{c:?}");
        assert!(!out.contains("very-secret"));
        assert!(out.contains("<redacted>"));
    }

    #[test]
    fn parse_flag_accepts_common_spellings() {
        assert!(parse_flag("1").unwrap());
        assert!(parse_flag("TRUE").unwrap());
        assert!(parse_flag(" on ").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(!parse_flag("").unwrap());
        assert!(!parse_flag("off").unwrap());
    }

    #[test]
    fn parse_flag_rejects_garbage() {
        let err = parse_flag("maybe").unwrap_err();
        assert!(err.to_string().contains("unrecognised flag value"));
    }
}
