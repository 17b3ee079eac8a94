use std::collections::{BTreeMap, HashMap, HashSet};

use hmac::{Hmac, Mac};
use percent_encoding::percent_decode_str;
use rand::Rng as _;
use serde_json::Value;
use sha2::Sha256;
use url::form_urlencoded;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

pub const CONTENT_TYPE: &str = "application/json;charset=UTF-8";

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

/// One step down a payload tree: a mapping key or a sequence index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Extend a key path by one segment.
///
/// The first segment is used as-is; after that keys are joined with `.` and
/// indices are written as `[i]`.
pub fn combine(path: Option<&str>, segment: Segment<'_>) -> String {
    match (path, segment) {
        (None, Segment::Key(key)) => key.to_owned(),
        (None, Segment::Index(i)) => i.to_string(),
        (Some(path), Segment::Key(key)) => format!("{path}.{key}"),
        (Some(path), Segment::Index(i)) => format!("{path}[{i}]"),
    }
}

/// Flatten a payload into `(path, value)` pairs, depth-first.
///
/// `null` at the root is treated as an empty payload. Empty objects and arrays
/// contribute nothing. A bare scalar at the root has no key to sign under and
/// is rejected, as are two leaves that flatten to the same path.
pub fn flatten(payload: &Value) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    match payload {
        Value::Null => {}
        Value::Object(_) | Value::Array(_) => {
            let mut seen = HashSet::new();
            visit(payload, None, &mut seen, &mut out)?;
        }
        scalar => {
            return Err(Error::Flatten(format!(
                "top-level payload must be an object or array, got {scalar}"
            )))
        }
    }
    Ok(out)
}

fn visit(
    node: &Value,
    path: Option<&str>,
    seen: &mut HashSet<String>,
    out: &mut Vec<(String, String)>,
) -> Result<()> {
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = combine(path, Segment::Key(key));
                visit(child, Some(&child_path), seen, out)?;
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                let child_path = combine(path, Segment::Index(i));
                visit(child, Some(&child_path), seen, out)?;
            }
        }
        leaf => {
            if let Some(path) = path {
                if !seen.insert(path.to_owned()) {
                    return Err(Error::Flatten(format!("duplicated key {path:?}")));
                }
                out.push((path.to_owned(), render_leaf(leaf)));
            }
        }
    }
    Ok(())
}

/// Strings go in unquoted; numbers, booleans and null use their JSON spelling.
fn render_leaf(leaf: &Value) -> String {
    match leaf {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Order flattened pairs by key, byte-wise ascending. A repeated key keeps the
/// value seen last; `flatten` never produces one.
pub fn sort_params<I>(pairs: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    pairs
        .into_iter()
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// Canonical string and HMAC
// ---------------------------------------------------------------------------

/// Append the auth fields after the sorted payload pairs.
///
/// A payload key that collides with an auth field keeps its sorted position
/// and takes the auth value.
pub fn signature_input(
    mut sorted: Vec<(String, String)>,
    access_key: &str,
    nonce: &str,
    timestamp: &str,
) -> Vec<(String, String)> {
    for (key, value) in [
        ("accessKey", access_key),
        ("nonce", nonce),
        ("timestamp", timestamp),
    ] {
        match sorted.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.to_owned(),
            None => sorted.push((key.to_owned(), value.to_owned())),
        }
    }
    sorted
}

/// Form-urlencode the pairs, then percent-decode the result.
///
/// The net effect is a plain `k=v&k=v` join in which spaces become `+`.
pub fn canonical_string(pairs: &[(String, String)]) -> Result<String> {
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    percent_decode_str(&encoded)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| Error::Signing(format!("canonical string is not UTF-8: {e}")))
}

/// HMAC-SHA256 of `message` keyed by `secret`, lowercase hex.
pub fn sign(secret: &str, message: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Signing(format!("HMAC rejected secret key: {e}")))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

// ---------------------------------------------------------------------------
// Nonce / timestamp
// ---------------------------------------------------------------------------

/// Six-digit random decimal string.
pub fn generate_nonce() -> String {
    rand::rng().random_range(100_000..1_000_000u32).to_string()
}

/// Current Unix time in milliseconds.
pub fn generate_timestamp() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// Inputs to one signature; tests pass fixed nonce and timestamp values.
#[derive(Debug)]
pub(crate) struct SigningContext<'a> {
    pub payload: &'a Value,
    pub nonce: &'a str,
    /// 13-digit Unix timestamp in milliseconds
    pub timestamp: &'a str,
}

/// Build the signed request headers for the payload, nonce and timestamp in
/// `ctx`. The caller generates the nonce and timestamp so it can log them.
pub(crate) fn build_signed_headers_inner(
    access_key: &str,
    secret: &str,
    ctx: &SigningContext<'_>,
) -> Result<HashMap<String, String>> {
    let SigningContext { payload, nonce, timestamp } = ctx;

    let sorted = sort_params(flatten(payload)?);
    let input = signature_input(sorted, access_key, nonce, timestamp);
    let canonical = canonical_string(&input)?;
    let sign = sign(secret, &canonical)?;

    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_owned(), CONTENT_TYPE.to_owned());
    headers.insert("accessKey".to_owned(), access_key.to_owned());
    headers.insert("timestamp".to_owned(), timestamp.to_string());
    headers.insert("nonce".to_owned(), nonce.to_string());
    headers.insert("sign".to_owned(), sign);
    Ok(headers)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
