//! OAuth 1.0a request signing (HMAC-SHA1) for the X API.
//!
//! The signature base string is `METHOD&url&params`, where `params` is the
//! sorted, percent-encoded oauth parameters plus any query/form parameters.
//! JSON bodies are not part of the base string.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;

use crate::error::PublishError;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay as-is; everything else is encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// The four secrets needed to sign a user-context request.
#[derive(Clone, Copy)]
pub struct OAuthKeys<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: &'a str,
    pub token_secret: &'a str,
}

/// Per-request values that must be unique (nonce) and current (timestamp).
#[derive(Debug, Clone)]
pub struct RequestStamp {
    pub nonce: String,
    pub timestamp: i64,
}

impl RequestStamp {
    /// Random nonce, current Unix time.
    pub fn fresh() -> Self {
        Self {
            nonce: uuid::Uuid::new_v4().simple().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

fn oauth_params(keys: &OAuthKeys<'_>, stamp: &RequestStamp) -> Vec<(String, String)> {
    vec![
        ("oauth_consumer_key".into(), keys.consumer_key.into()),
        ("oauth_nonce".into(), stamp.nonce.clone()),
        ("oauth_signature_method".into(), "HMAC-SHA1".into()),
        ("oauth_timestamp".into(), stamp.timestamp.to_string()),
        ("oauth_token".into(), keys.token.into()),
        ("oauth_version".into(), "1.0".into()),
    ]
}

/// Compute the base64 HMAC-SHA1 signature for a request.
pub fn signature(
    method: &str,
    url: &str,
    extra_params: &[(&str, &str)],
    keys: &OAuthKeys<'_>,
    stamp: &RequestStamp,
) -> Result<String, PublishError> {
    let mut encoded: Vec<(String, String)> = oauth_params(keys, stamp)
        .into_iter()
        .chain(
            extra_params
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        )
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    );
    let signing_key = format!(
        "{}&{}",
        percent_encode(keys.consumer_secret),
        percent_encode(keys.token_secret)
    );

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .map_err(|e| PublishError::Signing(e.to_string()))?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Build the `Authorization: OAuth ...` header value.
pub fn authorization_header(
    method: &str,
    url: &str,
    extra_params: &[(&str, &str)],
    keys: &OAuthKeys<'_>,
    stamp: &RequestStamp,
) -> Result<String, PublishError> {
    let signature = signature(method, url, extra_params, keys, stamp)?;

    let mut params = oauth_params(keys, stamp);
    params.push(("oauth_signature".into(), signature));
    params.sort();

    let fields = params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {fields}"))
}
