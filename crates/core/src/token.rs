//! Access token inspection
//!
//! Access tokens are JWTs issued by the account service. The client never
//! verifies signatures; it only reads the payload segment to decide whether a
//! token is still usable and to surface informational claims (subject, roles).

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Seconds before `exp` at which a token already counts as expired
pub const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 60;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// Reasons a token payload could not be read
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is empty")]
    Empty,

    #[error("expected 3 dot-separated segments, found {0}")]
    Segments(usize),

    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no numeric exp claim")]
    MissingExp,
}

/// Claims carried in the access token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject, usually the username
    #[serde(default)]
    pub sub: Option<String>,
    /// Numeric account identifier
    #[serde(default, rename = "userId")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub roles: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub permissions: Vec<String>,
    /// Expiry, epoch seconds
    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: Option<i64>,
    /// Issued at, epoch seconds
    #[serde(default, deserialize_with = "numeric_date")]
    pub iat: Option<i64>,
    /// Any claims not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[allow(clippy::cast_possible_truncation)]
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite()).map(|v| v.floor() as i64))
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_LENIENT
        .decode(segment)
        .or_else(|_| STANDARD_LENIENT.decode(segment))
}

/// Decode the payload segment of a JWT into a JSON object
pub fn decode_payload(token: &str) -> Result<Map<String, Value>, TokenError> {
    if token.is_empty() {
        return Err(TokenError::Empty);
    }

    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Segments(segments.len()));
    }

    let bytes = decode_segment(segments[1])?;
    match serde_json::from_slice::<Value>(&bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(TokenError::NotAnObject),
    }
}

/// Decode the payload of a token into [`TokenClaims`] without verifying it
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let payload = decode_payload(token)?;
    Ok(serde_json::from_value(Value::Object(payload))?)
}

/// Expiry instant of a token in epoch milliseconds
pub fn expiry_millis(token: &str) -> Result<f64, TokenError> {
    decode_payload(token)?
        .get("exp")
        .and_then(Value::as_f64)
        .filter(|exp| exp.is_finite())
        .map(|exp| exp * 1000.0)
        .ok_or(TokenError::MissingExp)
}

/// Whether `token` should be treated as expired right now
///
/// Absent, empty and undecodable tokens are always expired. A decodable token
/// is expired once the current time reaches `exp - buffer_secs`.
pub fn is_expired(token: Option<&str>, buffer_secs: i64) -> bool {
    is_expired_at(token, buffer_secs, Utc::now().timestamp_millis())
}

/// [`is_expired`] evaluated against an explicit clock reading in milliseconds
#[allow(clippy::cast_precision_loss)]
pub fn is_expired_at(token: Option<&str>, buffer_secs: i64, now_millis: i64) -> bool {
    let Some(token) = token else {
        return true;
    };

    match expiry_millis(token) {
        Ok(exp_millis) => now_millis as f64 >= exp_millis - (buffer_secs as f64) * 1000.0,
        Err(err) => {
            debug!("Treating unreadable access token as expired: {err}");
            true
        }
    }
}
