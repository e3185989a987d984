//! Envelope serialization for HTTP responses.

use axum::http::StatusCode;
use serde_json::Value;

use crate::envelope::{Code, Envelope, Fault};

/// Serializes an envelope into a response body.
pub trait Converter: Send + Sync {
    /// `Content-Type` of the produced body.
    fn content_type(&self) -> &'static str;

    /// Response body for `envelope`.
    ///
    /// # Errors
    ///
    /// Returns a fault if the envelope cannot be encoded.
    fn convert(&self, envelope: &Envelope) -> Result<Vec<u8>, Fault>;

    /// Response status for `envelope`.
    fn status(&self, _envelope: &Envelope) -> StatusCode {
        StatusCode::OK
    }
}

/// Writes the whole `{code, error, content}` envelope as JSON, always with 200.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverter;

impl Converter for JsonConverter {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn convert(&self, envelope: &Envelope) -> Result<Vec<u8>, Fault> {
        envelope.to_json().map(String::into_bytes)
    }
}

/// Writes the bare content as text, or `code: error` for faults.
///
/// Faults map to HTTP statuses so plain clients can tell them apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextConverter;

impl Converter for TextConverter {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn convert(&self, envelope: &Envelope) -> Result<Vec<u8>, Fault> {
        let text = if envelope.is_success() {
            match &envelope.content {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }
        } else {
            format!(
                "{}: {}",
                envelope.code,
                envelope.error.as_deref().unwrap_or_default()
            )
        };
        Ok(text.into_bytes())
    }

    fn status(&self, envelope: &Envelope) -> StatusCode {
        match envelope.code {
            Code::Success => StatusCode::OK,
            Code::InvalidParameter => StatusCode::BAD_REQUEST,
            Code::InvalidToken => StatusCode::UNAUTHORIZED,
            Code::AccessDenied => StatusCode::FORBIDDEN,
            Code::RequestHandlingFault => StatusCode::NOT_FOUND,
            Code::InvocationFault => StatusCode::BAD_GATEWAY,
            Code::GenericFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
