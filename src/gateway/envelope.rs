//! Response envelope handling.
//!
//! The backend wraps most payloads as `{ "code": 200, "message": "...", "data": ... }`, but some
//! endpoints answer with the bare payload. Callers unwrap `data` when it is present and non-null,
//! otherwise the body itself is the payload.

use crate::gateway::GatewayError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A decoded response body, before payload extraction.
#[derive(Debug, Clone)]
pub struct Envelope {
    body: Value,
}

impl Envelope {
    pub fn parse(raw: &[u8]) -> Result<Self, GatewayError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self { body: Value::Null });
        }
        Ok(Self {
            body: serde_json::from_slice(raw)?,
        })
    }

    /// True when the response carried no body at all.
    pub fn is_empty(&self) -> bool {
        self.body.is_null()
    }

    /// The envelope's `code`, when the body is an envelope that carries one.
    pub fn code(&self) -> Option<i64> {
        self.body.get("code").and_then(Value::as_i64)
    }

    /// The envelope's `message`, when present.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    /// Fails with `Rejected` when the envelope reports a non-2xx business code.
    pub fn ensure_success(&self) -> Result<(), GatewayError> {
        match self.code() {
            Some(code) if !(200..300).contains(&code) => Err(GatewayError::Rejected {
                status: u16::try_from(code).unwrap_or(500),
                message: self.message().unwrap_or_default().to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Decodes the payload: `data` if present and non-null, else the whole body.
    pub fn into_payload<T: DeserializeOwned>(self) -> Result<T, GatewayError> {
        let payload = match self.body {
            Value::Object(mut map) => match map.remove("data") {
                Some(data) if !data.is_null() => data,
                Some(_) | None => Value::Object(map),
            },
            other => other,
        };
        Ok(serde_json::from_value(payload)?)
    }

    /// Like [`Envelope::into_payload`], but an absent payload (`data: null` or an empty body)
    /// decodes as the type's default.
    pub fn into_payload_or_default<T: DeserializeOwned + Default>(self) -> Result<T, GatewayError> {
        if self.body.is_null() || matches!(self.body.get("data"), Some(Value::Null)) {
            return Ok(T::default());
        }
        self.into_payload()
    }
}
