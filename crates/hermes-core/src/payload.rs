use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::models::ResultShape;

/// A ready-to-send job body together with the result shape it will produce.
///
/// Building the body for a particular source is the caller's job; this type
/// only carries the bytes and the two decode flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapePayload {
    body: Vec<u8>,
    shape: ResultShape,
}

impl ScrapePayload {
    /// Wrap an already serialized body with explicit decode flags.
    pub fn new(body: impl Into<Vec<u8>>, parse: bool, custom_parse: bool) -> Self {
        Self {
            body: body.into(),
            shape: ResultShape::from_flags(parse, custom_parse),
        }
    }

    /// Serialize a payload and read the decode flags from it.
    ///
    /// `parse` must be `true` for parsed output; a non-null
    /// `parsing_instructions` value marks custom parsing.
    pub fn from_json<P: Serialize>(payload: &P) -> Result<Self, AppError> {
        let value = serde_json::to_value(payload)
            .map_err(|e| AppError::Config(format!("payload is not serializable: {e}")))?;
        let Value::Object(map) = &value else {
            return Err(AppError::Config("payload must be a JSON object".into()));
        };

        let parse = map.get("parse").and_then(Value::as_bool).unwrap_or(false);
        let custom_parse = map
            .get("parsing_instructions")
            .is_some_and(|v| !v.is_null());

        let body = serde_json::to_vec(&value)
            .map_err(|e| AppError::Config(format!("payload is not serializable: {e}")))?;

        Ok(Self {
            body,
            shape: ResultShape::from_flags(parse, custom_parse),
        })
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn shape(&self) -> ResultShape {
        self.shape
    }
}
