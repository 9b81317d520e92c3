//! Decoding of results-endpoint bodies.
//!
//! The body is first read into a generic JSON object so that `results` and
//! `job` can be handled independently and unknown top-level fields are
//! ignored. Every entry of `results` is then decoded with the single shape
//! chosen for the job. One bad entry fails the whole decode.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::job::Job;
use crate::models::{
    CustomContent, DecodedResponse, ParsedContent, ResultEntry, ResultSet, ResultShape,
};

/// Decode a results body into a [`DecodedResponse`].
///
/// Pure: the same bytes and shape always give the same outcome.
pub fn decode_response(
    body: &[u8],
    shape: ResultShape,
    status_code: u16,
    status: &str,
) -> Result<DecodedResponse, DecodeError> {
    let mut top = parse_object(body)?;

    let results = match top.remove("results") {
        None | Some(Value::Null) => ResultSet::empty(shape),
        Some(Value::Array(items)) => decode_results(items, shape)?,
        Some(_) => return Err(DecodeError::ResultsNotArray),
    };

    let job = decode_job(top.remove("job"))?;

    Ok(DecodedResponse {
        results,
        job,
        status_code,
        status: status.to_string(),
    })
}

/// Decode a `results` array with the given shape.
pub fn decode_results(items: Vec<Value>, shape: ResultShape) -> Result<ResultSet, DecodeError> {
    Ok(match shape {
        ResultShape::Raw => ResultSet::Raw(decode_entries::<String>(items, shape)?),
        ResultShape::Parsed => ResultSet::Parsed(decode_entries::<ParsedContent>(items, shape)?),
        ResultShape::CustomParsed => {
            ResultSet::CustomParsed(decode_entries::<CustomContent>(items, shape)?)
        }
    })
}

/// Decode a job object from a status or submit response body.
pub fn decode_job_body(body: &[u8]) -> Result<Job, DecodeError> {
    let top = parse_object(body)?;
    serde_json::from_value(Value::Object(top)).map_err(DecodeError::Job)
}

/// Extract the job id from a submit response, ignoring every other field.
pub fn decode_job_id(body: &[u8]) -> Result<String, DecodeError> {
    let top = parse_object(body)?;
    match top.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        _ => Err(DecodeError::MissingJobId),
    }
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::from_slice::<Value>(body).map_err(DecodeError::Json)? {
        Value::Object(map) => Ok(map),
        _ => Err(DecodeError::NotAnObject),
    }
}

fn decode_entries<C: DeserializeOwned>(
    items: Vec<Value>,
    shape: ResultShape,
) -> Result<Vec<ResultEntry<C>>, DecodeError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|source| DecodeError::Entry {
                index,
                shape: shape.as_str(),
                source,
            })
        })
        .collect()
}

fn decode_job(value: Option<Value>) -> Result<Job, DecodeError> {
    match value {
        None | Some(Value::Null) => Ok(Job::default()),
        Some(v) => serde_json::from_value(v).map_err(DecodeError::Job),
    }
}
