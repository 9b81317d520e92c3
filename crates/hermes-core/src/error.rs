use std::fmt;

use thiserror::Error;

/// Message reported by the provider contract when a job ends in `faulted`.
pub const JOB_FAULTED_MESSAGE: &str = "there was an error processing your query";

/// The request in the job lifecycle that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Submit,
    Status,
    Results,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Submit => "submit",
            Stage::Status => "status",
            Stage::Results => "results",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised by the job lifecycle.
///
/// Every variant that stems from a request carries the [`Stage`] and, once the
/// provider has assigned one, the job id.
#[derive(Error, Debug)]
pub enum AppError {
    /// The API could not be reached (connect, timeout, broken body stream).
    #[error("{stage} request failed{}: {message}", job_suffix(.job_id))]
    Transport {
        stage: Stage,
        job_id: Option<String>,
        message: String,
        timeout: bool,
    },

    /// The API answered with a non-2xx status.
    #[error("{stage} request returned HTTP {status_code}{}: {body}", job_suffix(.job_id))]
    ApiStatus {
        stage: Stage,
        job_id: Option<String>,
        status_code: u16,
        body: String,
    },

    /// The response body did not match the expected JSON shape.
    #[error("failed to decode {stage} response{}: {source}", job_suffix(.job_id))]
    Decode {
        stage: Stage,
        job_id: Option<String>,
        #[source]
        source: DecodeError,
        body: String,
    },

    /// The provider reported the job as `faulted`.
    #[error("there was an error processing your query (job {job_id})")]
    JobFaulted { job_id: String },

    /// The poll deadline elapsed, or polling was cancelled, before a terminal status.
    #[error("polling job {job_id} timed out after {elapsed_secs}s{}", cancel_suffix(.cancelled))]
    PollTimeout {
        job_id: String,
        elapsed_secs: u64,
        cancelled: bool,
    },

    /// The background poll task ended without delivering an outcome.
    #[error("poll task for job {job_id} ended without a result")]
    ChannelClosed { job_id: String },

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

fn job_suffix(job_id: &Option<String>) -> String {
    match job_id {
        Some(id) => format!(" (job {id})"),
        None => String::new(),
    }
}

fn cancel_suffix(cancelled: &bool) -> &'static str {
    if *cancelled { " (cancelled)" } else { "" }
}

impl AppError {
    /// Returns the job id the error relates to, if one was assigned.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            AppError::Transport { job_id, .. }
            | AppError::ApiStatus { job_id, .. }
            | AppError::Decode { job_id, .. } => job_id.as_deref(),
            AppError::JobFaulted { job_id }
            | AppError::PollTimeout { job_id, .. }
            | AppError::ChannelClosed { job_id } => Some(job_id),
            AppError::Config(_) => None,
        }
    }

    /// Returns the lifecycle stage, for errors tied to a single request.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AppError::Transport { stage, .. }
            | AppError::ApiStatus { stage, .. }
            | AppError::Decode { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Returns true if this error is transient and worth retrying.
    ///
    /// Nothing in this crate retries; the classification is for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Transport { .. } | AppError::PollTimeout { .. } => true,
            AppError::ApiStatus { status_code, .. } => {
                *status_code == 429 || *status_code >= 500
            }
            _ => false,
        }
    }
}

/// Errors produced while decoding a response body.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The body is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    /// The top-level JSON value is not an object.
    #[error("expected a JSON object at the top level")]
    NotAnObject,

    /// `results` is present but not an array.
    #[error("`results` must be an array")]
    ResultsNotArray,

    /// One entry of the `results` array does not match the selected shape.
    #[error("result entry {index} does not match the {shape} shape: {source}")]
    Entry {
        index: usize,
        shape: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The `job` object is malformed.
    #[error("invalid `job` object: {0}")]
    Job(#[source] serde_json::Error),

    /// The submit response carries no usable `id`.
    #[error("response has no job id")]
    MissingJobId,
}

impl DecodeError {
    /// Index of the failing result entry, when the failure is entry-specific.
    pub fn entry_index(&self) -> Option<usize> {
        match self {
            DecodeError::Entry { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Failure raised by a [`Transport`](crate::traits::Transport) implementation.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub timeout: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: true,
        }
    }

    pub(crate) fn at(self, stage: Stage, job_id: Option<&str>) -> AppError {
        AppError::Transport {
            stage,
            job_id: job_id.map(str::to_string),
            message: self.message,
            timeout: self.timeout,
        }
    }
}
