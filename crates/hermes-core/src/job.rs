use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::models::ResultShape;
use crate::util::deserialize_timestamp;

/// Interval between status checks when the caller does not pick one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Overall polling budget when the caller supplies no deadline.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(50);

/// Status of a job as reported by the provider.
///
/// Only `done` and `faulted` are terminal. Anything else, including values
/// this crate has never seen, means the job is still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    #[default]
    Pending,
    Done,
    Faulted,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Done => "done",
            JobStatus::Faulted => "faulted",
            JobStatus::Other(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Faulted)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "pending" => JobStatus::Pending,
            "done" => JobStatus::Done,
            "faulted" => JobStatus::Faulted,
            _ => JobStatus::Other(s.to_string()),
        })
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Hypermedia link attached to a job (`_links`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobLink {
    pub rel: String,
    pub href: String,
    pub method: Option<String>,
}

/// A scrape job on the provider's side.
///
/// Only `id` and `status` drive the lifecycle; the rest is metadata echoed
/// back by the provider and decoded when present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub client_id: Option<u64>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub query: Option<String>,
    pub url: Option<String>,
    pub domain: Option<String>,
    pub callback_url: Option<String>,
    pub parse: Option<bool>,
    pub render: Option<String>,
    pub geo_location: Option<serde_json::Value>,
    pub locale: Option<String>,
    pub pages: Option<u32>,
    pub start_page: Option<u32>,
    #[serde(rename = "_links")]
    pub links: Vec<JobLink>,
}

impl Job {
    /// Returns the link with the given relation, e.g. `"results"`.
    pub fn link(&self, rel: &str) -> Option<&JobLink> {
        self.links.iter().find(|l| l.rel == rel)
    }
}

/// Settings for one poll cycle of a submitted job.
///
/// Defaults are resolved here, at construction; the poller never consults
/// anything but the values stored in this struct.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
    /// Absolute deadline. Takes precedence over `timeout` when set.
    pub deadline: Option<Instant>,
    pub shape: ResultShape,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
            deadline: None,
            shape: ResultShape::Raw,
        }
    }
}

impl PollConfig {
    /// Config for the shape selected by the caller's `parse` /
    /// `custom_parse` flags.
    pub fn from_flags(parse: bool, custom_parse: bool) -> Self {
        Self::default().with_shape(ResultShape::from_flags(parse, custom_parse))
    }

    pub fn with_shape(mut self, shape: ResultShape) -> Self {
        self.shape = shape;
        self
    }

    /// A zero interval falls back to [`DEFAULT_POLL_INTERVAL`].
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = if interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            interval
        };
        self
    }

    /// A zero timeout falls back to [`DEFAULT_POLL_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() {
            DEFAULT_POLL_TIMEOUT
        } else {
            timeout
        };
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline for a poll loop that started at `start`.
    pub fn deadline_from(&self, start: Instant) -> Instant {
        self.deadline.unwrap_or(start + self.timeout)
    }
}
