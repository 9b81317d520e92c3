pub mod client;
pub mod decode;
pub mod error;
pub mod handle;
pub mod job;
pub mod models;
pub mod payload;
pub mod poller;
pub mod testutil;
pub mod traits;
pub mod util;

pub use client::{DEFAULT_BASE_URL, Endpoints, JobClient};
pub use error::{AppError, DecodeError, Stage, TransportError};
pub use handle::ScrapeHandle;
pub use job::{Job, JobStatus, PollConfig};
pub use models::{DecodedResponse, ResultEntry, ResultSet, ResultShape};
pub use payload::ScrapePayload;
pub use poller::{PollEvent, PollReporter, PollState, TracingPollReporter};
pub use traits::{ApiRequest, ApiResponse, Method, Transport};
