use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::client::JobClient;
use crate::error::AppError;
use crate::job::{JobStatus, PollConfig};
use crate::models::DecodedResponse;
use crate::traits::Transport;

/// States of one poll loop.
///
/// ```text
/// Submitted --> Polling --+--> Done
///                 ^  |    +--> Faulted
///                 +--+    +--> TimedOut
///               (pending) +--> TransportFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Submitted,
    Polling,
    Done,
    Faulted,
    TimedOut,
    TransportFailed,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Submitted | PollState::Polling)
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PollState::Submitted => "submitted",
            PollState::Polling => "polling",
            PollState::Done => "done",
            PollState::Faulted => "faulted",
            PollState::TimedOut => "timed-out",
            PollState::TransportFailed => "transport-failed",
        };
        write!(f, "{s}")
    }
}

/// Events emitted while polling a job, for monitoring/logging.
#[derive(Debug, Clone)]
pub enum PollEvent<'a> {
    Started {
        job_id: &'a str,
        interval: Duration,
        budget: Duration,
    },
    StateChanged {
        job_id: &'a str,
        from: PollState,
        to: PollState,
    },
    StatusChecked {
        job_id: &'a str,
        attempt: u32,
        status: &'a JobStatus,
    },
    Waiting {
        job_id: &'a str,
        attempt: u32,
        delay: Duration,
    },
    Finished {
        job_id: &'a str,
        state: PollState,
        attempts: u32,
        elapsed: Duration,
    },
}

/// Trait for receiving poll events (decoupled logging).
pub trait PollReporter: Send + Sync {
    fn report(&self, event: PollEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPollReporter;

impl PollReporter for TracingPollReporter {
    fn report(&self, event: PollEvent<'_>) {
        match event {
            PollEvent::Started {
                job_id,
                interval,
                budget,
            } => {
                tracing::info!(%job_id, ?interval, ?budget, "Polling started");
            }
            PollEvent::StateChanged { job_id, from, to } => {
                tracing::debug!(%job_id, %from, %to, "Poll state changed");
            }
            PollEvent::StatusChecked {
                job_id,
                attempt,
                status,
            } => {
                tracing::debug!(%job_id, %attempt, %status, "Job status checked");
            }
            PollEvent::Waiting {
                job_id,
                attempt,
                delay,
            } => {
                tracing::trace!(%job_id, %attempt, ?delay, "Waiting before next poll");
            }
            PollEvent::Finished {
                job_id,
                state,
                attempts,
                elapsed,
            } => match state {
                PollState::Done => {
                    tracing::info!(%job_id, %attempts, ?elapsed, "Job done");
                }
                _ => {
                    tracing::warn!(%job_id, %state, %attempts, ?elapsed, "Polling stopped");
                }
            },
        }
    }
}

/// Bookkeeping for one poll loop; every transition goes through the reporter.
struct PollRun<'a> {
    job_id: &'a str,
    reporter: &'a dyn PollReporter,
    state: PollState,
    attempts: u32,
    started: Instant,
}

impl<'a> PollRun<'a> {
    fn advance(&mut self, to: PollState) {
        if self.state == to {
            return;
        }
        self.reporter.report(PollEvent::StateChanged {
            job_id: self.job_id,
            from: self.state,
            to,
        });
        self.state = to;
    }

    fn finish(&mut self, to: PollState) {
        self.advance(to);
        self.reporter.report(PollEvent::Finished {
            job_id: self.job_id,
            state: to,
            attempts: self.attempts,
            elapsed: self.started.elapsed(),
        });
    }

    fn timed_out(&mut self, cancelled: bool) -> AppError {
        self.finish(PollState::TimedOut);
        AppError::PollTimeout {
            job_id: self.job_id.to_string(),
            elapsed_secs: self.started.elapsed().as_secs(),
            cancelled,
        }
    }
}

impl<T: Transport> JobClient<T> {
    /// Poll a submitted job until it reaches a terminal state, then fetch
    /// and decode its results.
    ///
    /// Termination is governed by wall clock only: the deadline from
    /// `config` (measured from now when no absolute deadline is set) and
    /// `cancel`. Both are checked after every non-terminal status and
    /// interrupt the wait between polls. No request is sent once the loop
    /// has given up.
    pub async fn poll(
        &self,
        job_id: &str,
        config: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<DecodedResponse, AppError> {
        let started = Instant::now();
        let deadline = config.deadline_from(started);
        let mut run = PollRun {
            job_id,
            reporter: self.reporter.as_ref(),
            state: PollState::Submitted,
            attempts: 0,
            started,
        };

        run.reporter.report(PollEvent::Started {
            job_id,
            interval: config.poll_interval,
            budget: deadline.saturating_duration_since(started),
        });

        loop {
            run.advance(PollState::Polling);
            run.attempts += 1;

            let job = match self.job_status(job_id).await {
                Ok(job) => job,
                Err(e) => {
                    run.finish(PollState::TransportFailed);
                    return Err(e);
                }
            };

            run.reporter.report(PollEvent::StatusChecked {
                job_id,
                attempt: run.attempts,
                status: &job.status,
            });

            match job.status {
                JobStatus::Done => {
                    run.finish(PollState::Done);
                    return self.fetch_results(job_id, config.shape).await;
                }
                JobStatus::Faulted => {
                    run.finish(PollState::Faulted);
                    return Err(AppError::JobFaulted {
                        job_id: job_id.to_string(),
                    });
                }
                JobStatus::Pending | JobStatus::Other(_) => {}
            }

            if cancel.is_cancelled() {
                return Err(run.timed_out(true));
            }
            if Instant::now() >= deadline {
                return Err(run.timed_out(false));
            }

            run.reporter.report(PollEvent::Waiting {
                job_id,
                attempt: run.attempts,
                delay: config.poll_interval,
            });

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(run.timed_out(true)),
                () = tokio::time::sleep_until(deadline) => return Err(run.timed_out(false)),
                () = tokio::time::sleep(config.poll_interval) => {}
            }
        }
    }
}
