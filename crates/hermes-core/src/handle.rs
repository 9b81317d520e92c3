use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::client::JobClient;
use crate::error::AppError;
use crate::job::PollConfig;
use crate::models::DecodedResponse;
use crate::payload::ScrapePayload;
use crate::traits::Transport;

type Outcome = Result<DecodedResponse, AppError>;

/// Handle to a submitted job whose polling runs in the background.
///
/// Resolves to exactly one outcome: the decoded results or the first error.
/// The outcome travels over a `oneshot` channel, so the background task can
/// deliver at most once. Once the outcome has been taken the handle is
/// spent: [`is_terminated`](Self::is_terminated) returns true and polling it
/// again stays `Pending` forever, so a second `.await` never completes.
///
/// Dropping the handle cancels the background poll at its next wait. Each
/// handle owns its own cancellation token, so this never reaches a token
/// shared with other handles.
#[must_use = "dropping a ScrapeHandle cancels the job's polling"]
pub struct ScrapeHandle {
    job_id: String,
    receiver: Option<oneshot::Receiver<Outcome>>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl ScrapeHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Stop polling. The handle then resolves to a cancelled
    /// [`AppError::PollTimeout`] unless an outcome was already produced.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// True once the outcome has been yielded.
    pub fn is_terminated(&self) -> bool {
        self.receiver.is_none()
    }
}

impl Future for ScrapeHandle {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(receiver) = this.receiver.as_mut() else {
            return Poll::Pending;
        };

        let outcome = match Pin::new(receiver).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Ok(outcome)) => outcome,
            Poll::Ready(Err(_)) => Err(AppError::ChannelClosed {
                job_id: this.job_id.clone(),
            }),
        };
        this.receiver = None;
        Poll::Ready(outcome)
    }
}

impl<T: Transport + 'static> JobClient<T> {
    /// Submit a job and poll it in the background.
    ///
    /// Returns once submission has succeeded; a submission failure is
    /// returned directly and no task is spawned. The payload's decode flags
    /// override the shape in `config`.
    pub async fn scrape(
        &self,
        payload: &ScrapePayload,
        config: PollConfig,
    ) -> Result<ScrapeHandle, AppError> {
        self.scrape_with_token(payload, config, &CancellationToken::new())
            .await
    }

    /// Like [`scrape`](Self::scrape), with polling also stopped when `parent`
    /// is cancelled.
    pub async fn scrape_with_token(
        &self,
        payload: &ScrapePayload,
        config: PollConfig,
        parent: &CancellationToken,
    ) -> Result<ScrapeHandle, AppError> {
        let job_id = self.submit(payload.body()).await?;
        let config = config.with_shape(payload.shape());
        Ok(self.spawn_poll(job_id, config, parent))
    }

    /// Poll an already submitted job on a background task.
    ///
    /// Polling stops when `parent` is cancelled or the handle is dropped;
    /// dropping the handle leaves `parent` untouched.
    pub fn spawn_poll(
        &self,
        job_id: String,
        config: PollConfig,
        parent: &CancellationToken,
    ) -> ScrapeHandle {
        let cancel = parent.child_token();
        let (sender, receiver) = oneshot::channel();
        let client = self.clone();
        let token = cancel.clone();
        let id = job_id.clone();

        tokio::spawn(async move {
            let outcome = client.poll(&id, &config, &token).await;
            if sender.send(outcome).is_err() {
                tracing::debug!(job_id = %id, "Scrape handle dropped before delivery");
            }
        });

        ScrapeHandle {
            job_id,
            receiver: Some(receiver),
            _guard: cancel.clone().drop_guard(),
            cancel,
        }
    }
}
