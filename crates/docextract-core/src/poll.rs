//! Shared wait-for-completion loop for backends that hand back a job handle
//! and finish asynchronously.
//!
//! Every adapter with deferred completion (job polling or thread/run
//! polling) goes through [`CompletionWaiter`], so the poll interval and the
//! interpretation of terminal states are identical across backends.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::ProviderError;

/// Default pause between consecutive status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default upper bound on total waiting time (10 minutes).
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(600);

/// Status of a deferred backend job as reported by one status query.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus<T> {
    Pending,
    Running,
    Succeeded(T),
    /// Terminal failure, with the backend-supplied reason if there is one.
    Failed(Option<String>),
}

impl<T> JobStatus<T> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded(_) | JobStatus::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded(_) => "succeeded",
            JobStatus::Failed(_) => "failed",
        }
    }
}

/// An opaque handle to a job created on a backend. Polled until terminal,
/// then dropped; never persisted.
pub trait JobHandle: Send + Sync {
    type Output: Send;

    /// Issue exactly one status query.
    fn poll_status(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<JobStatus<Self::Output>, ProviderError>> + Send + '_>>;
}

/// Fixed-interval poller with an optional overall deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionWaiter {
    interval: Duration,
    max_wait: Option<Duration>,
}

impl Default for CompletionWaiter {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: Some(DEFAULT_MAX_WAIT),
        }
    }
}

impl CompletionWaiter {
    /// `max_wait = None` polls until the backend reports a terminal state,
    /// however long that takes.
    pub fn new(interval: Duration, max_wait: Option<Duration>) -> Self {
        Self { interval, max_wait }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    /// Poll `handle` until it succeeds or fails.
    ///
    /// The first status query is issued immediately; after that one query is
    /// issued per interval. A `failed` status becomes an upstream error that
    /// carries the backend's reason. Errors from the status query itself are
    /// returned as-is, without retrying.
    pub async fn await_completion<H>(&self, handle: &H) -> Result<H::Output, ProviderError>
    where
        H: JobHandle + ?Sized,
    {
        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let status = handle.poll_status().await?;
            tracing::debug!(attempt, status = status.label(), "polled job status");

            match status {
                JobStatus::Succeeded(output) => return Ok(output),
                JobStatus::Failed(reason) => {
                    let reason = reason
                        .filter(|r| !r.trim().is_empty())
                        .unwrap_or_else(|| "no reason reported".to_string());
                    return Err(ProviderError::Upstream(format!("job failed: {reason}")));
                }
                JobStatus::Pending | JobStatus::Running => {}
            }

            if let Some(max_wait) = self.max_wait
                && start.elapsed() + self.interval > max_wait
            {
                return Err(ProviderError::Upstream(format!(
                    "timed out after {:.1}s waiting for job completion ({attempt} status checks)",
                    start.elapsed().as_secs_f64()
                )));
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
