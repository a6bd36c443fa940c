//! Stack deployment: submit, poll to a terminal state, collect outputs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::backends::ProvisioningBackend;
use crate::error::{Result, StrataError};
use crate::types::{StackOutcome, StackRequest, StatusClass, TerminalStatus};

/// Default wait between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Drives one provisioning request to a terminal state.
///
/// The poll loop is a timed suspension, not a busy spin, and races a
/// cancellation receiver: a message on it aborts the deployment with
/// `StrataError::Cancelled`. A terminal failure in the backend is a normal
/// outcome (`StackOutcome` with `Failed` status and empty outputs), not an
/// error; only submission rejections and transport faults return `Err`.
pub struct StackDeployer {
    backend: Arc<dyn ProvisioningBackend>,
    poll_interval: Duration,
    max_poll_attempts: Option<u32>,
}

impl StackDeployer {
    pub fn new(backend: Arc<dyn ProvisioningBackend>) -> Self {
        Self { backend, poll_interval: DEFAULT_POLL_INTERVAL, max_poll_attempts: None }
    }

    /// Set the wait between status polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bound the number of polls before giving up on a stuck backend.
    pub fn with_max_poll_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    /// Submit a request and poll until the stack reaches a terminal state.
    ///
    /// Polling starts only after a successful submission.
    #[instrument(skip(self, request, cancel), fields(stack = %request.name))]
    pub async fn deploy(
        &self,
        request: &StackRequest,
        cancel: &mut broadcast::Receiver<()>,
    ) -> Result<StackOutcome> {
        let stack_id = self.backend.submit_stack(request).await?;
        info!(stack_id = %stack_id, template = %request.template_url, "Stack submission accepted");

        let mut attempts = 0u32;
        loop {
            if let Some(max) = self.max_poll_attempts {
                if attempts >= max {
                    warn!(attempts, "Giving up on stack that never reached a terminal state");
                    return Err(StrataError::PollTimeout { stack: request.name.clone(), attempts });
                }
            }
            attempts += 1;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                received = cancel.recv() => {
                    match received {
                        // A lagged receiver still means someone asked to stop.
                        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                            info!("Deployment cancelled while waiting for stack to settle");
                            return Err(StrataError::Cancelled { stack: request.name.clone() });
                        }
                        // Channel closed: no cancel source remains, finish the wait.
                        Err(broadcast::error::RecvError::Closed) => {
                            tokio::time::sleep(self.poll_interval).await;
                        }
                    }
                }
            }

            let status = self.backend.stack_status(&request.name).await?;
            match StatusClass::classify(&status) {
                StatusClass::Complete => {
                    let outputs = self.backend.stack_outputs(&request.name).await?;
                    info!(status = %status, outputs = outputs.len(), "Stack created successfully");
                    return Ok(StackOutcome {
                        stack_id,
                        status: TerminalStatus::Succeeded,
                        outputs,
                    });
                }
                StatusClass::Failed => {
                    warn!(status = %status, "Stack reached a terminal failure state");
                    return Ok(StackOutcome {
                        stack_id,
                        status: TerminalStatus::Failed,
                        outputs: Vec::new(),
                    });
                }
                StatusClass::InProgress => {
                    debug!(status = %status, attempt = attempts, "Stack still in progress");
                }
            }
        }
    }
}
