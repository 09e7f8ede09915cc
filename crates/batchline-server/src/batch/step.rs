//! Step abstraction executed by the job launcher

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::types::StepExecution;

/// Runtime inputs for one step execution
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Data records already committed by a previous execution of this step
    pub restart_position: u64,
    /// Cancelled when a stop has been requested for the job execution
    pub stop: CancellationToken,
}

impl StepContext {
    pub fn new(restart_position: u64, stop: CancellationToken) -> Self {
        Self { restart_position, stop }
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }
}

impl Default for StepContext {
    fn default() -> Self {
        Self::new(0, CancellationToken::new())
    }
}

/// A unit of work inside a job
///
/// Implementations record their outcome in the passed execution; they never
/// return an error to the launcher.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, execution: &mut StepExecution, context: &StepContext);
}
