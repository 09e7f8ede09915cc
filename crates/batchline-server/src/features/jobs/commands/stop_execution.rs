//! Stop execution command

use serde::{Deserialize, Serialize};

use crate::batch::{JobExecutionResult, StopError};
use crate::features::JobsState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopExecutionCommand {
    pub execution_id: i64,
}

/// Request a stop; the execution ends STOPPED once its current chunk commits
pub async fn handle(
    state: &JobsState,
    command: StopExecutionCommand,
) -> Result<JobExecutionResult, StopError> {
    let execution = state.launcher.stop(command.execution_id).await?;
    Ok(execution.result())
}
