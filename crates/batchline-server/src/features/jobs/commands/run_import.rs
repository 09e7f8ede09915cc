//! Run import command
//!
//! Launches the person import with a fresh parameter set and waits for it
//! to finish.

use serde::{Deserialize, Serialize};

use crate::batch::{JobExecutionResult, JobLaunchError};
use crate::features::JobsState;
use crate::persons::fresh_parameters;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunImportCommand;

pub async fn handle(
    state: &JobsState,
    _command: RunImportCommand,
) -> Result<JobExecutionResult, JobLaunchError> {
    let execution = state.launcher.run(&state.job, fresh_parameters()).await?;
    Ok(execution.result())
}
