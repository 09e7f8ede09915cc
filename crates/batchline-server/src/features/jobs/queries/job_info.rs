//! Job info query
//!
//! Name and description of the job the import endpoint launches.

use serde::{Deserialize, Serialize};

use crate::features::JobsState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobInfoQuery;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub job_name: String,
    pub job_description: String,
}

pub fn handle(state: &JobsState, _query: JobInfoQuery) -> JobInfo {
    JobInfo {
        job_name: state.job.name().to_string(),
        job_description: state.job.description().to_string(),
    }
}
