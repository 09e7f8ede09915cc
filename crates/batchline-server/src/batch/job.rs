//! Job definitions

use std::sync::Arc;

use super::error::JobLaunchError;
use super::listener::JobExecutionListener;
use super::step::Step;
use super::types::JobParameters;

/// Checks parameter keys before a job instance is created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParametersValidator {
    required: Vec<String>,
    /// When set, keys outside `required` and this list are rejected
    optional: Option<Vec<String>>,
}

impl ParametersValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, key: impl Into<String>) -> Self {
        self.required.push(key.into());
        self
    }

    pub fn allow(mut self, key: impl Into<String>) -> Self {
        self.optional.get_or_insert_with(Vec::new).push(key.into());
        self
    }

    pub fn validate(&self, parameters: &JobParameters) -> Result<(), JobLaunchError> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .map(String::as_str)
            .filter(|key| !parameters.contains_key(key))
            .collect();
        if !missing.is_empty() {
            return Err(JobLaunchError::InvalidParameters(format!(
                "missing required keys: {}",
                missing.join(", ")
            )));
        }

        if let Some(optional) = &self.optional {
            let unknown: Vec<&str> = parameters
                .keys()
                .filter(|key| !self.required.iter().any(|r| r.as_str() == *key))
                .filter(|key| !optional.iter().any(|o| o.as_str() == *key))
                .collect();
            if !unknown.is_empty() {
                return Err(JobLaunchError::InvalidParameters(format!(
                    "unexpected keys: {}",
                    unknown.join(", ")
                )));
            }
        }

        Ok(())
    }
}

/// An ordered list of steps plus the listeners observing its executions
#[derive(Clone)]
pub struct Job {
    name: String,
    description: String,
    steps: Vec<Arc<dyn Step>>,
    listeners: Vec<Arc<dyn JobExecutionListener>>,
    validator: ParametersValidator,
    restartable: bool,
}

impl Job {
    pub fn builder(name: impl Into<String>) -> JobBuilder {
        JobBuilder {
            name: name.into(),
            description: String::new(),
            steps: Vec::new(),
            listeners: Vec::new(),
            validator: ParametersValidator::default(),
            restartable: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.steps
    }

    pub fn listeners(&self) -> &[Arc<dyn JobExecutionListener>] {
        &self.listeners
    }

    pub fn validator(&self) -> &ParametersValidator {
        &self.validator
    }

    pub fn is_restartable(&self) -> bool {
        self.restartable
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("steps", &self.steps.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("listeners", &self.listeners.len())
            .field("restartable", &self.restartable)
            .finish()
    }
}

pub struct JobBuilder {
    name: String,
    description: String,
    steps: Vec<Arc<dyn Step>>,
    listeners: Vec<Arc<dyn JobExecutionListener>>,
    validator: ParametersValidator,
    restartable: bool,
}

impl JobBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn step(mut self, step: Arc<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    /// Listeners are notified in registration order
    pub fn listener(mut self, listener: Arc<dyn JobExecutionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn validator(mut self, validator: ParametersValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn restartable(mut self, restartable: bool) -> Self {
        self.restartable = restartable;
        self
    }

    pub fn build(self) -> Job {
        Job {
            name: self.name,
            description: self.description,
            steps: self.steps,
            listeners: self.listeners,
            validator: self.validator,
            restartable: self.restartable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validator_requires_keys() {
        let validator = ParametersValidator::new().require("timestamp");

        let ok = JobParameters::builder().add_long("timestamp", 1).build();
        assert!(validator.validate(&ok).is_ok());

        let err = validator.validate(&JobParameters::new()).unwrap_err();
        assert_eq!(
            err,
            JobLaunchError::InvalidParameters("missing required keys: timestamp".to_string())
        );
    }

    #[test]
    fn test_validator_allow_list() {
        let validator = ParametersValidator::new().require("timestamp").allow("startTime");

        let ok = JobParameters::builder()
            .add_long("timestamp", 1)
            .add_string("startTime", "now")
            .build();
        assert!(validator.validate(&ok).is_ok());

        let extra = JobParameters::builder()
            .add_long("timestamp", 1)
            .add_string("color", "blue")
            .build();
        assert!(matches!(
            validator.validate(&extra),
            Err(JobLaunchError::InvalidParameters(msg)) if msg.contains("color")
        ));
    }

    #[test]
    fn test_without_allow_list_any_extra_key_passes() {
        let validator = ParametersValidator::new().require("timestamp");
        let params = JobParameters::builder()
            .add_long("timestamp", 1)
            .add_string("anything", "goes")
            .build();
        assert!(validator.validate(&params).is_ok());
    }

    #[test]
    fn test_builder_defaults() {
        let job = Job::builder("emptyJob").description("does nothing").build();
        assert_eq!(job.name(), "emptyJob");
        assert_eq!(job.description(), "does nothing");
        assert!(job.steps().is_empty());
        assert!(job.is_restartable());
    }
}
