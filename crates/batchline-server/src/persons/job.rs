//! The person import job definition

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use super::processor::PersonItemProcessor;
use super::reader::CsvPersonReaderFactory;
use super::writer::PersonStoreWriter;
use crate::batch::{ChunkConfig, ChunkStep, Job, JobParameters, LoggingJobListener, ParametersValidator};
use crate::config::ImportConfig;
use crate::store::PersonStore;

pub const IMPORT_PERSONS_JOB: &str = "importPersonsJob";
pub const IMPORT_PERSONS_STEP: &str = "importPersonsStep";
pub const IMPORT_PERSONS_DESCRIPTION: &str = "Import persons from CSV to database";

/// Uniquifying parameter every launch must carry
pub const TIMESTAMP_PARAMETER: &str = "timestamp";

/// Optional wall-clock start parameter
pub const START_TIME_PARAMETER: &str = "startTime";

static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Epoch millis, strictly increasing within the process
fn next_timestamp() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_TIMESTAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_TIMESTAMP.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

/// Parameters identifying a brand new import instance
pub fn fresh_parameters() -> JobParameters {
    JobParameters::builder()
        .add_long(TIMESTAMP_PARAMETER, next_timestamp())
        .add_date_time(START_TIME_PARAMETER, Utc::now())
        .build()
}

/// Build the single-step CSV-to-store import job
pub fn import_persons_job(config: &ImportConfig, store: Arc<dyn PersonStore>) -> Job {
    let reader = CsvPersonReaderFactory::new(&config.input_path)
        .delimiter(config.delimiter_byte())
        .lines_to_skip(config.lines_to_skip);

    let step = ChunkStep::new(
        IMPORT_PERSONS_STEP,
        ChunkConfig::new(config.chunk_size, config.skip_limit),
        Arc::new(reader),
        Arc::new(PersonItemProcessor),
        Arc::new(PersonStoreWriter::new(store)),
    );

    Job::builder(IMPORT_PERSONS_JOB)
        .description(IMPORT_PERSONS_DESCRIPTION)
        .step(Arc::new(step))
        .listener(Arc::new(LoggingJobListener))
        .validator(
            ParametersValidator::new()
                .require(TIMESTAMP_PARAMETER)
                .allow(START_TIME_PARAMETER),
        )
        .build()
}
