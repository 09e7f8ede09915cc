//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::Notify;

use batchline_server::batch::{
    ChunkConfig, ChunkStep, ItemWriter, Job, LoggingJobListener, ParametersValidator, WriteError,
};
use batchline_server::persons::{
    CsvPersonReaderFactory, Person, PersonItemProcessor, PersonStoreWriter, IMPORT_PERSONS_JOB,
    IMPORT_PERSONS_STEP,
};
use batchline_server::store::InMemoryPersonStore;

pub const HEADER: &str = "firstName,lastName\n";

/// Write `content` to a temporary CSV file
pub fn csv_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Header followed by `first,last` lines named `First{i},Last{i}`
pub fn numbered_rows(count: usize) -> String {
    let mut content = HEADER.to_string();
    for i in 0..count {
        content.push_str(&format!("First{},Last{}\n", i, i));
    }
    content
}

/// Fails the `fail_on`-th write call (1-based) with an outage, once
pub struct FlakyWriter {
    inner: PersonStoreWriter,
    calls: AtomicUsize,
    fail_on: usize,
    tripped: AtomicBool,
}

impl FlakyWriter {
    pub fn new(store: Arc<InMemoryPersonStore>, fail_on: usize) -> Self {
        Self {
            inner: PersonStoreWriter::new(store),
            calls: AtomicUsize::new(0),
            fail_on,
            tripped: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ItemWriter<Person> for FlakyWriter {
    async fn open(&self) -> Result<(), WriteError> {
        self.inner.open().await
    }

    async fn write(&self, items: &[Person]) -> Result<(), WriteError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on && !self.tripped.swap(true, Ordering::SeqCst) {
            return Err(WriteError::Unavailable("connection reset".to_string()));
        }
        self.inner.write(items).await
    }
}

/// Holds the first write until released
pub struct GateWriter {
    inner: PersonStoreWriter,
    first: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl GateWriter {
    pub fn new(store: Arc<InMemoryPersonStore>) -> Self {
        Self {
            inner: PersonStoreWriter::new(store),
            first: AtomicBool::new(true),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl ItemWriter<Person> for GateWriter {
    async fn open(&self) -> Result<(), WriteError> {
        self.inner.open().await
    }

    async fn write(&self, items: &[Person]) -> Result<(), WriteError> {
        if self.first.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.write(items).await
    }
}

/// The import job wired with a custom writer
pub fn import_job_with_writer(
    input: &NamedTempFile,
    chunk_size: usize,
    skip_limit: u64,
    writer: Arc<dyn ItemWriter<Person>>,
) -> Job {
    let step = ChunkStep::new(
        IMPORT_PERSONS_STEP,
        ChunkConfig::new(chunk_size, skip_limit),
        Arc::new(CsvPersonReaderFactory::new(input.path())),
        Arc::new(PersonItemProcessor),
        writer,
    );

    Job::builder(IMPORT_PERSONS_JOB)
        .step(Arc::new(step))
        .listener(Arc::new(LoggingJobListener))
        .validator(ParametersValidator::new().require("timestamp").allow("startTime"))
        .build()
}
