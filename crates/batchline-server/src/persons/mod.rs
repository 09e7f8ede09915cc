//! Person import: CSV rows in, persons with derived emails out

pub mod job;
pub mod model;
pub mod processor;
pub mod reader;
pub mod writer;

pub use job::{fresh_parameters, import_persons_job, IMPORT_PERSONS_JOB, IMPORT_PERSONS_STEP};
pub use model::{Person, PersonRow, EMAIL_DOMAIN};
pub use processor::PersonItemProcessor;
pub use reader::{CsvPersonReader, CsvPersonReaderFactory};
pub use writer::PersonStoreWriter;
