pub mod run_import;
pub mod stop_execution;

pub use run_import::RunImportCommand;
pub use stop_execution::StopExecutionCommand;
