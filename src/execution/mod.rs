//! Pipeline execution

pub mod engine;
pub mod executor;
pub mod interrupt;
pub mod process;
pub mod result;

pub use engine::{EventHandler, ExecutionEvent, PipelineRunner};
pub use executor::StepExecutor;
pub use interrupt::Interrupt;
pub use process::{DryRunRunner, Invocation, ProcessError, ProcessOutput, ProcessRunner, SubprocessRunner};
pub use result::{FailureReport, PipelineError, PipelineResult, StepRecord, TaskRecord};
