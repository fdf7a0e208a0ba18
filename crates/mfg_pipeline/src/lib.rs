//! Ingestion job state machine: `create_job`/`cancel`/`commit` plus the
//! background PARSING/VALIDATING/COMMITTING stages that carry a job
//! from UPLOADED through to COMPLETED or FAILED.

pub mod cancel;
pub mod commit;
pub mod error;
pub mod runner;
pub mod stages;
pub mod upload;

pub use cancel::CancellationToken;
pub use error::{PipelineError, Result};
pub use runner::{ErrorEntry, PipelineRunner};
pub use upload::{CreateJobOptions, UploadFile};
