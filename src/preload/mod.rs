//! The preloading engine: runs jobs that fetch a list of resources into the cache.

mod diagnostics;
mod executor;
mod job;
pub mod worker;

pub use diagnostics::{Diagnostics, LogDiagnostics};
pub use executor::Preloader;
pub use job::{CancelFlag, JobControl, JobId, Summary};
pub use worker::{WorkerHandle, spawn};
