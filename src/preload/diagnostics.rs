use tracing::error;

use crate::error::JobError;

/// Receives job-level failures, e.g. a crash reporter.
pub trait Diagnostics: Send + Sync {
    fn report(&self, error: &JobError);
}

#[derive(Debug, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&self, error: &JobError) {
        error!(error = %error, "preload job failed");
    }
}
