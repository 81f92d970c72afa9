//! Status events emitted by a running job and the sinks that consume them.

use serde::Serialize;

use crate::downloader::Completion;
use crate::preload::{JobId, Summary};

mod sinks;
mod throttle;

pub use sinks::{ChannelSink, LogSink, WatchSink};
pub use throttle::Throttled;

/// Progress of one item inside a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub uri: String,
    /// Zero-based position of the item in the job.
    pub index: usize,
    pub total: usize,
    pub completion: Completion,
    pub message: String,
    /// Cancellation was requested; the current item still finishes.
    pub canceling: bool,
}

impl ProgressEvent {
    /// Position of the whole job in `[0, 1]`.
    pub fn overall(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        (self.index as f32 + self.completion.fraction()) / self.total as f32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatusEvent {
    Started { job_id: JobId, total: usize },
    Progress(ProgressEvent),
    Finished(Summary),
}

/// Receiver of job status. Calls arrive on the worker, one at a time.
pub trait StatusSink: Send {
    fn started(&mut self, job_id: JobId, total: usize);

    fn progress(&mut self, event: &ProgressEvent);

    fn finished(&mut self, summary: &Summary);
}

impl<S: StatusSink + ?Sized> StatusSink for &mut S {
    fn started(&mut self, job_id: JobId, total: usize) {
        (**self).started(job_id, total)
    }

    fn progress(&mut self, event: &ProgressEvent) {
        (**self).progress(event)
    }

    fn finished(&mut self, summary: &Summary) {
        (**self).finished(summary)
    }
}

impl<S: StatusSink + ?Sized> StatusSink for Box<S> {
    fn started(&mut self, job_id: JobId, total: usize) {
        (**self).started(job_id, total)
    }

    fn progress(&mut self, event: &ProgressEvent) {
        (**self).progress(event)
    }

    fn finished(&mut self, summary: &Summary) {
        (**self).finished(summary)
    }
}

/// Fan out to two sinks.
impl<A: StatusSink, B: StatusSink> StatusSink for (A, B) {
    fn started(&mut self, job_id: JobId, total: usize) {
        self.0.started(job_id, total);
        self.1.started(job_id, total);
    }

    fn progress(&mut self, event: &ProgressEvent) {
        self.0.progress(event);
        self.1.progress(event);
    }

    fn finished(&mut self, summary: &Summary) {
        self.0.finished(summary);
        self.1.finished(summary);
    }
}
