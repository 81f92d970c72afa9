use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Identifies one run of the preloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    /// A fresh id: wall-clock milliseconds, bumped so ids never repeat or go
    /// backwards within the process.
    pub fn next() -> Self {
        static LAST: AtomicU64 = AtomicU64::new(0);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let previous = LAST
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        JobId(now.max(previous + 1))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        JobId(value)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Final outcome of a job. Emitted exactly once per job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub job_id: JobId,
    pub downloaded: usize,
    pub failed: usize,
    /// Items that were already cached and only touched.
    pub skipped: usize,
    pub canceled: bool,
    pub job_failed: bool,
}

impl Summary {
    pub(crate) fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            downloaded: 0,
            failed: 0,
            skipped: 0,
            canceled: false,
            job_failed: false,
        }
    }

    /// Number of items the loop got to before it stopped.
    pub fn processed(&self) -> usize {
        self.downloaded + self.failed + self.skipped
    }

    pub fn title(&self) -> &'static str {
        if self.job_failed {
            "Preloading failed"
        } else {
            "Preloading"
        }
    }

    /// Human readable outcome, e.g. `"3 files downloaded, 1 failed, canceled"`.
    pub fn describe(&self) -> String {
        let mut parts = vec![format!("{} files downloaded", self.downloaded)];
        if self.failed > 0 {
            parts.push(format!("{} failed", self.failed));
        }
        if self.canceled {
            parts.push("canceled".to_string());
        }
        parts.join(", ")
    }
}

/// One-way cancellation flag of a single job.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Tracks which job is current so that cancel requests can be matched
/// against it. Cheap to clone; all clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct JobControl {
    current: Arc<Mutex<Option<(JobId, CancelFlag)>>>,
}

impl JobControl {
    /// Make `job_id` the current job and hand out its fresh cancel flag.
    pub(crate) fn begin(&self, job_id: JobId) -> CancelFlag {
        let flag = CancelFlag::default();
        *self.current.lock() = Some((job_id, flag.clone()));
        flag
    }

    pub(crate) fn end(&self, job_id: JobId) {
        let mut current = self.current.lock();
        if matches!(*current, Some((id, _)) if id == job_id) {
            *current = None;
        }
    }

    pub fn current(&self) -> Option<JobId> {
        self.current.lock().as_ref().map(|(id, _)| *id)
    }

    /// Request cancellation of `job_id`. Returns `false` and does nothing
    /// when `job_id` is not the running job.
    pub fn cancel(&self, job_id: JobId) -> bool {
        match self.current.lock().as_ref() {
            Some((id, flag)) if *id == job_id => {
                flag.cancel();
                true
            }
            _ => false,
        }
    }
}
