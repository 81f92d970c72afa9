use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::executor::Preloader;
use super::job::{JobControl, JobId};
use crate::downloader::Downloader;
use crate::error::WorkerStopped;
use crate::status::StatusSink;

struct StartJob {
    job_id: JobId,
    uris: Vec<String>,
}

/// Control side of a running [`spawn`]ed worker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    commands: mpsc::UnboundedSender<StartJob>,
    control: JobControl,
}

impl WorkerHandle {
    /// Queue a job. Jobs run one after another in submission order.
    ///
    /// Returns `Ok(None)` for an empty list, which never becomes a job.
    pub fn submit(&self, uris: Vec<String>) -> Result<Option<JobId>, WorkerStopped> {
        if uris.is_empty() {
            return Ok(None);
        }
        let job_id = JobId::next();
        self.commands
            .send(StartJob { job_id, uris })
            .map_err(|_| WorkerStopped)?;
        debug!(job_id = %job_id, "job queued");
        Ok(Some(job_id))
    }

    /// Cancel `job_id` if it is the job currently running. Queued jobs and
    /// finished jobs are not affected.
    pub fn cancel(&self, job_id: JobId) -> bool {
        let accepted = self.control.cancel(job_id);
        if accepted {
            info!(job_id = %job_id, "cancel requested");
        } else {
            debug!(job_id = %job_id, "ignoring cancel for job that is not running");
        }
        accepted
    }

    pub fn current(&self) -> Option<JobId> {
        self.control.current()
    }
}

/// Start the background worker that owns `preloader` and `sink`.
///
/// The worker exits once every [`WorkerHandle`] has been dropped and the
/// queue is drained.
pub fn spawn<D, S>(preloader: Preloader<D>, mut sink: S) -> (WorkerHandle, JoinHandle<()>)
where
    D: Downloader + 'static,
    S: StatusSink + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<StartJob>();
    let handle = WorkerHandle {
        commands: tx,
        control: preloader.control(),
    };

    let task = tokio::spawn(async move {
        while let Some(StartJob { job_id, uris }) = rx.recv().await {
            preloader.run(job_id, &uris, &mut sink).await;
        }
        debug!("preload worker stopped");
    });

    (handle, task)
}
