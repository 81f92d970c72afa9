use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{info, warn};
use url::Url;

use super::diagnostics::{Diagnostics, LogDiagnostics};
use super::job::{CancelFlag, JobControl, JobId, Summary};
use crate::cache::CacheStore;
use crate::downloader::{Completion, Downloader};
use crate::error::{JobError, TransferError};
use crate::status::{ProgressEvent, StatusSink};

enum ItemOutcome {
    Cached,
    Downloaded,
    Failed,
}

/// Fetches batches of resources into the cache, one item at a time.
pub struct Preloader<D> {
    cache: CacheStore,
    downloader: D,
    control: JobControl,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<D: Downloader> Preloader<D> {
    pub fn new(cache: CacheStore, downloader: D) -> Self {
        Self {
            cache,
            downloader,
            control: JobControl::default(),
            diagnostics: Arc::new(LogDiagnostics),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Handle for cancelling the running job from another task.
    pub fn control(&self) -> JobControl {
        self.control.clone()
    }

    pub fn cancel(&self, job_id: JobId) -> bool {
        self.control.cancel(job_id)
    }

    /// Run one job over `uris` in order.
    ///
    /// Returns `None` without emitting anything when `uris` is empty.
    /// Otherwise `started` is emitted first and `finished` exactly once at
    /// the end, whether the job completed, was canceled or failed.
    pub async fn run<S>(&self, job_id: JobId, uris: &[String], sink: &mut S) -> Option<Summary>
    where
        S: StatusSink + ?Sized,
    {
        if uris.is_empty() {
            return None;
        }

        let canceled = self.control.begin(job_id);
        info!(job_id = %job_id, items = uris.len(), "Start preloading");
        sink.started(job_id, uris.len());

        let mut summary = Summary::new(job_id);
        let result = AssertUnwindSafe(self.process_all(job_id, uris, &canceled, &mut summary, sink))
            .catch_unwind()
            .await;

        let error = match result {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(error),
            Err(panic) => Some(JobError::Panicked(panic_message(panic))),
        };
        if let Some(error) = error {
            self.diagnostics.report(&error);
            summary.job_failed = true;
        }

        self.control.end(job_id);
        summary.canceled = canceled.is_canceled();

        info!(job_id = %job_id, "Finished preloading");
        sink.finished(&summary);
        Some(summary)
    }

    async fn process_all<S>(
        &self,
        job_id: JobId,
        uris: &[String],
        canceled: &CancelFlag,
        summary: &mut Summary,
        sink: &mut S,
    ) -> Result<(), JobError>
    where
        S: StatusSink + ?Sized,
    {
        for (index, uri) in uris.iter().enumerate() {
            if canceled.is_canceled() {
                info!(job_id = %job_id, remaining = uris.len() - index, "job canceled");
                break;
            }

            let url = Url::parse(uri).map_err(|source| JobError::InvalidResource {
                uri: uri.clone(),
                source,
            })?;

            let outcome = self
                .process_item(job_id, index, uris.len(), uri, &url, canceled, sink)
                .await;
            match outcome {
                ItemOutcome::Cached => summary.skipped += 1,
                ItemOutcome::Downloaded => summary.downloaded += 1,
                ItemOutcome::Failed => summary.failed += 1,
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_item<S>(
        &self,
        job_id: JobId,
        index: usize,
        total: usize,
        uri: &str,
        url: &Url,
        canceled: &CancelFlag,
        sink: &mut S,
    ) -> ItemOutcome
    where
        S: StatusSink + ?Sized,
    {
        let target = self.cache.path_for(uri);

        if self.cache.exists(uri).await {
            info!(path = ?target, "File already exists");
            self.cache.touch(uri).await;
            return ItemOutcome::Cached;
        }

        let temp = self.cache.temp_path_for(uri);
        let mut on_progress = |completion: Completion| {
            let canceling = canceled.is_canceled();
            let message = if canceling {
                "Finishing".to_string()
            } else {
                format!("Fetching {}", url.path())
            };
            sink.progress(&ProgressEvent {
                job_id,
                uri: uri.to_string(),
                index,
                total,
                completion,
                message,
                canceling,
            });
        };

        let result: Result<(), TransferError> =
            match self.downloader.fetch(url, &temp, &mut on_progress).await {
                Ok(()) => self.cache.commit(&temp, &target).await.map_err(Into::into),
                Err(e) => Err(e),
            };

        match result {
            Ok(()) => ItemOutcome::Downloaded,
            Err(e) => {
                warn!(uri, error = %e, "Could not preload resource");
                self.cache.discard(&temp).await;
                ItemOutcome::Failed
            }
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
