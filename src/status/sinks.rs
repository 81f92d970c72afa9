use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use super::{ProgressEvent, StatusEvent, StatusSink};
use crate::preload::{JobId, Summary};

/// Renders status through `tracing`.
#[derive(Debug, Default)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn started(&mut self, job_id: JobId, total: usize) {
        info!(job_id = %job_id, total, "Preloading started");
    }

    fn progress(&mut self, event: &ProgressEvent) {
        info!(
            job_id = %event.job_id,
            item = event.index + 1,
            total = event.total,
            percent = (event.overall() * 100.0).round() as u32,
            "{}",
            event.message
        );
    }

    fn finished(&mut self, summary: &Summary) {
        if summary.job_failed {
            warn!(job_id = %summary.job_id, "{}: {}", summary.title(), summary.describe());
        } else {
            info!(job_id = %summary.job_id, "{}: {}", summary.title(), summary.describe());
        }
    }
}

/// Forwards every event over an unbounded channel. A closed receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<StatusEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: StatusEvent) {
        let _ = self.tx.send(event);
    }
}

impl StatusSink for ChannelSink {
    fn started(&mut self, job_id: JobId, total: usize) {
        self.send(StatusEvent::Started { job_id, total });
    }

    fn progress(&mut self, event: &ProgressEvent) {
        self.send(StatusEvent::Progress(event.clone()));
    }

    fn finished(&mut self, summary: &Summary) {
        self.send(StatusEvent::Finished(summary.clone()));
    }
}

/// Keeps only the latest event, for pollers such as the control server.
#[derive(Debug, Clone)]
pub struct WatchSink {
    tx: watch::Sender<Option<StatusEvent>>,
}

impl WatchSink {
    pub fn channel() -> (Self, watch::Receiver<Option<StatusEvent>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }
}

impl StatusSink for WatchSink {
    fn started(&mut self, job_id: JobId, total: usize) {
        self.tx
            .send_replace(Some(StatusEvent::Started { job_id, total }));
    }

    fn progress(&mut self, event: &ProgressEvent) {
        self.tx
            .send_replace(Some(StatusEvent::Progress(event.clone())));
    }

    fn finished(&mut self, summary: &Summary) {
        self.tx
            .send_replace(Some(StatusEvent::Finished(summary.clone())));
    }
}
