use std::time::Duration;

use tokio::time::Instant;

use super::{ProgressEvent, StatusSink};
use crate::preload::{JobId, Summary};

/// Rate-limits `progress` updates to an expensive sink.
///
/// A progress update is forwarded only when at least `interval` has passed
/// since the last forwarded one, including one forwarded during an earlier
/// job. `started` and `finished` always pass.
#[derive(Debug)]
pub struct Throttled<S> {
    inner: S,
    interval: Duration,
    last_shown: Option<Instant>,
}

impl<S: StatusSink> Throttled<S> {
    pub fn new(inner: S, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            last_shown: None,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: StatusSink> StatusSink for Throttled<S> {
    fn started(&mut self, job_id: JobId, total: usize) {
        self.inner.started(job_id, total);
    }

    fn progress(&mut self, event: &ProgressEvent) {
        let now = Instant::now();
        match self.last_shown {
            Some(last) if now.duration_since(last) < self.interval => {}
            _ => {
                self.last_shown = Some(now);
                self.inner.progress(event);
            }
        }
    }

    fn finished(&mut self, summary: &Summary) {
        self.inner.finished(summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::Completion;
    use crate::status::{ChannelSink, StatusEvent};
    use tokio::sync::mpsc;
    use tokio::time::advance;

    fn progress(index: usize) -> ProgressEvent {
        ProgressEvent {
            job_id: JobId::from(1),
            uri: format!("http://example.com/{index}"),
            index,
            total: 100,
            completion: Completion::Known(0.5),
            message: String::new(),
            canceling: false,
        }
    }

    fn summary() -> Summary {
        Summary {
            job_id: JobId::from(1),
            downloaded: 1,
            failed: 0,
            skipped: 0,
            canceled: false,
            job_failed: false,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<StatusEvent>) -> Vec<StatusEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_forwards_only_first() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = Throttled::new(ChannelSink::new(tx), Duration::from_millis(500));

        for i in 0..1000 {
            sink.progress(&progress(i));
        }

        let events = drain(&mut rx);
        assert_eq!(events, vec![StatusEvent::Progress(progress(0))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forwarded_updates_are_spaced() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = Throttled::new(ChannelSink::new(tx), Duration::from_millis(500));

        // one update every 10ms for 2.5s
        for i in 0..250 {
            sink.progress(&progress(i));
            advance(Duration::from_millis(10)).await;
        }

        let indices: Vec<usize> = drain(&mut rx)
            .into_iter()
            .map(|event| match event {
                StatusEvent::Progress(p) => p.index,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();

        assert_eq!(indices, vec![0, 50, 100, 150, 200]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_boundaries_never_suppressed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = Throttled::new(ChannelSink::new(tx), Duration::from_millis(500));

        sink.started(JobId::from(1), 100);
        sink.progress(&progress(0));
        sink.progress(&progress(1));
        sink.finished(&summary());

        assert_eq!(
            drain(&mut rx),
            vec![
                StatusEvent::Started {
                    job_id: JobId::from(1),
                    total: 100
                },
                StatusEvent::Progress(progress(0)),
                StatusEvent::Finished(summary()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_carries_across_jobs() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = Throttled::new(ChannelSink::new(tx), Duration::from_millis(500));

        sink.progress(&progress(0));
        sink.finished(&summary());
        sink.started(JobId::from(2), 100);
        sink.progress(&progress(1));
        advance(Duration::from_millis(500)).await;
        sink.progress(&progress(2));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], StatusEvent::Progress(progress(0)));
        assert!(matches!(events[2], StatusEvent::Started { .. }));
        assert_eq!(events[3], StatusEvent::Progress(progress(2)));
    }
}
