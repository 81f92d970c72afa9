use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::error::TransferError;

mod http;

pub use http::HttpDownloader;

/// Completion of a single transfer, as reported to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// `bytes_written / content_length` of a response that declared its length.
    Known(f32),
    /// No length was declared: reported once as `0.0` before the body is read
    /// and once as `1.0` after it drained.
    Unknown(f32),
}

impl Completion {
    pub fn fraction(&self) -> f32 {
        match *self {
            Completion::Known(f) | Completion::Unknown(f) => f,
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Completion::Unknown(_))
    }
}

/// Streams one remote resource into a local file.
///
/// Implementations must call `on_progress` synchronously, in read order, and
/// must leave cleanup of a partially written `dest` to the caller.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn fetch(
        &self,
        url: &Url,
        dest: &Path,
        on_progress: &mut (dyn FnMut(Completion) + Send),
    ) -> Result<(), TransferError>;
}
