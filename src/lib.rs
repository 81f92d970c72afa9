//! Batch preloading of remote resources into a flat on-disk cache.
//!
//! A [`preload::Preloader`] runs one job at a time: for every resource it
//! either touches the cached copy or streams it into a temporary file and
//! renames it into place. Progress flows to a [`status::StatusSink`], usually
//! wrapped in a [`status::Throttled`] limiter.

pub mod cache;
pub mod config;
pub mod downloader;
pub mod error;
pub mod preload;
pub mod server;
pub mod status;

#[cfg(test)]
mod test_support;
