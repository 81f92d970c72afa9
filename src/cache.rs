//! Flat on-disk cache of preloaded resources.
//!
//! Every resource identifier maps to one file directly inside the cache
//! directory. Downloads are written to a `.tmp` sibling first and only become
//! visible under their final name through [`CacheStore::commit`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

use regex::Regex;
use tokio::fs;
use tracing::{debug, info, warn};

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9a-zA-Z.]+").expect("static regex is valid"));

const TEMP_SUFFIX: &str = ".tmp";

/// File name for a resource identifier. Runs of characters outside
/// `[0-9a-zA-Z.]` collapse into a single `_`; distinct identifiers can collide.
pub fn cache_file_name(id: &str) -> String {
    UNSAFE_CHARS.replace_all(id, "_").into_owned()
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Wrap an existing cache directory without touching the filesystem.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the cache directory if needed. An existing directory is fine.
    pub async fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        if !fs::try_exists(&dir).await? {
            fs::create_dir_all(&dir).await?;
            info!(path = ?dir, "cache directory created");
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(cache_file_name(id))
    }

    pub fn temp_path_for(&self, id: &str) -> PathBuf {
        let mut name = cache_file_name(id);
        name.push_str(TEMP_SUFFIX);
        self.dir.join(name)
    }

    pub async fn exists(&self, id: &str) -> bool {
        fs::try_exists(self.path_for(id)).await.unwrap_or(false)
    }

    /// Refresh the modification time of a cached entry. Failures are only logged.
    pub async fn touch(&self, id: &str) {
        let path = self.path_for(id);
        if let Err(e) = touch_file(&path).await {
            warn!(path = ?path, error = %e, "Could not touch cached file");
        }
    }

    /// Move a finished download to its final name.
    pub async fn commit(&self, temp: &Path, target: &Path) -> io::Result<()> {
        fs::rename(temp, target).await?;
        debug!(path = ?target, "committed cache entry");
        Ok(())
    }

    /// Best-effort removal of a leftover temporary file.
    pub async fn discard(&self, temp: &Path) {
        match fs::remove_file(temp).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?temp, error = %e, "Could not remove temporary file"),
        }
    }
}

async fn touch_file(path: &Path) -> io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        std::fs::File::open(&path)?.set_modified(SystemTime::now())
    })
    .await
    .map_err(io::Error::other)?
}
