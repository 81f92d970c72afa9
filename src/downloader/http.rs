use std::io;
use std::path::Path;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Client;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::{debug, info};
use url::Url;

use super::{Completion, Downloader};
use crate::config::PreloadConfig;
use crate::error::TransferError;

/// Plain GET downloader on top of a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    chunk_size: usize,
}

impl HttpDownloader {
    pub fn new(client: Client, chunk_size: usize) -> Self {
        Self {
            client,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Build a client with the configured timeouts and user agent.
    ///
    /// There is no total request timeout; a slow but live transfer of a large
    /// file is only cut off by the read timeout between two reads.
    pub fn from_config(config: &PreloadConfig) -> Result<Self, TransferError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .build()?;
        Ok(Self::new(client, config.chunk_size))
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(
        &self,
        url: &Url,
        dest: &Path,
        on_progress: &mut (dyn FnMut(Completion) + Send),
    ) -> Result<(), TransferError> {
        info!(url = %url, path = ?dest, "Start downloading");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status(status));
        }

        let content_length = response.content_length().filter(|len| *len > 0);
        let body = response.bytes_stream().map_err(io::Error::other);
        let mut reader = StreamReader::new(body);
        let mut file = fs::File::create(dest).await?;

        match content_length {
            Some(total) => {
                copy_with_progress(&mut reader, &mut file, total, self.chunk_size, on_progress)
                    .await?;
            }
            None => {
                on_progress(Completion::Unknown(0.0));
                let copied = tokio::io::copy(&mut reader, &mut file).await?;
                debug!(url = %url, bytes = copied, "copied body of unknown length");
                on_progress(Completion::Unknown(1.0));
            }
        }

        file.flush().await?;
        Ok(())
    }
}

/// Copy `reader` into `writer` in chunks of `chunk_size`, reporting the
/// written fraction of `total` after every chunk.
async fn copy_with_progress<R, W>(
    reader: &mut R,
    writer: &mut W,
    total: u64,
    chunk_size: usize,
    on_progress: &mut (dyn FnMut(Completion) + Send),
) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; chunk_size];
    let mut written: u64 = 0;

    loop {
        let count = read_chunk(reader, &mut buffer).await?;
        if count == 0 {
            break;
        }

        writer.write_all(&buffer[..count]).await?;
        written += count as u64;

        let fraction = (written as f64 / total as f64).min(1.0) as f32;
        on_progress(Completion::Known(fraction));
    }

    Ok(written)
}

/// Fill `buffer` as far as the stream allows. Returns 0 only at end of stream.
async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let n = reader.read(&mut buffer[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_of_len, chunked_body, client, serve, unreachable_url};
    use axum::{Router, http::StatusCode, routing::get};
    use tempfile::TempDir;

    fn downloader(chunk_size: usize) -> HttpDownloader {
        HttpDownloader::new(client(), chunk_size)
    }

    #[tokio::test]
    async fn test_known_length_reports_each_chunk() {
        let app = Router::new().route("/file", get(|| async { body_of_len(200_000) }));
        let base = serve(app).await;
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.tmp");

        let mut seen = Vec::new();
        downloader(64 * 1024)
            .fetch(&base.join("/file").unwrap(), &dest, &mut |c| seen.push(c))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), body_of_len(200_000));
        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|c| !c.is_indeterminate()));
        assert!(seen.windows(2).all(|w| w[0].fraction() < w[1].fraction()));
        assert_eq!(seen.last().unwrap().fraction(), 1.0);
        assert!((seen[0].fraction() - 65536.0 / 200_000.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_unknown_length_is_indeterminate() {
        let app = Router::new().route("/stream", get(|| async { chunked_body(10, 50_000) }));
        let base = serve(app).await;
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("stream.tmp");

        let mut seen = Vec::new();
        downloader(64 * 1024)
            .fetch(&base.join("/stream").unwrap(), &dest, &mut |c| seen.push(c))
            .await
            .unwrap();

        assert_eq!(seen, vec![Completion::Unknown(0.0), Completion::Unknown(1.0)]);
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 500_000);
    }

    #[tokio::test]
    async fn test_error_status_is_transfer_error() {
        let app = Router::new().route("/gone", get(|| async { (StatusCode::NOT_FOUND, "nope") }));
        let base = serve(app).await;
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("gone.tmp");

        let result = downloader(1024)
            .fetch(&base.join("/gone").unwrap(), &dest, &mut |_| {})
            .await;

        assert!(matches!(result, Err(TransferError::Status(s)) if s == StatusCode::NOT_FOUND));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let url = unreachable_url().await;
        let dir = TempDir::new().unwrap();

        let result = downloader(1024)
            .fetch(&url, &dir.path().join("x.tmp"), &mut |_| {})
            .await;

        assert!(matches!(result, Err(TransferError::Http(_))));
    }

    #[tokio::test]
    async fn test_small_chunks_keep_order() {
        let mut input: &[u8] = &[7u8; 10];
        let mut output = Vec::new();
        let mut seen = Vec::new();

        let written = copy_with_progress(&mut input, &mut output, 10, 4, &mut |c| seen.push(c))
            .await
            .unwrap();

        assert_eq!(written, 10);
        assert_eq!(output, vec![7u8; 10]);
        assert_eq!(
            seen,
            vec![
                Completion::Known(0.4),
                Completion::Known(0.8),
                Completion::Known(1.0)
            ]
        );
    }
}
