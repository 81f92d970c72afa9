//! Shared helpers for in-process HTTP tests.

use std::net::SocketAddr;

use axum::{Router, body::Body};
use futures::stream;
use tokio::net::TcpListener;
use url::Url;

/// HTTP client that never routes local test traffic through a proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: Router) -> Url {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{}/", addr)).unwrap()
}

/// A URL on a local port nobody listens on.
pub async fn unreachable_url() -> Url {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{}/missing", addr)).unwrap()
}

/// Deterministic payload of `len` bytes; served as-is it carries a content length.
pub fn body_of_len(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// A streamed body without content length.
pub fn chunked_body(parts: usize, len: usize) -> Body {
    Body::from_stream(stream::iter(
        (0..parts).map(move |i| Ok::<_, std::io::Error>(vec![i as u8; len])),
    ))
}
