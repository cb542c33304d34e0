use reqwest::{Client, RequestBuilder};
use std::time::Duration;

use crate::error::{IngestError, Result};

/// Shared HTTP client for the external sources. The timeout bounds the
/// whole request so a stalled upstream cannot hang a run.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .map_err(|e| IngestError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Send the request and return the raw body of a successful response.
///
/// Transport failures and non-success statuses are `SourceUnavailable`.
pub async fn fetch_body(request: RequestBuilder, source_name: &'static str) -> Result<Vec<u8>> {
    let response = request
        .header("accept", "application/json")
        .send()
        .await
        .map_err(|e| IngestError::unavailable(source_name, e))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(IngestError::unavailable(
            source_name,
            format!("API error {}: {}", status, error_text),
        ));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| IngestError::unavailable(source_name, e))?;

    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response on a local port
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let client = build_client(Duration::from_secs(5)).unwrap();

        let err = fetch_body(client.get("http://127.0.0.1:1/coins/list"), "CoinGecko")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IngestError::SourceUnavailable { source_name: "CoinGecko", .. }
        ));
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let url = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\nboom",
        )
        .await;
        let client = build_client(Duration::from_secs(5)).unwrap();

        let err = fetch_body(client.get(format!("{}/api/status", url)), "Pool status")
            .await
            .unwrap_err();

        match err {
            IngestError::SourceUnavailable { source_name, message } => {
                assert_eq!(source_name, "Pool status");
                assert!(message.contains("500"), "unexpected message: {}", message);
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
        )
        .await;
        let client = build_client(Duration::from_secs(5)).unwrap();

        let body = fetch_body(client.get(url), "Pool status").await.unwrap();
        assert_eq!(body, b"{}");
    }
}
