use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use topokit_bridge::MetricsClient;
use topokit_core::FetchError;

/// Serve one canned HTTP response and hand back the request line
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        String::from_utf8_lossy(&request)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    });

    (base, handle)
}

#[tokio::test]
async fn test_fetch_decodes_metrics() {
    let (base, server) = serve_once(
        "200 OK",
        r#"{"materialSavings": 23.5, "timeReduction": 12, "qualityImprovement": 7.25}"#,
    )
    .await;

    let client = MetricsClient::new(base, Duration::from_secs(5)).unwrap();
    let record = client.fetch("42").await.unwrap();

    assert_eq!(record.values(), [23.5, 12.0, 7.25]);
    assert_eq!(server.await.unwrap(), "GET /api/metrics/42 HTTP/1.1");
}

#[tokio::test]
async fn test_non_2xx_is_failure() {
    let (base, _server) = serve_once("404 Not Found", r#"{"error": "no such project"}"#).await;

    let client = MetricsClient::new(base, Duration::from_secs(5)).unwrap();
    let err = client.fetch("9").await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_malformed_body_is_decode_failure() {
    let (base, _server) = serve_once("200 OK", r#"{"materialSavings": "lots"}"#).await;

    let client = MetricsClient::new(base, Duration::from_secs(5)).unwrap();
    let err = client.fetch("1").await.unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn test_connection_refused_is_network_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = MetricsClient::new(base, Duration::from_secs(5)).unwrap();
    let err = client.fetch("1").await.unwrap_err();
    assert!(matches!(err, FetchError::Network { .. }));
}
