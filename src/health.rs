use anyhow::{Context, Result};
use log::{info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

const OK_RESPONSE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\nConnection: close\r\n\r\nOK";
const NOT_FOUND_RESPONSE: &str =
    "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: 9\r\nConnection: close\r\n\r\nNot Found";

/// Response for a raw HTTP request head.
pub fn respond(request: &str) -> &'static str {
    let mut parts = request.lines().next().unwrap_or_default().split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET" | "HEAD"), Some(path)) if path.split('?').next() == Some("/health") => OK_RESPONSE,
        _ => NOT_FOUND_RESPONSE,
    }
}

async fn serve_connection(mut stream: TcpStream) -> Result<()> {
    let mut buf = [0u8; 1024];
    let read = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..read]);
    stream.write_all(respond(&request).as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

pub async fn bind(port: u16) -> Result<TcpListener> {
    TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind health check on port {port}"))
}

pub async fn health_server(listener: TcpListener, cancel_token: CancellationToken) {
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP server starting on {addr}");
    }

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    tokio::spawn(async move {
                        if let Err(err) = serve_connection(stream).await {
                            warn!("health check connection failed: {err}");
                        }
                    });
                }
                Err(err) => warn!("HTTP server error: {err}"),
            },
            _ = cancel_token.cancelled() => {
                info!("HTTP server shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_health_path_is_ok() {
        assert_eq!(respond("GET /health HTTP/1.1\r\nHost: x\r\n\r\n"), OK_RESPONSE);
        assert_eq!(respond("GET /health?probe=1 HTTP/1.1\r\n"), OK_RESPONSE);
        assert_eq!(respond("GET / HTTP/1.1\r\n"), NOT_FOUND_RESPONSE);
        assert_eq!(respond("POST /health HTTP/1.1\r\n"), NOT_FOUND_RESPONSE);
        assert_eq!(respond(""), NOT_FOUND_RESPONSE);
    }

    #[tokio::test]
    async fn serves_health_over_tcp() {
        let listener = bind(0).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let cancel_token = CancellationToken::new();
        let server = tokio::spawn(health_server(listener, cancel_token.clone()));

        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream.write_all(b"GET /health HTTP/1.1\r\n\r\n").await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("OK"));

        cancel_token.cancel();
        server.await.unwrap();
    }
}
