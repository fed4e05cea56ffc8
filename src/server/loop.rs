// Server loop module
// Accepts connections until a shutdown signal arrives, then drains in-flight ones

use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop until `shutdown` resolves
///
/// Returns the number of connections that were still open when shutdown began,
/// after all of them have finished.
pub async fn run<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> usize
where
    F: Future<Output = ()>,
{
    let active_connections = Arc::new(AtomicUsize::new(0));
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                logger::log_info(&format!(
                    "Shutdown requested, draining {} connections",
                    tasks.len()
                ));
                break;
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(
                        stream,
                        peer_addr,
                        &state,
                        &active_connections,
                        &mut tasks,
                        stop_rx.clone(),
                    ),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            // Reap finished connections so the set does not grow unbounded
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    drop(listener);
    let drained = tasks.len();
    let _ = stop_tx.send(true);
    while tasks.join_next().await.is_some() {}
    logger::log_server_stopped(drained);
    drained
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Credential};
    use crate::server::create_listener;
    use crate::test_support::StubUpstream;
    use crate::upstream::ProviderTable;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn state(dir: &TempDir) -> Arc<AppState> {
        state_with(dir, |_| {})
    }

    fn state_with(dir: &TempDir, tweak: impl FnOnce(&mut Config)) -> Arc<AppState> {
        let mut config = Config::default();
        config.upstream.system_proxy = false;
        config.storage.data_dir = dir.path().to_string_lossy().into_owned();
        config.static_files.root = dir.path().to_string_lossy().into_owned();
        config.logging.access_log = false;
        tweak(&mut config);
        let providers =
            ProviderTable::with_credentials(&config.upstream, |_| Credential::new("sk-test"));
        Arc::new(AppState::with_providers(config, providers).unwrap())
    }

    #[tokio::test]
    async fn test_serves_requests_and_stops_on_signal() {
        let dir = TempDir::new().unwrap();
        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(run(listener, state(&dir), async {
            let _ = rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /api/check HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();
        assert!(reply.starts_with("HTTP/1.1 200"));
        assert!(reply.contains(r#""configured":true"#));

        tx.send(()).unwrap();
        let drained = tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(drained <= 1);
    }

    #[tokio::test]
    async fn test_idle_keep_alive_connection_closes_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(run(listener, state(&dir), async {
            let _ = rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /api/check HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut buf = [0u8; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0);

        tx.send(()).unwrap();
        // Without graceful close this would wait out the connection timeout
        tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_late_request_on_reused_connection_completes() {
        let dir = TempDir::new().unwrap();
        let stub = StubUpstream::start_delayed(
            200,
            r#"{"choices":[]}"#,
            std::time::Duration::from_millis(1500),
        )
        .await;
        let url = stub.url();
        let app = state_with(&dir, |cfg| {
            cfg.upstream.url = url;
            cfg.upstream.routes.clear();
            cfg.upstream.timeout_secs = 2;
            cfg.performance.connection_timeout = 3;
        });
        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(run(listener, app, async {
            let _ = rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /api/check HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200"));

        // The connection has now been open for most of connection_timeout
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;

        let body = r#"{"messages":[]}"#;
        let request = format!(
            "POST /api/chat HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let n = tokio::time::timeout(std::time::Duration::from_secs(5), stream.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert!(n > 0, "connection closed before the chat reply");
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200"));
        assert_eq!(stub.hits(), 1);

        tx.send(()).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
    }
}
