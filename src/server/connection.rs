// Connection handling module
// Serves one accepted TCP connection with the request dispatcher

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept a connection unless the connection cap is reached, then serve it
/// on a task tracked by `tasks`.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    tasks: &mut JoinSet<()>,
    shutdown: watch::Receiver<bool>,
) {
    // Increment first, then check, so two racing accepts cannot both slip under the cap
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);
    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    let state = Arc::clone(state);
    let conn_counter = Arc::clone(conn_counter);
    tasks.spawn(async move {
        serve_connection(stream, peer_addr, state, shutdown).await;
        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Serve HTTP/1.1 with keep-alive until the client leaves or shutdown is requested
///
/// `connection_timeout` bounds each request inside the dispatcher and, through
/// hyper's header read timeout, how long the connection may wait for the next
/// request head. A long-lived keep-alive connection is never cut mid-request.
async fn serve_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let io = TokioIo::new(stream);
    let header_timeout = Duration::from_secs(state.config.performance.connection_timeout);

    let svc_state = Arc::clone(&state);
    let conn = http1::Builder::new()
        .keep_alive(true)
        .timer(TokioTimer::new())
        .header_read_timeout(header_timeout)
        .serve_connection(
            io,
            service_fn(move |req| handler::handle_request(req, Arc::clone(&svc_state), peer_addr)),
        );
    tokio::pin!(conn);

    let served = tokio::select! {
        res = conn.as_mut() => res,
        () = async {
            let _ = shutdown.wait_for(|stop| *stop).await;
        } => {
            // Finish the in-flight request, then close instead of idling on keep-alive
            conn.as_mut().graceful_shutdown();
            conn.as_mut().await
        }
    };

    if let Err(err) = served {
        if err.is_timeout() {
            logger::log_warning(&format!(
                "Connection from {peer_addr} sent no request within {} seconds",
                header_timeout.as_secs()
            ));
        } else {
            logger::log_connection_error(&err);
        }
    }
}
