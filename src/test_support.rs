// Test helpers shared by unit tests
// A local stand-in for the chat-completion API that records what it receives

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

struct StubState {
    status: u16,
    body: String,
    delay: Duration,
    hits: AtomicUsize,
    last_authorization: Mutex<Option<String>>,
    last_body: Mutex<Option<String>>,
}

/// Stub upstream bound to an ephemeral localhost port
pub struct StubUpstream {
    addr: SocketAddr,
    state: Arc<StubState>,
    task: JoinHandle<()>,
}

impl StubUpstream {
    pub async fn start(status: u16, body: &str) -> Self {
        Self::start_delayed(status, body, Duration::ZERO).await
    }

    pub async fn start_delayed(status: u16, body: &str, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(StubState {
            status,
            body: body.to_string(),
            delay,
            hits: AtomicUsize::new(0),
            last_authorization: Mutex::new(None),
            last_body: Mutex::new(None),
        });

        let accept_state = Arc::clone(&state);
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let state = Arc::clone(&accept_state);
                tokio::spawn(async move {
                    let svc = service_fn(move |req| respond(Arc::clone(&state), req));
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), svc)
                        .await;
                });
            }
        });

        Self { addr, state, task }
    }

    /// Chat-completions URL served by this stub
    pub fn url(&self) -> String {
        format!("http://{}/v1/chat/completions", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().unwrap().clone()
    }

    pub fn last_body(&self) -> Option<String> {
        self.state.last_body.lock().unwrap().clone()
    }
}

impl Drop for StubUpstream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn respond(
    state: Arc<StubState>,
    req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let auth = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    *state.last_authorization.lock().unwrap() = auth;

    let body = req
        .into_body()
        .collect()
        .await
        .map(|c| String::from_utf8_lossy(&c.to_bytes()).into_owned())
        .ok();
    *state.last_body.lock().unwrap() = body;

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    Ok(Response::builder()
        .status(state.status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(state.body.clone())))
        .unwrap())
}

/// URL on a localhost port with nothing listening
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/v1/chat/completions")
}
