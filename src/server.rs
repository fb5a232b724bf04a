//! Optional HTTP exposition of the registry snapshot.
//!
//! Serving is deliberately manual: bind a `TcpListener`, serve each accepted
//! connection with `Http::serve_connection`, never touch the resolver's own
//! request path. Listener failures after startup are logged and leave the
//! resolver running without exposition.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::Http;
use hyper::service::service_fn;
use hyper::{Body, Method, Request, Response, StatusCode};
use prometheus::{Encoder, TextEncoder};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::registry::Metrics;

/// Handle to a running exposition server. `shutdown()` stops the listener;
/// dropping the handle instead leaves the server running for the rest of the
/// process lifetime.
pub struct ServerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Signals the accept loop to stop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Starts the exposition server on the configured port, or returns `None`
/// when no port is configured. Must be called inside a tokio runtime when a
/// port is set. A failure to bind is reported asynchronously via the log and
/// does not reach the caller.
pub fn spawn(metrics: Arc<Metrics>, config: &Config) -> Option<ServerHandle> {
    let port = config.port?;
    let path = config.path.clone();
    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = match TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, %addr, "metrics listener bind failed, exposition stays down");
                return;
            }
        };
        serve_on(listener, metrics, path, rx).await;
    });
    Some(ServerHandle { shutdown: tx, task })
}

/// Accept loop over an already-bound listener. Public so embedders (and
/// tests) can pick the socket themselves.
pub async fn serve_on(
    listener: TcpListener,
    metrics: Arc<Metrics>,
    path: String,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(addr = ?listener.local_addr().ok(), "metrics exporter listening");
    let mut detached = false;
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _peer) = match accepted {
                    Ok(x) => x,
                    Err(e) => {
                        warn!(error = %e, "metrics accept failed");
                        continue;
                    }
                };
                let metrics = metrics.clone();
                let path = path.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let metrics = metrics.clone();
                        let path = path.clone();
                        async move { scrape(req, &metrics, &path) }
                    });
                    if let Err(e) = Http::new().serve_connection(stream, service).await {
                        debug!(error = %e, "metrics serve_connection error");
                    }
                });
            }
            changed = shutdown.changed(), if !detached => {
                match changed {
                    Ok(()) if *shutdown.borrow() => break,
                    Ok(()) => {}
                    // Handle dropped without a signal: keep serving.
                    Err(_) => detached = true,
                }
            }
        }
    }
    debug!("metrics exporter stopped");
}

fn scrape(req: Request<Body>, metrics: &Metrics, path: &str) -> Result<Response<Body>, Infallible> {
    if req.method() != Method::GET || req.uri().path() != path {
        return Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("not found"))
            .unwrap_or_default());
    }
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metrics.gather(), &mut buf) {
        warn!(error = %e, "metrics encoding failed");
        return Ok(Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::from("encoding error"))
            .unwrap_or_default());
    }
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(hyper::header::CONTENT_TYPE, encoder.format_type())
        .body(Body::from(buf))
        .unwrap_or_default())
}
