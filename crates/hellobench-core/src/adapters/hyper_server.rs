//! hyper HTTP/1.1 bindings (`default`, `current-thread`, and the per-core
//! loops of `reuseport`).
//!
//! ```text
//! TcpListener (one)
//!   → accept loop
//!     → TCP_NODELAY
//!       → hyper HTTP/1.1 (keep-alive, pipeline_flush)
//!         → hello(req)
//!           → GET /hello → workload::simulate → payload
//!           → otherwise  → 404, empty body
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use super::{Flavor, into_tokio, listen_socket, runtime};
use crate::config::{Config, ROUTE_PATH};
use crate::error::{BenchError, BenchResult};
use crate::workload;

/// The single handler. The payload is a static `Bytes`, so the clone is a
/// pointer copy.
async fn hello(
    config: Arc<Config>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() != Method::GET || req.uri().path() != ROUTE_PATH {
        let mut res = Response::new(Full::new(Bytes::new()));
        *res.status_mut() = StatusCode::NOT_FOUND;
        return Ok(res);
    }

    workload::simulate(&config.workload).await;
    Ok(Response::new(Full::new(config.payload.clone())))
}

/// Shared HTTP/1.1 builder, configured once and cloned per connection.
///
/// No `date` header, matching `raw` and `std`.
fn http1_builder() -> http1::Builder {
    let mut builder = http1::Builder::new();
    builder
        .keep_alive(true)
        .pipeline_flush(true)
        .half_close(false)
        .auto_date_header(false)
        .max_buf_size(16 * 1024);
    builder
}

/// Accept connections forever, one spawned task per connection.
pub(crate) async fn accept_loop(listener: TcpListener, config: Arc<Config>) {
    let http_builder = http1_builder();

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let _ = stream.set_nodelay(true);
                let io = TokioIo::new(stream);
                let builder = http_builder.clone();
                let config = config.clone();

                tokio::spawn(async move {
                    let svc = service_fn(move |req| hello(config.clone(), req));
                    if let Err(e) = builder.serve_connection(io, svc).await {
                        if !e.is_incomplete_message() && !e.is_canceled() && !e.is_closed() {
                            tracing::debug!("connection error: {}", e);
                        }
                    }
                });
            }
            Err(e) => {
                tracing::error!("TCP accept error: {}", e);
            }
        }
    }
}

pub(crate) fn start(config: Arc<Config>, flavor: Flavor) -> BenchResult<()> {
    let addr = config.socket_addr();
    let listener = listen_socket(addr, false, true)?;
    let rt = runtime(flavor)?;

    rt.block_on(async move {
        let listener = into_tokio(addr, listener)?;
        tracing::info!(
            "hyper ({:?}) listening on http://{}{} [workload: {}]",
            flavor,
            addr,
            ROUTE_PATH,
            config.workload,
        );
        accept_loop(listener, config).await;
        Ok::<_, BenchError>(())
    })
}
