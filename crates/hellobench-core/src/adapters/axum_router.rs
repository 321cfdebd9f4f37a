//! axum binding: one `get` route on a `Router`, config passed as state.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::serve::ListenerExt;

use super::{Flavor, into_tokio, listen_socket, runtime};
use crate::config::{Config, ROUTE_PATH};
use crate::error::{BenchError, BenchResult};
use crate::workload;

/// Returns a bare `Response` so axum adds no content-type.
async fn hello(State(config): State<Arc<Config>>) -> Response {
    workload::simulate(&config.workload).await;
    Response::new(Body::from(config.payload.clone()))
}

pub(crate) fn router(config: Arc<Config>) -> Router {
    Router::new().route(ROUTE_PATH, get(hello)).with_state(config)
}

pub(crate) fn start(config: Arc<Config>) -> BenchResult<()> {
    let addr = config.socket_addr();
    let listener = listen_socket(addr, false, true)?;
    let rt = runtime(Flavor::MultiThread)?;

    rt.block_on(async move {
        let listener = into_tokio(addr, listener)?.tap_io(|tcp| {
            let _ = tcp.set_nodelay(true);
        });
        tracing::info!(
            "axum listening on http://{}{} [workload: {}]",
            addr,
            ROUTE_PATH,
            config.workload,
        );
        axum::serve(listener, router(config))
            .await
            .map_err(BenchError::Serve)
    })
}
