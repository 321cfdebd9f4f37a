//! Framework-free binding: raw HTTP/1.1 on tokio sockets.
//!
//! The response is serialised once at startup; the only per-request work
//! besides the workload is finding the end of the head and comparing the
//! request line against `GET /hello`.
//!
//! ```text
//! accept → TCP_NODELAY → spawn
//!   → loop (keep-alive):
//!     → read into RequestBuffer until \r\n\r\n
//!       → GET /hello → workload::simulate → write_all(pre-serialised 200)
//!       → otherwise  → write_all(404)
//! ```

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::{Flavor, into_tokio, listen_socket, runtime};
use crate::config::{Config, ROUTE_PATH};
use crate::error::{BenchError, BenchResult};
use crate::http::{self, NOT_FOUND, ParseError, RawResponse, RequestBuffer};
use crate::workload;

/// Serve one connection until the peer closes, asks to close, or sends
/// something unparsable.
async fn serve_connection(
    mut stream: TcpStream,
    config: Arc<Config>,
    response: Arc<RawResponse>,
) {
    let mut buf = RequestBuffer::new();

    loop {
        let (is_route, keep_alive, len) = loop {
            match http::parse_head(buf.filled()) {
                Ok(head) => break (head.is_route(), head.keep_alive, head.len),
                Err(ParseError::Incomplete) => {}
                Err(_) => return,
            }
            match stream.read(buf.spare()).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.advance(n),
            }
        };
        buf.consume(len);

        let out = if is_route {
            workload::simulate(&config.workload).await;
            response.ok()
        } else {
            NOT_FOUND
        };

        if stream.write_all(out).await.is_err() || !keep_alive {
            return;
        }
    }
}

async fn accept_loop(listener: TcpListener, config: Arc<Config>) {
    let response = Arc::new(RawResponse::new(&config.payload));

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let _ = stream.set_nodelay(true);
                let config = config.clone();
                let response = response.clone();
                tokio::spawn(serve_connection(stream, config, response));
            }
            Err(e) => {
                tracing::error!("TCP accept error: {}", e);
            }
        }
    }
}

pub(crate) fn start(config: Arc<Config>) -> BenchResult<()> {
    let addr = config.socket_addr();
    let listener = listen_socket(addr, false, true)?;
    let rt = runtime(Flavor::MultiThread)?;

    rt.block_on(async move {
        let listener = into_tokio(addr, listener)?;
        tracing::info!(
            "raw listening on http://{}{} [workload: {}]",
            addr,
            ROUTE_PATH,
            config.workload,
        );
        accept_loop(listener, config).await;
        Ok::<_, BenchError>(())
    })
}
