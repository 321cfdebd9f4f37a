//! Blocking binding: `std::net`, one OS thread per connection.
//!
//! The workload runs through [`workload::simulate_blocking`], so sleep mode
//! parks the connection's thread and yield mode calls
//! `std::thread::yield_now`.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;

use super::listen_socket;
use crate::config::{Config, ROUTE_PATH};
use crate::error::{BenchError, BenchResult};
use crate::http::{self, NOT_FOUND, ParseError, RawResponse, RequestBuffer};
use crate::workload;

fn serve_connection(
    mut stream: TcpStream,
    config: &Config,
    response: &RawResponse,
) -> io::Result<()> {
    let mut buf = RequestBuffer::new();

    loop {
        let (is_route, keep_alive, len) = loop {
            match http::parse_head(buf.filled()) {
                Ok(head) => break (head.is_route(), head.keep_alive, head.len),
                Err(ParseError::Incomplete) => {}
                Err(_) => return Ok(()),
            }
            match stream.read(buf.spare())? {
                0 => return Ok(()),
                n => buf.advance(n),
            }
        };
        buf.consume(len);

        if is_route {
            workload::simulate_blocking(&config.workload);
            stream.write_all(response.ok())?;
        } else {
            stream.write_all(NOT_FOUND)?;
        }

        if !keep_alive {
            return Ok(());
        }
    }
}

pub(crate) fn start(config: Arc<Config>) -> BenchResult<()> {
    let addr = config.socket_addr();
    let listener = listen_socket(addr, false, false)?;
    let response = Arc::new(RawResponse::new(&config.payload));

    tracing::info!(
        "std listening on http://{}{} [workload: {}]",
        addr,
        ROUTE_PATH,
        config.workload,
    );

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("TCP accept error: {}", e);
                continue;
            }
        };
        let _ = stream.set_nodelay(true);
        let config = config.clone();
        let response = response.clone();

        let spawned = thread::Builder::new()
            .name("hellobench-conn".to_string())
            .spawn(move || {
                if let Err(e) = serve_connection(stream, &config, &response) {
                    tracing::debug!("connection error: {}", e);
                }
            });
        if let Err(e) = spawned {
            tracing::error!("failed to spawn connection thread: {}", e);
        }
    }

    Err(BenchError::Serve(io::Error::other("listener closed")))
}
