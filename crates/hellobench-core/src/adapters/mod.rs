//! Server bindings and the registry that selects one of them.
//!
//! Every binding honours the same contract:
//!
//! - listen on `0.0.0.0:<port>`
//! - serve exactly one route, `GET /hello`
//! - the handler runs the workload engine, then writes the payload verbatim
//! - no content-type, no logging, no middleware on the request path
//! - `start` only returns on failure
//!
//! | name             | serving model                                                |
//! |------------------|--------------------------------------------------------------|
//! | `default`        | hyper HTTP/1.1, multi-thread runtime, one listener           |
//! | `axum`           | axum `Router`, multi-thread runtime                          |
//! | `current-thread` | hyper HTTP/1.1, single-threaded event loop                   |
//! | `reuseport`      | pinned thread per core, own `SO_REUSEPORT` listener each     |
//! | `raw`            | pre-serialised HTTP/1.1 over tokio sockets, no framework     |
//! | `std`            | blocking `std::net`, one OS thread per connection            |

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};

use crate::config::Config;
use crate::error::{BenchError, BenchResult};

mod axum_router;
mod hyper_server;
mod raw;
mod reuseport;
mod threaded;

/// Listen backlog for every binding.
const BACKLOG: i32 = 16384;

/// A built-in server binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Adapter {
    Default,
    Axum,
    CurrentThread,
    Reuseport,
    Raw,
    Std,
}

impl Adapter {
    /// Every binding, in the order they are listed to the operator.
    pub const ALL: [Adapter; 6] = [
        Adapter::Default,
        Adapter::Axum,
        Adapter::CurrentThread,
        Adapter::Reuseport,
        Adapter::Raw,
        Adapter::Std,
    ];

    /// Registry key.
    pub const fn name(self) -> &'static str {
        match self {
            Adapter::Default => "default",
            Adapter::Axum => "axum",
            Adapter::CurrentThread => "current-thread",
            Adapter::Reuseport => "reuseport",
            Adapter::Raw => "raw",
            Adapter::Std => "std",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|a| a.name()).collect()
    }

    /// Exact, case-sensitive lookup. No fallback.
    pub fn resolve(name: &str) -> BenchResult<Adapter> {
        Self::ALL
            .into_iter()
            .find(|a| a.name() == name)
            .ok_or_else(|| BenchError::UnknownAdapter {
                name: name.to_string(),
                known: Self::names(),
            })
    }

    /// Bind the port and serve until the process is killed.
    ///
    /// Returns only if the listener cannot be set up or a server loop dies.
    pub fn start(self, config: Arc<Config>) -> BenchResult<()> {
        match self {
            Adapter::Default => hyper_server::start(config, Flavor::MultiThread),
            Adapter::CurrentThread => hyper_server::start(config, Flavor::CurrentThread),
            Adapter::Axum => axum_router::start(config),
            Adapter::Reuseport => reuseport::start(config),
            Adapter::Raw => raw::start(config),
            Adapter::Std => threaded::start(config),
        }
    }
}

impl FromStr for Adapter {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Adapter::resolve(s)
    }
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tokio scheduler used by a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flavor {
    MultiThread,
    CurrentThread,
}

pub(crate) fn runtime(flavor: Flavor) -> BenchResult<tokio::runtime::Runtime> {
    let mut builder = match flavor {
        Flavor::MultiThread => {
            let mut b = tokio::runtime::Builder::new_multi_thread();
            b.worker_threads(num_cpus::get().max(1));
            b
        }
        Flavor::CurrentThread => tokio::runtime::Builder::new_current_thread(),
    };
    builder.enable_all().build().map_err(BenchError::Runtime)
}

/// Create, bind and listen a TCP socket.
///
/// `SO_REUSEADDR` is always set; `SO_REUSEPORT` only for per-core
/// listeners. A port held by another listener still fails here.
pub(crate) fn listen_socket(
    addr: SocketAddr,
    reuse_port: bool,
    nonblocking: bool,
) -> BenchResult<std::net::TcpListener> {
    let fail = |e| BenchError::listen(addr, e);

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(fail)?;
    socket.set_reuse_address(true).map_err(fail)?;
    #[cfg(unix)]
    {
        if reuse_port {
            socket.set_reuse_port(true).map_err(fail)?;
        }
    }
    #[cfg(not(unix))]
    let _ = reuse_port;
    socket.set_nonblocking(nonblocking).map_err(fail)?;
    socket.bind(&addr.into()).map_err(fail)?;
    socket.listen(BACKLOG).map_err(fail)?;

    Ok(socket.into())
}

/// Turn a bound std listener into a tokio one. Must run inside a runtime.
pub(crate) fn into_tokio(
    addr: SocketAddr,
    listener: std::net::TcpListener,
) -> BenchResult<tokio::net::TcpListener> {
    tokio::net::TcpListener::from_std(listener).map_err(|e| BenchError::listen(addr, e))
}
