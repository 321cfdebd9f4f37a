use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Central error type for the harness.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The requested adapter name is not one of the built-in bindings.
    #[error("unknown adapter `{name}` (expected one of: {})", .known.join(", "))]
    UnknownAdapter {
        name: String,
        known: Vec<&'static str>,
    },

    /// The listening socket could not be created or bound.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// An async runtime or worker thread could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] io::Error),

    /// A server loop returned, which only happens on an unrecoverable I/O error.
    #[error("server stopped: {0}")]
    Serve(#[source] io::Error),

    /// A worker thread panicked.
    #[error("worker `{0}` panicked")]
    WorkerPanic(String),

    /// Process memory counters could not be read.
    #[error("failed to read process memory: {0}")]
    SampleRead(String),
}

impl BenchError {
    pub(crate) fn listen(addr: SocketAddr, source: io::Error) -> Self {
        BenchError::Listen { addr, source }
    }
}

pub type BenchResult<T> = Result<T, BenchError>;
