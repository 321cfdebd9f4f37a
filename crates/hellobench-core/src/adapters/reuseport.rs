//! Per-core binding: one pinned OS thread per CPU, each with its own
//! `SO_REUSEPORT` listener and a single-threaded tokio runtime.
//!
//! ```text
//! SO_REUSEPORT × N cores  (kernel load-balances accepted connections)
//!   → hellobench-worker-i, pinned to core i
//!     → current-thread runtime
//!       → hyper accept loop (same handler as `default`)
//! ```
//!
//! All listeners are bound on the calling thread before any worker starts,
//! so a taken port fails fast instead of inside a worker.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use super::{Flavor, hyper_server, into_tokio, listen_socket, runtime};
use crate::config::{Config, ROUTE_PATH};
use crate::error::{BenchError, BenchResult};

pub(crate) fn start(config: Arc<Config>) -> BenchResult<()> {
    let addr = config.socket_addr();
    let workers = num_cpus::get().max(1);
    let core_ids = core_affinity::get_core_ids().unwrap_or_default();

    let listeners = (0..workers)
        .map(|_| listen_socket(addr, true, true))
        .collect::<BenchResult<Vec<_>>>()?;

    tracing::info!(
        "reuseport: {} accept loops listening on http://{}{} [workload: {}]",
        workers,
        addr,
        ROUTE_PATH,
        config.workload,
    );

    let jobs = listeners.into_iter().enumerate().map(|(i, listener)| {
        // Wrap around when there are more workers than reported cores.
        let core_id = core_ids.get(i % core_ids.len().max(1)).copied();
        let config = config.clone();

        move || -> BenchResult<()> {
            match core_id {
                Some(id) if core_affinity::set_for_current(id) => {
                    tracing::debug!("worker {} pinned to CPU {}", i, id.id);
                }
                Some(id) => tracing::debug!("worker {} failed to pin to CPU {}", i, id.id),
                None => tracing::debug!("worker {} started (no pinning available)", i),
            }

            let rt = runtime(Flavor::CurrentThread)?;
            rt.block_on(async move {
                let listener = into_tokio(addr, listener)?;
                hyper_server::accept_loop(listener, config).await;
                Ok::<_, BenchError>(())
            })
        }
    });

    supervise(jobs)
}

/// Run every job on its own named thread and return as soon as the first one
/// exits.
///
/// Workers are expected to run forever, so any exit is reported: the worker's
/// own error, `WorkerPanic` for a panic, or `Serve` for a clean return.
/// The remaining threads are left running.
fn supervise<I, F>(jobs: I) -> BenchResult<()>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> BenchResult<()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<(String, BenchResult<()>)>();

    for (i, job) in jobs.into_iter().enumerate() {
        let name = format!("hellobench-worker-{}", i);
        let tx = tx.clone();
        let thread_name = name.clone();

        thread::Builder::new()
            .name(name)
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(job))
                    .unwrap_or_else(|_| Err(BenchError::WorkerPanic(thread_name.clone())));
                let _ = tx.send((thread_name, result));
            })
            .map_err(BenchError::Runtime)?;
    }
    drop(tx);

    match rx.recv() {
        Ok((name, Err(e))) => {
            tracing::error!("{} stopped: {}", name, e);
            Err(e)
        }
        Ok((name, Ok(()))) => Err(BenchError::Serve(io::Error::other(format!(
            "{} stopped",
            name
        )))),
        // No jobs at all.
        Err(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    type Job = Box<dyn FnOnce() -> BenchResult<()> + Send>;

    fn forever() -> Job {
        Box::new(|| -> BenchResult<()> {
            loop {
                thread::park();
            }
        })
    }

    #[test]
    fn reports_a_failing_later_worker() {
        let jobs: Vec<Job> = vec![
            forever(),
            forever(),
            Box::new(|| -> BenchResult<()> {
                Err(BenchError::Runtime(io::Error::other("no runtime")))
            }),
        ];

        let started = Instant::now();
        match supervise(jobs) {
            Err(BenchError::Runtime(e)) => assert_eq!(e.to_string(), "no runtime"),
            other => panic!("expected Runtime error, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn reports_a_panicking_worker() {
        let jobs: Vec<Job> = vec![
            forever(),
            Box::new(|| -> BenchResult<()> { panic!("worker blew up") }),
        ];

        match supervise(jobs) {
            Err(BenchError::WorkerPanic(name)) => assert_eq!(name, "hellobench-worker-1"),
            other => panic!("expected WorkerPanic, got {:?}", other),
        }
    }

    #[test]
    fn clean_exit_is_still_an_error() {
        let jobs: Vec<Job> = vec![Box::new(|| -> BenchResult<()> { Ok(()) })];
        assert!(matches!(supervise(jobs), Err(BenchError::Serve(_))));
    }
}
