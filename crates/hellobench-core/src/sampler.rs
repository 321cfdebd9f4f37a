//! One-shot memory snapshot taken on a background thread.
//!
//! The sampler is launched once, before any adapter starts, and runs on its
//! own OS thread so it is independent of whichever runtime the binding uses.
//! After the sampling delay (measured from launch) it reads the allocation
//! counters and the process resident set, hands the [`Sample`] to a callback,
//! and exits. It never retries.

use std::fmt;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use sysinfo::System;

use crate::alloc;
use crate::error::{BenchError, BenchResult};

const MIB: u64 = 1024 * 1024;

/// Memory counters at one instant, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Cumulative bytes allocated since process start.
    pub total_allocated: u64,
    /// Bytes currently live.
    pub currently_allocated: u64,
    /// Live heap bytes. The tracked heap is the only heap, so this equals
    /// `currently_allocated`.
    pub heap_allocated: u64,
    /// Memory the process holds from the OS (resident set).
    pub heap_reserved: u64,
    /// High-water mark of live bytes. Logged, not part of the report.
    pub peak_allocated: u64,
}

impl Sample {
    /// Read the counters now.
    pub fn capture() -> BenchResult<Self> {
        let counters = alloc::snapshot();
        let live = counters.live as u64;
        Ok(Sample {
            total_allocated: counters.total_allocated as u64,
            currently_allocated: live,
            heap_allocated: live,
            heap_reserved: resident_set_bytes()?,
            peak_allocated: counters.peak_live as u64,
        })
    }
}

/// The four-line report, MiB, truncated.
impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TotalAlloc: {}", self.total_allocated / MIB)?;
        writeln!(f, "Alloc: {}", self.currently_allocated / MIB)?;
        writeln!(f, "HeapAlloc: {}", self.heap_allocated / MIB)?;
        write!(f, "HeapSys: {}", self.heap_reserved / MIB)
    }
}

fn resident_set_bytes() -> BenchResult<u64> {
    let pid = sysinfo::get_current_pid().map_err(|e| BenchError::SampleRead(e.to_string()))?;
    let mut system = System::new();
    if !system.refresh_process(pid) {
        return Err(BenchError::SampleRead(format!("process {} not found", pid)));
    }
    system
        .process(pid)
        .map(|p| p.memory())
        .ok_or_else(|| BenchError::SampleRead(format!("no memory info for process {}", pid)))
}

/// Launch the sampler thread.
///
/// `on_sample` runs exactly once, on the sampler thread, no earlier than
/// `delay` after this call.
pub fn schedule<F>(delay: Duration, on_sample: F) -> BenchResult<JoinHandle<()>>
where
    F: FnOnce(BenchResult<Sample>) + Send + 'static,
{
    let launched = Instant::now();
    thread::Builder::new()
        .name("hellobench-sampler".to_string())
        .spawn(move || {
            // `sleep` may wake early on some platforms.
            while launched.elapsed() < delay {
                thread::sleep(delay.saturating_sub(launched.elapsed()));
            }
            on_sample(Sample::capture());
        })
        .map_err(BenchError::Runtime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_four_labelled_lines() {
        let sample = Sample {
            total_allocated: 5 * MIB + 17,
            currently_allocated: 2 * MIB,
            heap_allocated: 2 * MIB,
            heap_reserved: 9 * MIB - 1,
            peak_allocated: 3 * MIB,
        };
        let report = sample.to_string();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(
            lines,
            ["TotalAlloc: 5", "Alloc: 2", "HeapAlloc: 2", "HeapSys: 8"]
        );
    }

    #[test]
    fn capture_reads_resident_set() {
        let sample = Sample::capture().unwrap();
        assert!(sample.heap_reserved > 0);
        assert_eq!(sample.heap_allocated, sample.currently_allocated);
    }

    #[test]
    fn schedule_waits_for_delay() {
        let (tx, rx) = std::sync::mpsc::channel();
        let start = Instant::now();
        let handle = schedule(Duration::from_millis(200), move |res| {
            tx.send((start.elapsed(), res.is_ok())).unwrap();
        })
        .unwrap();

        let (elapsed, ok) = rx.recv().unwrap();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(ok);
        handle.join().unwrap();
        // fires once
        assert!(rx.try_recv().is_err());
    }
}
