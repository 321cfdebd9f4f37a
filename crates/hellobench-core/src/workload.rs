//! Simulated per-request work.
//!
//! Every binding calls into this module exactly once per request, before it
//! writes the response. The policy is a three-way branch:
//!
//! ```text
//! Workload::Cpu { target } → fixed-round SHA-256 chain, no suspension
//! Workload::Sleep(d)       → park the task / thread for `d`
//! Workload::Yield          → hand control back to the scheduler once
//! ```
//!
//! Two flavours exist because bindings run under two execution models:
//! [`simulate`] for tokio tasks and [`simulate_blocking`] for plain OS
//! threads. The CPU path is the same function in both.
//!
//! Nothing here touches shared mutable state, so any number of requests can
//! run it concurrently without synchronisation.

use std::fmt;
use std::hint::black_box;
use std::time::Duration;

use sha2::{Digest, Sha256};

/// CPU target used when the workload argument is `-1`.
pub const CPU_TARGET: u32 = 15;

/// SHA-256 rounds per unit of target. Target 15 lands in the low
/// milliseconds on current hardware.
const ROUNDS_PER_UNIT: u32 = 2048;

/// Workload argument that selects CPU-bound mode.
pub const CPU_BOUND_SENTINEL: i64 = -1;

/// The unit of simulated work performed for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Workload {
    /// Occupy a core for a cost proportional to `target`.
    Cpu { target: u32 },
    /// Suspend for the given duration without burning CPU.
    Sleep(Duration),
    /// Cooperative yield only.
    #[default]
    Yield,
}

impl Workload {
    /// Map the CLI workload value in milliseconds to a mode.
    ///
    /// `-1` is CPU-bound, positive values sleep, everything else yields.
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            CPU_BOUND_SENTINEL => Workload::Cpu { target: CPU_TARGET },
            ms if ms > 0 => Workload::Sleep(Duration::from_millis(ms as u64)),
            _ => Workload::Yield,
        }
    }

    pub fn is_cpu_bound(&self) -> bool {
        matches!(self, Workload::Cpu { .. })
    }

    /// Zero for CPU and yield modes.
    pub fn sleep_duration(&self) -> Duration {
        match self {
            Workload::Sleep(d) => *d,
            _ => Duration::ZERO,
        }
    }

    /// Zero unless CPU-bound.
    pub fn cpu_target(&self) -> u32 {
        match self {
            Workload::Cpu { target } => *target,
            _ => 0,
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workload::Cpu { target } => write!(f, "cpu(target={})", target),
            Workload::Sleep(d) => write!(f, "sleep({}ms)", d.as_millis()),
            Workload::Yield => f.write_str("yield"),
        }
    }
}

/// Run `target * ROUNDS_PER_UNIT` chained SHA-256 rounds over a fixed seed.
///
/// No early exit, one 32-byte buffer on the stack, same output for the same
/// target. Callers discard the digest through [`black_box`].
#[inline(never)]
pub fn burn_cpu(target: u32) -> [u8; 32] {
    let mut digest = [0u8; 32];
    digest[..11].copy_from_slice(b"hello world");

    for _ in 0..target.saturating_mul(ROUNDS_PER_UNIT) {
        let next = Sha256::digest(digest);
        digest.copy_from_slice(&next);
    }
    digest
}

/// Perform the workload from inside a tokio task.
#[inline]
pub async fn simulate(workload: &Workload) {
    match *workload {
        Workload::Cpu { target } => {
            black_box(burn_cpu(black_box(target)));
        }
        Workload::Sleep(d) => tokio::time::sleep(d).await,
        Workload::Yield => tokio::task::yield_now().await,
    }
}

/// Perform the workload on the calling OS thread.
#[inline]
pub fn simulate_blocking(workload: &Workload) {
    match *workload {
        Workload::Cpu { target } => {
            black_box(burn_cpu(black_box(target)));
        }
        Workload::Sleep(d) => std::thread::sleep(d),
        Workload::Yield => std::thread::yield_now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn from_millis_selects_mode() {
        assert_eq!(Workload::from_millis(-1), Workload::Cpu { target: CPU_TARGET });
        assert_eq!(Workload::from_millis(0), Workload::Yield);
        assert_eq!(
            Workload::from_millis(25),
            Workload::Sleep(Duration::from_millis(25))
        );
        // only the sentinel selects CPU mode
        assert_eq!(Workload::from_millis(-7), Workload::Yield);
    }

    #[test]
    fn cpu_mode_has_no_sleep() {
        let w = Workload::from_millis(-1);
        assert!(w.is_cpu_bound());
        assert_eq!(w.sleep_duration(), Duration::ZERO);
        assert_eq!(w.cpu_target(), CPU_TARGET);
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(Workload::Cpu { target: 15 }.to_string(), "cpu(target=15)");
        assert_eq!(Workload::Sleep(Duration::from_millis(10)).to_string(), "sleep(10ms)");
        assert_eq!(Workload::Yield.to_string(), "yield");
    }

    #[test]
    fn burn_cpu_is_deterministic() {
        assert_eq!(burn_cpu(2), burn_cpu(2));
        assert_ne!(burn_cpu(1), burn_cpu(2));
    }

    #[test]
    fn burn_cpu_zero_target_returns_seed() {
        let out = burn_cpu(0);
        assert_eq!(&out[..11], b"hello world");
    }

    #[test]
    fn blocking_sleep_waits_at_least_duration() {
        let w = Workload::Sleep(Duration::from_millis(20));
        for _ in 0..3 {
            let start = Instant::now();
            simulate_blocking(&w);
            assert!(start.elapsed() >= Duration::from_millis(20));
        }
    }

    #[test]
    fn blocking_cpu_takes_measurable_time() {
        let w = Workload::from_millis(-1);
        let start = Instant::now();
        simulate_blocking(&w);
        assert!(start.elapsed() > Duration::ZERO);
    }

    #[test]
    fn blocking_yield_is_faster_than_sleep() {
        let start = Instant::now();
        simulate_blocking(&Workload::Yield);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn async_sleep_waits_at_least_duration() {
        let w = Workload::Sleep(Duration::from_millis(15));
        for _ in 0..3 {
            let start = Instant::now();
            simulate(&w).await;
            assert!(start.elapsed() >= Duration::from_millis(15));
        }
    }

    #[tokio::test]
    async fn async_yield_returns_promptly() {
        let start = Instant::now();
        for _ in 0..100 {
            simulate(&Workload::Yield).await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn async_cpu_runs_inline() {
        let start = Instant::now();
        simulate(&Workload::Cpu { target: 1 }).await;
        assert!(start.elapsed() > Duration::ZERO);
    }
}
