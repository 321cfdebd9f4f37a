//! Allocation accounting for the memory sampler.
//!
//! [`TrackingAllocator`] wraps the real allocator and bumps a handful of
//! relaxed atomics on every call. Install it in the binary:
//!
//! ```rust,ignore
//! use hellobench_core::alloc::TrackingAllocator;
//! use mimalloc::MiMalloc;
//!
//! #[global_allocator]
//! static GLOBAL: TrackingAllocator<MiMalloc> = TrackingAllocator::new(MiMalloc);
//! ```
//!
//! When it is not installed the counters simply stay at zero.

use std::alloc::{GlobalAlloc, Layout};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-wide allocation counters.
#[repr(C, align(64))]
pub struct AllocCounters {
    /// Cumulative bytes handed out, never decremented.
    total: AtomicUsize,
    /// Bytes currently live.
    live: AtomicUsize,
    /// High-water mark of `live`.
    peak: AtomicUsize,
}

impl AllocCounters {
    pub const fn new() -> Self {
        Self {
            total: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    #[inline(always)]
    fn on_alloc(&self, size: usize) {
        self.total.fetch_add(size, Ordering::Relaxed);
        let live = self.live.fetch_add(size, Ordering::Relaxed) + size;
        self.peak.fetch_max(live, Ordering::Relaxed);
    }

    #[inline(always)]
    fn on_dealloc(&self, size: usize) {
        self.live.fetch_sub(size, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AllocSnapshot {
        AllocSnapshot {
            total_allocated: self.total.load(Ordering::Relaxed),
            live: self.live.load(Ordering::Relaxed),
            peak_live: self.peak.load(Ordering::Relaxed),
        }
    }
}

impl Default for AllocCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters updated by every [`TrackingAllocator`] in the process.
pub static COUNTERS: AllocCounters = AllocCounters::new();

/// A point-in-time copy of [`COUNTERS`], in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocSnapshot {
    pub total_allocated: usize,
    pub live: usize,
    pub peak_live: usize,
}

/// Read the global counters.
#[inline]
pub fn snapshot() -> AllocSnapshot {
    COUNTERS.snapshot()
}

/// A [`GlobalAlloc`] that forwards to `A` and records sizes in [`COUNTERS`].
pub struct TrackingAllocator<A> {
    inner: A,
}

impl<A> TrackingAllocator<A> {
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

// SAFETY: every call is forwarded unchanged to `inner`; only counters are
// touched on the side, and they never allocate.
unsafe impl<A: GlobalAlloc> GlobalAlloc for TrackingAllocator<A> {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.inner.alloc(layout) };
        if !ptr.is_null() {
            COUNTERS.on_alloc(layout.size());
        }
        ptr
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.inner.alloc_zeroed(layout) };
        if !ptr.is_null() {
            COUNTERS.on_alloc(layout.size());
        }
        ptr
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { self.inner.dealloc(ptr, layout) };
        COUNTERS.on_dealloc(layout.size());
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            COUNTERS.on_dealloc(layout.size());
            COUNTERS.on_alloc(new_size);
        }
        new_ptr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_live_and_total() {
        let counters = AllocCounters::new();
        counters.on_alloc(100);
        counters.on_alloc(50);
        counters.on_dealloc(100);

        let snap = counters.snapshot();
        assert_eq!(snap.total_allocated, 150);
        assert_eq!(snap.live, 50);
        assert_eq!(snap.peak_live, 150);
    }

    #[test]
    fn counters_are_cache_line_aligned() {
        assert_eq!(std::mem::align_of::<AllocCounters>(), 64);
    }

    #[test]
    fn forwards_to_inner_allocator() {
        let alloc = TrackingAllocator::new(std::alloc::System);
        let layout = Layout::from_size_align(64, 8).unwrap();
        let before = COUNTERS.snapshot().total_allocated;
        unsafe {
            let ptr = alloc.alloc_zeroed(layout);
            assert!(!ptr.is_null());
            assert_eq!(*ptr, 0);
            let ptr = alloc.realloc(ptr, layout, 128);
            assert!(!ptr.is_null());
            alloc.dealloc(ptr, Layout::from_size_align(128, 8).unwrap());
        }
        assert!(COUNTERS.snapshot().total_allocated >= before + 64 + 128);
    }
}
