use hellobench_core::alloc::{self, TrackingAllocator};
use hellobench_core::sampler::{self, Sample};
use mimalloc::MiMalloc;
use std::hint::black_box;
use std::sync::mpsc;
use std::time::{Duration, Instant};

#[global_allocator]
static GLOBAL: TrackingAllocator<MiMalloc> = TrackingAllocator::new(MiMalloc);

const MIB: u64 = 1024 * 1024;

#[test]
fn counters_follow_allocations() {
    let before = alloc::snapshot();
    let block = black_box(vec![1u8; 4 * MIB as usize]);
    let during = alloc::snapshot();

    assert!(during.total_allocated >= before.total_allocated + block.len());
    assert!(during.peak_live >= block.len());
    drop(block);

    let after = alloc::snapshot();
    assert!(after.total_allocated >= during.total_allocated);
}

#[test]
fn capture_sees_live_heap() {
    let block = black_box(vec![7u8; 8 * MIB as usize]);
    let sample = Sample::capture().unwrap();

    assert!(sample.currently_allocated >= 8 * MIB);
    assert!(sample.total_allocated >= sample.currently_allocated);
    assert_eq!(sample.heap_allocated, sample.currently_allocated);
    assert!(sample.peak_allocated >= sample.currently_allocated);
    assert!(sample.heap_reserved > 0);
    drop(block);
}

#[test]
fn report_has_four_labelled_lines() {
    let report = Sample::capture().unwrap().to_string();
    let labels: Vec<&str> = report
        .lines()
        .map(|line| line.split(':').next().unwrap())
        .collect();
    assert_eq!(labels, ["TotalAlloc", "Alloc", "HeapAlloc", "HeapSys"]);

    for line in report.lines() {
        let value = line.split(": ").nth(1).unwrap();
        assert!(value.parse::<u64>().is_ok(), "not a whole MiB count: {line}");
    }
}

#[test]
fn schedule_reports_once_after_delay() {
    let (tx, rx) = mpsc::channel();
    let delay = Duration::from_millis(200);
    let started = Instant::now();

    let handle = sampler::schedule(delay, move |sample| {
        tx.send((started.elapsed(), sample)).unwrap();
    })
    .unwrap();

    let (elapsed, sample) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(elapsed >= delay);
    assert!(sample.is_ok());

    handle.join().unwrap();
    assert!(rx.try_recv().is_err());
}

#[test]
fn schedule_does_not_block_caller() {
    let started = Instant::now();
    let _handle = sampler::schedule(Duration::from_secs(60), |_| {}).unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
}
