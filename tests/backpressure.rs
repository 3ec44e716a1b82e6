//! 生产者遵守暂停信号时的背压测试
//! Backpressure tests with producers that honor pause signaling

pub mod common;

use backflow::{Config, Emitter, EventStream};
use common::harness::{TestHarness, init_tracing};
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

/// A producer that keeps emitting while not paused, like a readable source.
async fn run_cooperative_producer(
    source: Arc<Emitter<u32>>,
    total: u32,
    max_seen: Arc<AtomicUsize>,
    stream_len: impl Fn() -> usize,
) {
    let mut next = 0;
    while next < total {
        if source.is_paused() {
            tokio::task::yield_now().await;
            continue;
        }
        source.emit_one("data", next).unwrap();
        max_seen.fetch_max(stream_len(), Ordering::SeqCst);
        next += 1;
        if next % 16 == 0 {
            tokio::task::yield_now().await;
        }
    }
    source.emit("end", Vec::new()).unwrap();
}

#[tokio::test]
async fn test_buffer_stays_bounded_when_producer_honors_pause() {
    let TestHarness { source, stream } = TestHarness::<u32>::new(32, 8);
    let stream = Arc::new(stream);
    let max_seen = Arc::new(AtomicUsize::new(0));

    let producer = {
        let source = Arc::clone(&source);
        let max_seen = Arc::clone(&max_seen);
        let stream = Arc::clone(&stream);
        tokio::spawn(async move {
            run_cooperative_producer(source, 1_000, max_seen, move || stream.len()).await;
        })
    };

    let mut traversal = stream.traversal();
    let mut expected = 0;
    while let Some(item) = traversal.next().await {
        let item = item.unwrap();
        assert_eq!(item.as_single(), Some(&expected));
        expected += 1;
        if expected % 7 == 0 {
            tokio::task::yield_now().await;
        }
    }
    producer.await.unwrap();

    assert_eq!(expected, 1_000);
    assert!(max_seen.load(Ordering::SeqCst) <= 32);
    assert!(source.pause_count() >= 1);
    assert_eq!(source.pause_count(), source.resume_count());
    info!(stats = %stream.stats(), "Backpressure run complete");
}

#[tokio::test]
async fn test_random_interleavings_preserve_order_and_counts() {
    init_tracing();
    let mut rng = rand::rng();

    for round in 0..20 {
        let high = rng.random_range(2..16);
        let low = rng.random_range(1..high);
        let count: u32 = rng.random_range(0..200);

        let source = Arc::new(Emitter::<u32>::new());
        let config = Config::builder("data", "end")
            .high_water_mark(high)
            .low_water_mark(low)
            .pre_filter(|args: &[u32]| args[0] % 5 != 0)
            .transform(|args: Vec<u32>| args[0])
            .pause_method("pause")
            .resume_method("resume")
            .build()
            .unwrap();
        let stream = EventStream::new(Arc::clone(&source), config).unwrap();

        let bursts: Vec<u32> = (0..count).map(|_| rng.random_range(1..8)).collect();
        let producer = {
            let source = Arc::clone(&source);
            tokio::spawn(async move {
                let mut next = 0;
                for burst in bursts {
                    for _ in 0..burst {
                        if next == count {
                            break;
                        }
                        source.emit_one("data", next).unwrap();
                        next += 1;
                    }
                    tokio::task::yield_now().await;
                }
                while next < count {
                    source.emit_one("data", next).unwrap();
                    next += 1;
                }
                source.emit("end", Vec::new()).unwrap();
            })
        };

        let items = stream.collect_all().await.unwrap();
        producer.await.unwrap();

        let expected: Vec<u32> = (0..count).filter(|n| n % 5 != 0).collect();
        assert_eq!(items, expected, "round {round}");
        let stats = stream.stats();
        assert_eq!(stats.total_length, expected.len() as u64);
        assert_eq!(stats.total_returned, stats.total_length);
        assert_eq!(stats.total_filtered, u64::from(count) - expected.len() as u64);
        assert_eq!(stats.length, 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_producer_on_os_thread() {
    let TestHarness { source, stream } = TestHarness::<u64>::new(64, 16);

    let producer = {
        let source = Arc::clone(&source);
        std::thread::spawn(move || {
            for i in 0..5_000u64 {
                while source.is_paused() {
                    std::thread::sleep(Duration::from_micros(50));
                }
                source.emit_one("data", i).unwrap();
            }
            source.emit("end", Vec::new()).unwrap();
        })
    };

    let mut sum = 0u64;
    let mut last = None;
    let mut traversal = stream.traversal();
    while let Some(item) = traversal.next().await {
        let value = *item.unwrap().as_single().unwrap();
        if let Some(prev) = last {
            assert_eq!(value, prev + 1);
        }
        last = Some(value);
        sum += value;
    }
    producer.join().unwrap();

    assert_eq!(sum, (0..5_000u64).sum::<u64>());
    assert!(!stream.is_paused());
    assert_eq!(stream.stats().total_returned, 5_000);
}
