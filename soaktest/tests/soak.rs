//! Blackbox tests for the soak-test runner.
//!
//! These drive the full runner against the in-memory backend on tokio's
//! paused clock, which turns the multi-second delays of the real tool into
//! instant, deterministic steps.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use soaktest::config::Config;
use soaktest::sampler::{DiscardSink, TelemetrySink};
use soaktest::{SoakState, run};
use soaktest_storage::BlobStore;

fn test_config(duration: Duration) -> Config {
    Config {
        duration,
        // Determinism: no random spread on top of the poll delay.
        poll_jitter: Duration::ZERO,
        ..Config::default()
    }
}

#[derive(Debug, Clone, Default)]
struct RecordingSink {
    snapshots: Arc<Mutex<Vec<BTreeMap<String, f64>>>>,
}

impl TelemetrySink for RecordingSink {
    fn submit(&self, properties: &BTreeMap<String, f64>) {
        self.snapshots.lock().unwrap().push(properties.clone());
    }
}

#[tokio::test(start_paused = true)]
async fn one_second_run_completes_after_a_single_iteration() -> anyhow::Result<()> {
    let (store, backend) = BlobStore::in_memory();
    let state = Arc::new(SoakState::new());

    run(store, Arc::clone(&state), Box::new(DiscardSink), &test_config(Duration::from_secs(1))).await?;

    assert_eq!(state.loops(), 1);
    assert_eq!(state.last_count(), 20);

    // Setup seeded exactly one container with the reference blob set.
    let containers = backend.containers();
    assert_eq!(containers.len(), 1);
    let container = &containers[0];
    assert!(container.starts_with("test-"));
    assert_eq!(backend.object_count(container), Some(20));
    assert!(backend.contains(container, "blob0"));
    assert!(backend.contains(container, "blob19"));
    assert_eq!(
        backend.get_stored(container, "blob7").as_deref(),
        Some(b"content7".as_slice())
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn loops_increment_once_per_successful_iteration() -> anyhow::Result<()> {
    let (store, _backend) = BlobStore::in_memory();
    let state = Arc::new(SoakState::new());

    // Iterations land at t=0s, 3s and 6s; the 7s deadline is checked at 9s.
    run(store, Arc::clone(&state), Box::new(DiscardSink), &test_config(Duration::from_secs(7))).await?;

    assert_eq!(state.loops(), 3);
    assert_eq!(state.last_count(), 20);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn listing_failure_backs_off_and_recovers() -> anyhow::Result<()> {
    let (store, backend) = BlobStore::in_memory();
    backend.fail_next_lists(1);
    let state = Arc::new(SoakState::new());

    // The first iteration fails at t=0 and must wait the 10s error delay,
    // not the 3s poll delay: recovery happens at t=10, and its poll delay
    // carries past the 12s deadline. A wrong (short) back-off would fit
    // several more iterations before the deadline.
    run(store, Arc::clone(&state), Box::new(DiscardSink), &test_config(Duration::from_secs(12))).await?;

    assert_eq!(state.loops(), 1);
    assert_eq!(state.last_count(), 20);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn sampler_observes_loop_counters() -> anyhow::Result<()> {
    let (store, _backend) = BlobStore::in_memory();
    let state = Arc::new(SoakState::new());
    let sink = RecordingSink::default();

    run(store, Arc::clone(&state), Box::new(sink.clone()), &test_config(Duration::from_secs(7))).await?;

    let snapshots = sink.snapshots.lock().unwrap();
    assert!(!snapshots.is_empty());

    let last = snapshots.last().unwrap();
    assert_eq!(last["blob_count"], 20.0);
    assert!(last["loops"] >= 1.0);
    assert!(last["loops"] <= state.loops() as f64);
    assert!(last.contains_key("memory.rss"));
    assert!(last.contains_key("memory.heap_allocated"));
    assert!(last.contains_key("memory.heap_resident"));
    Ok(())
}
