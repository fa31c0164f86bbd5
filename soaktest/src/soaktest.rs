//! The soak-test runner: container setup, the poll loop, and shared session
//! state.
//!
//! Setup errors are fatal and propagate out of [`run`]; listing errors
//! inside the loop are logged and absorbed with a longer back-off, since a
//! transient fault is exactly what a multi-day run is expected to ride out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use futures_util::TryStreamExt;
use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use soaktest_storage::BlobStore;

use crate::config::Config;
use crate::sampler::{self, Sampler, TelemetrySink};

/// Shared session state, written by the poll loop and read by the sampler.
///
/// Relaxed atomics are sufficient: the loop is the only writer, and the
/// sampler tolerates reading counters from between two iterations.
#[derive(Debug)]
pub struct SoakState {
    started_at: Instant,
    loops: AtomicU64,
    last_count: AtomicU64,
}

impl SoakState {
    /// Creates fresh state anchored at the current instant.
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            loops: AtomicU64::new(0),
            last_count: AtomicU64::new(0),
        }
    }

    /// Wall-clock time since the session started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Number of completed listing iterations.
    pub fn loops(&self) -> u64 {
        self.loops.load(Ordering::Relaxed)
    }

    /// Item count observed by the most recent successful iteration.
    pub fn last_count(&self) -> u64 {
        self.last_count.load(Ordering::Relaxed)
    }

    fn record_iteration(&self, count: u64) -> u64 {
        self.last_count.store(count, Ordering::Relaxed);
        self.loops.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for SoakState {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the complete soak test: setup, sampler, poll loop.
///
/// Returns once the configured duration has elapsed. The sampler is
/// cancelled on the way out; the container is intentionally left behind.
pub async fn run(
    store: BlobStore,
    state: Arc<SoakState>,
    sink: Box<dyn TelemetrySink>,
    config: &Config,
) -> Result<()> {
    let container = setup(&store, config).await?;

    let cancellation = CancellationToken::new();
    let sampler = Sampler::new(Arc::clone(&state), sink)?;
    let sampler_task = tokio::spawn(sampler::run(
        sampler,
        config.sample_interval,
        cancellation.clone(),
    ));

    poll_loop(&store, &container, state.as_ref(), config).await;

    tracing::info!(loops = state.loops(), "soak test finished");
    cancellation.cancel();
    sampler_task.await.context("sampler task panicked")?;

    Ok(())
}

/// Creates a randomly named container and seeds it with small blobs.
///
/// The name suffix is not checked for collisions; an existing container of
/// the same name surfaces as a creation error and aborts the run.
async fn setup(store: &BlobStore, config: &Config) -> Result<String> {
    let suffix: u32 = rand::rng().random_range(0..1_000_000);
    let container = format!("{}{}", config.container_prefix, suffix);
    store
        .create_container(&container)
        .await
        .with_context(|| format!("failed to create container {container}"))?;

    for i in 0..config.seed_blobs {
        let key = format!("blob{i}");
        let payload = Bytes::from(format!("content{i}"));
        store
            .put_object(&container, &key, payload)
            .await
            .with_context(|| format!("failed to upload {key}"))?;
    }

    tracing::info!(%container, blobs = config.seed_blobs, "container seeded");
    Ok(container)
}

async fn poll_loop(store: &BlobStore, container: &str, state: &SoakState, config: &Config) {
    while state.elapsed() < config.duration {
        match count_objects(store, container, config.page_size).await {
            Ok(count) => {
                let loops = state.record_iteration(count as u64);
                tracing::info!(count, loops, "listed container");
                tokio::time::sleep(config.poll_delay + jitter(config.poll_jitter)).await;
            }
            Err(err) => {
                tracing::warn!("listing failed: {err}");
                tokio::time::sleep(config.error_delay).await;
            }
        }
    }
}

/// Consumes one full page sequence and sums the item counts.
async fn count_objects(
    store: &BlobStore,
    container: &str,
    page_size: usize,
) -> soaktest_storage::Result<usize> {
    let mut pages = store.list_pages(container, page_size);
    let mut count = 0;
    while let Some(page) = pages.try_next().await? {
        count += page.items.len();
    }
    Ok(count)
}

fn jitter(bound: Duration) -> Duration {
    Duration::from_millis(rand::rng().random_range(0..=bound.as_millis() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_respects_bound() {
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
        for _ in 0..100 {
            assert!(jitter(Duration::from_millis(100)) <= Duration::from_millis(100));
        }
    }
}
