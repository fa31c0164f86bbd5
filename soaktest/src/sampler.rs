//! Periodic memory sampling alongside the poll loop.
//!
//! The sampler runs as its own task on a fixed period, independent of the
//! poll loop's delay cycle. Each tick reads the shared counters and a
//! process memory breakdown, assembles them into a flat property map, logs
//! a summary line, and hands the map to a [`TelemetrySink`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use bytesize::ByteSize;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tikv_jemalloc_ctl::{epoch, stats};
use tokio_util::sync::CancellationToken;

use crate::soaktest::SoakState;

/// Destination for sampled property maps.
///
/// This is the seam where snapshots would leave the process.
pub trait TelemetrySink: fmt::Debug + Send + Sync {
    /// Consumes one snapshot's flat property map.
    fn submit(&self, properties: &BTreeMap<String, f64>);
}

/// A sink that drops every snapshot.
///
/// TODO: forward snapshots to a metrics backend once one is picked.
#[derive(Debug)]
pub struct DiscardSink;

impl TelemetrySink for DiscardSink {
    fn submit(&self, _properties: &BTreeMap<String, f64>) {}
}

/// Point-in-time process memory readings, in bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemorySnapshot {
    /// Resident set size as reported by the OS.
    pub rss: u64,
    /// Bytes currently allocated from the heap.
    pub heap_allocated: u64,
    /// Bytes of physical memory held by the allocator, including
    /// bookkeeping and not-yet-returned freed memory.
    pub heap_resident: u64,
}

impl MemorySnapshot {
    fn capture(system: &mut System, pid: Pid) -> Self {
        // jemalloc caches its statistics; advancing the epoch refreshes them.
        if let Err(err) = epoch::advance() {
            tracing::debug!("failed to refresh jemalloc statistics: {err}");
        }
        let heap_allocated = stats::allocated::read().unwrap_or(0) as u64;
        let heap_resident = stats::resident::read().unwrap_or(0) as u64;

        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let rss = system.process(pid).map(|process| process.memory()).unwrap_or(0);

        Self { rss, heap_allocated, heap_resident }
    }
}

/// Reads the shared counters and process memory on a fixed period.
#[derive(Debug)]
pub struct Sampler {
    state: Arc<SoakState>,
    sink: Box<dyn TelemetrySink>,
    system: System,
    pid: Pid,
}

impl Sampler {
    /// Creates a sampler for the current process.
    pub fn new(state: Arc<SoakState>, sink: Box<dyn TelemetrySink>) -> Result<Self> {
        let pid = sysinfo::get_current_pid()
            .map_err(|err| anyhow!("failed to resolve current pid: {err}"))?;

        Ok(Self { state, sink, system: System::new(), pid })
    }

    /// Takes one snapshot, logs it, and returns the flat property map.
    pub fn sample(&mut self) -> BTreeMap<String, f64> {
        let elapsed = self.state.elapsed();
        let memory = MemorySnapshot::capture(&mut self.system, self.pid);
        let loops = self.state.loops();
        let blob_count = self.state.last_count();

        tracing::info!(
            loops,
            blob_count,
            rss = %ByteSize::b(memory.rss),
            heap = %ByteSize::b(memory.heap_allocated),
            elapsed_seconds = elapsed.as_secs(),
            "memory sample"
        );

        BTreeMap::from([
            ("elapsed_seconds".to_owned(), elapsed.as_secs_f64()),
            ("memory.rss".to_owned(), memory.rss as f64),
            ("memory.heap_allocated".to_owned(), memory.heap_allocated as f64),
            ("memory.heap_resident".to_owned(), memory.heap_resident as f64),
            ("loops".to_owned(), loops as f64),
            ("blob_count".to_owned(), blob_count as f64),
        ])
    }
}

/// Drives the sampler until the token is cancelled.
pub async fn run(mut sampler: Sampler, period: Duration, cancellation: CancellationToken) {
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancellation.cancelled() => break,
            _ = ticks.tick() => {
                let properties = sampler.sample();
                sampler.sink.submit(&properties);
            }
        }
    }
}
