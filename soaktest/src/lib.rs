//! A long-running soak test against an S3-compatible storage service.
//!
//! The runner creates a randomly named container, seeds it with a handful of
//! small blobs, and then lists the container page-by-page in a polling loop
//! for the configured duration, which defaults to 20 days. Alongside the
//! loop, a periodic sampler snapshots process memory usage together with the
//! loop counters. The point is to surface slow resource leaks or connection
//! degradation in the storage client over multi-day runs, not to measure
//! throughput.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod sampler;
pub mod soaktest;

pub use crate::config::Config;
pub use crate::soaktest::{SoakState, run};
