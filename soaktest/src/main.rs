//! CLI entry point for the storage soak test.
//!
//! Loads the YAML configuration, wires up tracing and the storage client,
//! and hands control to the runner for the configured duration.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use argh::FromArgs;
use tracing_subscriber::EnvFilter;

use soaktest::config::Config;
use soaktest::sampler::DiscardSink;
use soaktest::{SoakState, run};
use soaktest_storage::BlobStore;

// The sampler reports heap statistics through jemalloc, so jemalloc has to
// be the allocator actually serving the process.
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Long-running listing soak test against an S3-compatible storage service.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the yaml configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    initialize_tracing();

    let config = match args.config {
        Some(path) => {
            let file = std::fs::File::open(path).context("failed to open config file")?;
            serde_yaml::from_reader(file).context("failed to parse config YAML")?
        }
        None => Config::default(),
    };
    tracing::debug!(?config);

    let endpoint = config.resolved_endpoint();
    let store = BlobStore::s3_compatible(&endpoint, &config.region, config.path_style)
        .context("failed to initialize storage client")?;

    let state = Arc::new(SoakState::new());
    run(store, state, Box::new(DiscardSink), &config)
        .await
        .context("failed to run soak test")
}

fn initialize_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,soaktest=debug,soaktest_storage=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}
