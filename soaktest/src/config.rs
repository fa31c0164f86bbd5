//! Runner configuration, loaded from a YAML file.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for a soak-test run.
///
/// Every field has a default matching the reference behavior, so a config
/// file only needs to override what differs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage service endpoint, e.g. `http://localhost:9000`.
    ///
    /// Left empty, the `STORAGE_ENDPOINT` environment variable applies
    /// instead. The final value is handed to the client unvalidated.
    pub endpoint: String,
    /// Region label passed to the S3 client.
    pub region: String,
    /// Use path-style addressing; usually required for custom endpoints.
    pub path_style: bool,
    /// Prefix for the randomized container name.
    pub container_prefix: String,
    /// Number of blobs uploaded during setup.
    pub seed_blobs: usize,
    /// Maximum number of items per listing page.
    pub page_size: usize,
    /// Total wall-clock duration of the run.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// Base delay between successful iterations.
    #[serde(with = "humantime_serde")]
    pub poll_delay: Duration,
    /// Upper bound of the random delay added to `poll_delay`.
    #[serde(with = "humantime_serde")]
    pub poll_jitter: Duration,
    /// Delay after a failed iteration.
    #[serde(with = "humantime_serde")]
    pub error_delay: Duration,
    /// Period of the memory sampler.
    #[serde(with = "humantime_serde")]
    pub sample_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: "us-east-1".to_owned(),
            path_style: true,
            container_prefix: "test-".to_owned(),
            seed_blobs: 20,
            page_size: 3,
            duration: Duration::from_secs(20 * 24 * 60 * 60),
            poll_delay: Duration::from_secs(3),
            poll_jitter: Duration::from_millis(100),
            error_delay: Duration::from_secs(10),
            sample_interval: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// The endpoint to hand to the storage client.
    pub fn resolved_endpoint(&self) -> String {
        if self.endpoint.is_empty() {
            std::env::var("STORAGE_ENDPOINT").unwrap_or_default()
        } else {
            self.endpoint.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behavior() {
        let config: Config = serde_yaml::from_str("{}").unwrap();

        assert_eq!(config.seed_blobs, 20);
        assert_eq!(config.page_size, 3);
        assert_eq!(config.duration, Duration::from_secs(20 * 24 * 60 * 60));
        assert_eq!(config.poll_delay, Duration::from_secs(3));
        assert_eq!(config.poll_jitter, Duration::from_millis(100));
        assert_eq!(config.error_delay, Duration::from_secs(10));
        assert_eq!(config.sample_interval, Duration::from_secs(5));
        assert_eq!(config.container_prefix, "test-");
    }

    #[test]
    fn parses_humantime_durations() {
        let yaml = "
            endpoint: http://localhost:9000
            duration: 1h
            poll_delay: 500ms
            sample_interval: 30s
        ";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.endpoint, "http://localhost:9000");
        assert_eq!(config.duration, Duration::from_secs(3600));
        assert_eq!(config.poll_delay, Duration::from_millis(500));
        assert_eq!(config.sample_interval, Duration::from_secs(30));
    }
}
