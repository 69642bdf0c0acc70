//! Per-endpoint configuration (spec §4.7).

use std::time::Duration;

use crate::constants::SKIP_THRESHOLD;

/// Parameters used to configure an [`Endpoint`](crate::Endpoint).
///
/// `WINDOW_SIZE`, `TIMEOUT`, `MAX_RETRIES`, and `MAX_PAYLOAD_SIZE` are fixed
/// protocol constants (see [`crate::constants`]) and are not configurable here;
/// the only tunable the spec calls for is the receiver's skip deadline.
#[derive(Clone, Copy, Debug)]
pub struct EndpointConfig {
    /// How long the receiver waits for a missing reliable sequence to arrive
    /// before skipping past it. Defaults to [`SKIP_THRESHOLD`].
    pub skip_threshold: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            skip_threshold: SKIP_THRESHOLD,
        }
    }
}

impl EndpointConfig {
    /// Creates a configuration with the default skip threshold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the skip threshold.
    pub fn skip_threshold(mut self, threshold: Duration) -> Self {
        self.skip_threshold = threshold;
        self
    }
}
