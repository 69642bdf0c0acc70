//! Fixed protocol parameters shared by every layer of the transport.

use std::time::Duration;

/// Frame size cap; fits the internet MTU alongside IP and UDP headers.
pub const MAX_PACKET_SIZE: usize = 1400;

/// Fixed header length: 1 (channel_type) + 4 (seq_num) + 4 (ack_num) + 8 (timestamp).
pub const HEADER_SIZE: usize = 17;

/// Largest payload a single frame can carry.
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - HEADER_SIZE;

/// Selective-Repeat window size, shared by sender and receiver.
pub const WINDOW_SIZE: u32 = 32;

/// Retransmission deadline for an unacknowledged reliable packet.
pub const TIMEOUT: Duration = Duration::from_millis(200);

/// Per-packet retry cap before the sender gives up and drops it from the window.
pub const MAX_RETRIES: u32 = 5;

/// Sizing parameter for worker poll intervals, not an enforced rate limit.
pub const MAX_SEND_RATE: u32 = 100;

/// Default receiver skip deadline; overridable per endpoint via `EndpointConfig`.
pub const SKIP_THRESHOLD: Duration = Duration::from_millis(200);

/// Background worker tick / socket read-timeout granularity, derived from
/// `MAX_SEND_RATE` (finer than `TIMEOUT`, much finer than `SKIP_THRESHOLD`).
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);
