//! Error taxonomy shared by every core component (see spec §7).

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HudpError>;

/// Errors that can be raised by the transport core.
///
/// `RetriesExhausted` and `MalformedFrame` are produced internally by background
/// workers and are only ever logged (via `tracing`) — they are never returned to
/// an application caller, since the workers that encounter them have no caller
/// to return to. They remain part of this enum so the whole taxonomy lives in
/// one place, as described in spec §7.
#[derive(Error, Debug)]
pub enum HudpError {
    /// `send(...)` was called with a payload larger than `MAX_PAYLOAD_SIZE`.
    #[error("payload of {len} bytes exceeds MAX_PAYLOAD_SIZE ({max})")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        len: usize,
        /// The configured maximum.
        max: usize,
    },

    /// A received datagram was shorter than `HEADER_SIZE` and could not be parsed.
    #[error("frame of {len} bytes is shorter than the {header} byte header")]
    MalformedFrame {
        /// Size of the malformed datagram.
        len: usize,
        /// `HEADER_SIZE`.
        header: usize,
    },

    /// A socket read or write failed with a transient I/O error.
    #[error("transient I/O error: {0}")]
    TransientIOError(#[from] std::io::Error),

    /// A reliable packet was retransmitted `MAX_RETRIES` times without acknowledgement
    /// and has been dropped from the send window.
    #[error("reliable sequence {seq} dropped after {retries} retries")]
    RetriesExhausted {
        /// The sequence number that was dropped.
        seq: u32,
        /// How many retransmissions were attempted.
        retries: u32,
    },

    /// The operation was attempted after the endpoint was closed.
    #[error("endpoint is closed")]
    EndpointClosed,
}
