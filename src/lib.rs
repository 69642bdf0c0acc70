
#![warn(missing_docs)]

//! `hudp` is a hybrid UDP transport for real-time games. A single endpoint
//! multiplexes two logical channels over one datagram socket:
//!
//! * a **reliable** channel, delivered in order and at most once via
//!   Selective Repeat, with a timeout-bounded skip policy so a missing packet
//!   never blocks delivery indefinitely;
//! * an **unreliable** channel, delivered fire-and-forget with no ordering or
//!   acknowledgement guarantees.
//!
//! # Opening a connection
//!
//! ```no_run
//! use hudp::{Endpoint, EndpointConfig};
//!
//! let endpoint = Endpoint::open("127.0.0.1:9001", "127.0.0.1:9000", EndpointConfig::default())?;
//! # Ok::<(), hudp::HudpError>(())
//! ```
//!
//! # Sending Data
//!
//! ```no_run
//! # use hudp::{Endpoint, EndpointConfig};
//! # let endpoint = Endpoint::open("127.0.0.1:9003", "127.0.0.1:9000", EndpointConfig::default())?;
//! endpoint.send(b"snapshot", false)?; // unreliable
//! endpoint.send(b"chat message", true)?; // reliable
//! # Ok::<(), hudp::HudpError>(())
//! ```
//!
//! # Closing a Connection
//!
//! Dropping an [`Endpoint`] closes it; [`Endpoint::close`] can also be called
//! explicitly and is idempotent.

pub mod config;
pub mod constants;
pub mod endpoint;
pub mod error;
pub mod packet;
pub mod receive_buffer;
pub mod receiver;
pub mod sender;

pub use config::EndpointConfig;
pub use endpoint::Endpoint;
pub use error::{HudpError, Result};
pub use packet::{ChannelType, Packet};
pub use receiver::RecvOutcome;

pub use constants::{
    HEADER_SIZE, MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE, MAX_RETRIES, MAX_SEND_RATE, SKIP_THRESHOLD,
    TIMEOUT, WINDOW_SIZE,
};
