//! The public entry point: binds a socket, owns one sender and one receiver,
//! and exposes `send`/`recv`/`close` (spec §4.5, §6).

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::EndpointConfig;
use crate::constants::POLL_INTERVAL;
use crate::error::{HudpError, Result};
use crate::receiver::{Receiver, RecvOutcome};
use crate::sender::{self, Sender};

/// A bound H-UDP socket endpoint: one sender, one receiver, one peer.
///
/// `send` and `recv` may be called concurrently from any thread; `Endpoint`
/// is `Send + Sync`. `close` signals both background workers to stop, wakes
/// any thread blocked in `send` (reliable, window full) or `recv`, and joins
/// the workers before returning.
pub struct Endpoint {
    sender: Arc<Sender>,
    receiver: Arc<Receiver>,
    shutdown: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Endpoint {
    /// Binds `local_addr`, targets `remote_addr`, and starts the background
    /// workers. `config` controls the receiver's skip threshold.
    pub fn open<A, B>(local_addr: A, remote_addr: B, config: EndpointConfig) -> Result<Self>
    where
        A: ToSocketAddrs,
        B: ToSocketAddrs,
    {
        let socket = UdpSocket::bind(local_addr)?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;

        let remote_addr = remote_addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| HudpError::TransientIOError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "remote_addr resolved to no addresses",
            )))?;

        let socket = Arc::new(socket);
        let shutdown = Arc::new(AtomicBool::new(false));

        let (ack_tx, ack_rx) = sender::ack_channel();

        let sender = Arc::new(Sender::new(
            Arc::clone(&socket),
            remote_addr,
            Arc::clone(&shutdown),
        ));
        let receiver = Arc::new(Receiver::new(
            Arc::clone(&socket),
            config.skip_threshold,
            ack_tx,
            Arc::clone(&shutdown),
        ));

        let mut workers = sender.spawn_workers(ack_rx);
        workers.push(receiver.spawn_worker());

        tracing::debug!(%remote_addr, "endpoint opened");

        Ok(Self {
            sender,
            receiver,
            shutdown,
            workers: Mutex::new(workers),
        })
    }

    /// Same as [`Endpoint::open`], resolving `local_addr`/`remote_addr` to the
    /// peer's socket address.
    pub fn connect(local_addr: SocketAddr, remote_addr: SocketAddr) -> Result<Self> {
        Self::open(local_addr, remote_addr, EndpointConfig::default())
    }

    /// Sends `payload` on the reliable or unreliable channel.
    ///
    /// Fails with [`HudpError::PayloadTooLarge`] if `payload` exceeds
    /// `MAX_PAYLOAD_SIZE`, or [`HudpError::EndpointClosed`] after `close`.
    /// Reliable sends suspend the caller while the send window is full.
    pub fn send(&self, payload: &[u8], reliable: bool) -> Result<u32> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(HudpError::EndpointClosed);
        }

        if reliable {
            self.sender.send_reliable(payload)
        } else {
            self.sender.send_unreliable(payload)
        }
    }

    /// Waits up to `timeout` (or indefinitely if `None`) for the next packet
    /// from either channel, in arrival/delivery order.
    pub fn recv(&self, timeout: Option<Duration>) -> Result<RecvOutcome> {
        self.receiver.recv(timeout)
    }

    /// How many reliable sequences have been skipped by the receiver so far.
    pub fn skipped_count(&self) -> u64 {
        self.receiver.skip_count()
    }

    /// How many reliable sequences are currently unacknowledged in the send
    /// window. Exposed for tests exercising the window-bound invariant.
    pub fn window_len(&self) -> usize {
        self.sender.window_len()
    }

    /// Signals both background workers to terminate, wakes any blocked
    /// `send`/`recv` caller, and joins the workers before releasing the
    /// socket. Idempotent: calling `close` more than once is a no-op after
    /// the first call.
    pub fn close(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        self.sender.wake_all();
        self.receiver.wake_all();

        let handles = std::mem::take(&mut *self.workers.lock().unwrap());
        for handle in handles {
            let _ = handle.join();
        }

        tracing::debug!("endpoint closed");
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn bind_pair() -> (Endpoint, Endpoint) {
        let a = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let a_addr = a.local_addr().unwrap();
        drop(a);
        let b = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let b_addr = b.local_addr().unwrap();
        drop(b);

        let ep_a = Endpoint::connect(a_addr, b_addr).unwrap();
        let ep_b = Endpoint::connect(b_addr, a_addr).unwrap();
        (ep_a, ep_b)
    }

    #[test]
    fn unreliable_round_trip() {
        let (sender_ep, receiver_ep) = bind_pair();

        sender_ep.send(b"ping", false).unwrap();

        let outcome = receiver_ep.recv(Some(Duration::from_secs(1))).unwrap();
        match outcome {
            RecvOutcome::Packet(p) => assert_eq!(&*p.payload, b"ping"),
            RecvOutcome::Timeout => panic!("expected a packet within 1s"),
        }
    }

    #[test]
    fn reliable_round_trip_with_ack() {
        let (sender_ep, receiver_ep) = bind_pair();

        sender_ep.send(b"reliable-hello", true).unwrap();

        let outcome = receiver_ep.recv(Some(Duration::from_secs(1))).unwrap();
        match outcome {
            RecvOutcome::Packet(p) => assert_eq!(&*p.payload, b"reliable-hello"),
            RecvOutcome::Timeout => panic!("expected a packet within 1s"),
        }

        // The sender's window should empty out once the ack round-trips.
        std::thread::sleep(Duration::from_millis(100));
    }

    #[test]
    fn operations_after_close_fail() {
        let (sender_ep, _receiver_ep) = bind_pair();
        sender_ep.close();

        let err = sender_ep.send(b"x", true).unwrap_err();
        assert!(matches!(err, HudpError::EndpointClosed));

        let err = sender_ep.recv(Some(Duration::from_millis(10))).unwrap_err();
        assert!(matches!(err, HudpError::EndpointClosed));
    }
}
