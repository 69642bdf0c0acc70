//! Demo traffic sink: opens one `hudp` endpoint, receives the mock payloads
//! produced by `hudp-demo-sender`, and prints running delivery/latency/jitter
//! statistics per RFC 3550 §6.4.1.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use clap::Parser;
use serde::Deserialize;

use hudp::{ChannelType, Endpoint, EndpointConfig, RecvOutcome};

#[derive(Parser, Debug)]
#[command(about = "hudp demo: receives mock game-state traffic from a peer endpoint")]
struct Args {
    /// Local address to bind.
    #[arg(long, default_value = "127.0.0.1:9001")]
    local: SocketAddr,

    /// Remote peer address.
    #[arg(long, default_value = "127.0.0.1:9000")]
    remote: SocketAddr,

    /// How long to run before printing final stats and exiting.
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GameMessage {
    Snapshot { tick: u64, x: f32, y: f32 },
    Event { tick: u64, kind: String },
}

/// RFC 3550 §6.4.1 running jitter estimator: `J += (|D| - J) / 16`, where `D`
/// is the difference between consecutive transit-time deltas.
#[derive(Default)]
struct JitterEstimator {
    prev_transit: Option<f64>,
    jitter: f64,
}

impl JitterEstimator {
    fn observe(&mut self, send_timestamp: f64, arrival: f64) {
        let transit = arrival - send_timestamp;
        if let Some(prev) = self.prev_transit {
            let d = (transit - prev).abs();
            self.jitter += (d - self.jitter) / 16.0;
        }
        self.prev_transit = Some(transit);
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let endpoint = Endpoint::open(args.local, args.remote, EndpointConfig::default())
        .expect("failed to open endpoint");

    let deadline = Instant::now() + Duration::from_secs(args.duration_secs);

    let mut snapshots_received = 0u64;
    let mut events_received = 0u64;
    let mut undecodable = 0u64;
    let mut unreliable_jitter = JitterEstimator::default();
    let started = Instant::now();

    while Instant::now() < deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let outcome = match endpoint.recv(Some(remaining.min(Duration::from_millis(200)))) {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("recv error: {e}");
                break;
            }
        };

        let packet = match outcome {
            RecvOutcome::Packet(p) => p,
            RecvOutcome::Timeout => continue,
        };

        let arrival = hudp::Packet::now_secs();
        if packet.channel_type == ChannelType::Unreliable {
            unreliable_jitter.observe(packet.timestamp, arrival);
        }

        match serde_json::from_slice::<GameMessage>(&packet.payload) {
            Ok(GameMessage::Snapshot { .. }) => snapshots_received += 1,
            Ok(GameMessage::Event { .. }) => events_received += 1,
            Err(_) => undecodable += 1,
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    println!("ran for {elapsed:.2}s");
    println!("snapshots received: {snapshots_received} ({:.1}/s)", snapshots_received as f64 / elapsed);
    println!("events received: {events_received} ({:.1}/s)", events_received as f64 / elapsed);
    println!("undecodable payloads: {undecodable}");
    println!("unreliable jitter estimate: {:.2} ms", unreliable_jitter.jitter * 1000.0);
    println!("skipped reliable sequences: {}", endpoint.skipped_count());

    endpoint.close();
}
