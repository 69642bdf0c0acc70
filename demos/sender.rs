//! Demo traffic generator: opens one `hudp` endpoint and sends a mix of
//! unreliable position snapshots and reliable event messages at a fixed rate,
//! then prints delivery/throughput statistics on exit.
//!
//! This binary is an ordinary consumer of the public `hudp` API; it has no
//! access to internal sender/receiver state.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use clap::Parser;
use serde::Serialize;

use hudp::{Endpoint, EndpointConfig};

#[derive(Parser, Debug)]
#[command(about = "hudp demo: sends mock game-state traffic to a peer endpoint")]
struct Args {
    /// Local address to bind.
    #[arg(long, default_value = "127.0.0.1:9000")]
    local: SocketAddr,

    /// Remote peer address.
    #[arg(long, default_value = "127.0.0.1:9001")]
    remote: SocketAddr,

    /// Snapshots sent per second on the unreliable channel.
    #[arg(long, default_value_t = 30)]
    rate: u32,

    /// Send one reliable event message every N unreliable snapshots.
    #[arg(long, default_value_t = 10)]
    reliable_every: u32,

    /// How long to run before printing stats and exiting.
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,
}

/// Mock per-tick game state, the unreliable payload.
#[derive(Serialize)]
struct Snapshot {
    tick: u64,
    x: f32,
    y: f32,
}

/// Mock discrete event, the reliable payload.
#[derive(Serialize)]
struct Event {
    tick: u64,
    kind: &'static str,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let endpoint = Endpoint::open(args.local, args.remote, EndpointConfig::default())
        .expect("failed to open endpoint");

    let period = Duration::from_secs_f64(1.0 / args.rate as f64);
    let deadline = Instant::now() + Duration::from_secs(args.duration_secs);

    let mut tick = 0u64;
    let mut unreliable_sent = 0u64;
    let mut reliable_sent = 0u64;
    let started = Instant::now();

    while Instant::now() < deadline {
        let snapshot = Snapshot {
            tick,
            x: (tick as f32 * 0.1).sin() * 100.0,
            y: (tick as f32 * 0.1).cos() * 100.0,
        };
        let bytes = serde_json::to_vec(&snapshot).expect("snapshot serializes");
        if endpoint.send(&bytes, false).is_ok() {
            unreliable_sent += 1;
        }

        if args.reliable_every > 0 && tick % args.reliable_every as u64 == 0 {
            let event = Event {
                tick,
                kind: "checkpoint",
            };
            let bytes = serde_json::to_vec(&event).expect("event serializes");
            if endpoint.send(&bytes, true).is_ok() {
                reliable_sent += 1;
            }
        }

        tick += 1;
        std::thread::sleep(period);
    }

    let elapsed = started.elapsed().as_secs_f64();
    println!("ran for {elapsed:.2}s");
    println!("unreliable snapshots sent: {unreliable_sent} ({:.1}/s)", unreliable_sent as f64 / elapsed);
    println!("reliable events sent: {reliable_sent} ({:.1}/s)", reliable_sent as f64 / elapsed);

    endpoint.close();
}
