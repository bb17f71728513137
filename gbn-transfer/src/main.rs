//! Entry point for `gbn-transfer`.
//!
//! Parses CLI arguments and dispatches into either **send** or **receive**
//! mode.  All protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, argument parsing, file I/O, exit codes).

use std::io::{Read, Write};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use gbn_transfer::receiver;
use gbn_transfer::simulator::{LossyTransport, SimulatorConfig};
use gbn_transfer::{TransferConfig, TransferEngine, UdpTransport};

/// Reliable file transfer over UDP using Go-Back-N.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Send a file (or stdin) to a receiver.
    Send {
        /// Receiver IP address.
        server_ip: IpAddr,
        /// Receiver UDP port.
        server_port: u16,
        /// Payload bytes per packet (1-511).
        #[arg(value_parser = clap::value_parser!(u16).range(1..512))]
        chunk_size: u16,
        /// Go-Back-N window size.
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        window_size: u32,
        /// File to send; reads stdin when omitted.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Receive one transfer and acknowledge it.
    Receive {
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:9000")]
        bind: SocketAddr,
        /// Probability of dropping each datagram, for testing.
        #[arg(short, long, default_value_t = 0.0)]
        loss_rate: f64,
        /// Seed for the loss simulator.
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Seconds of silence after which an unfinished session is closed.
        #[arg(long, default_value_t = 30)]
        idle_secs: u64,
        /// Where to write the received stream; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Send {
            server_ip,
            server_port,
            chunk_size,
            window_size,
            file,
        } => {
            let peer = SocketAddr::new(server_ip, server_port);
            let data = read_input(file.as_deref())?;
            let config = TransferConfig::new(peer, chunk_size.into(), window_size as usize)?;

            let transport = UdpTransport::bind_for(peer)
                .await
                .context("creating UDP socket")?;
            log::info!("Sending {} bytes to {peer}", data.len());

            let report = TransferEngine::new(transport, &config, data)?
                .run()
                .await
                .context("transfer failed")?;
            log::info!("{report:?}");
        }
        Mode::Receive {
            bind,
            loss_rate,
            seed,
            idle_secs,
            output,
        } => {
            anyhow::ensure!(
                (0.0..=1.0).contains(&loss_rate),
                "loss rate must be between 0 and 1"
            );
            let socket = UdpTransport::bind(bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            let transport = LossyTransport::new(
                socket,
                SimulatorConfig {
                    loss_rate,
                    seed,
                    ..Default::default()
                },
            );
            log::info!("Receiving on {bind} (loss rate {loss_rate})");

            let received = receiver::serve(&transport, Some(Duration::from_secs(idle_secs)))
                .await
                .context("receive failed")?;
            // Whatever arrived is still written, but a missing teardown
            // fails the process.
            write_output(output.as_deref(), &received.data)?;
            received.ensure_complete().context("receive failed")?;
        }
    }

    Ok(())
}

fn read_input(path: Option<&std::path::Path>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let mut data = Vec::new();
            std::io::stdin()
                .read_to_end(&mut data)
                .context("reading stdin")?;
            Ok(data)
        }
    }
}

fn write_output(path: Option<&std::path::Path>, data: &[u8]) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            let mut out = std::io::stdout().lock();
            out.write_all(data).context("writing stdout")?;
            out.flush().context("flushing stdout")
        }
    }
}
