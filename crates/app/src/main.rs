mod relay;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use lht_audio::pcm::AlsaEndpoint;
use lht_bus::zmq_bus::{ZmqBasebandLink, ZmqPttSource};
use relay::Relay;

#[derive(Parser, Debug)]
#[command(name = "baseband-relay")]
#[command(about = "SX1255 baseband <-> ZeroMQ relay with PTT-driven RX/TX switching")]
struct Cli {
    /// ALSA capture device for baseband RX
    #[arg(long, default_value = "hw:SX1255")]
    rx_dev: String,

    /// ALSA playback device for baseband TX
    #[arg(long, default_value = "hw:SX1255,1")]
    tx_dev: String,

    /// PUB endpoint for captured baseband
    #[arg(long, default_value = "ipc:///tmp/bsb_rx")]
    rx_endpoint: String,

    /// SUB endpoint for baseband to transmit
    #[arg(long, default_value = "ipc:///tmp/bsb_tx")]
    tx_endpoint: String,

    /// PTT daemon endpoint
    #[arg(long, default_value = "ipc:///tmp/ptt_msg")]
    ptt_endpoint: String,

    /// Sample rate in Hz
    #[arg(short, long, default_value = "500000")]
    rate: u32,

    /// Interleaved I/Q integers per block (two per complex sample)
    #[arg(long, default_value = "2048")]
    block_len: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.verbose {
        log::info!("baseband-relay starting");
        log::info!("devices: {} (RX) / {} (TX)", cli.rx_dev, cli.tx_dev);
        log::info!("rate: {} Hz, block: {} samples", cli.rate, cli.block_len);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown_flag.store(true, Ordering::Relaxed);
    }) {
        eprintln!("failed to install signal handler: {}", e);
        std::process::exit(1);
    }

    let baseband = match ZmqBasebandLink::bind(&cli.rx_endpoint, &cli.tx_endpoint, cli.block_len) {
        Ok(link) => link,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    let ptt = match ZmqPttSource::connect(&cli.ptt_endpoint) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    let endpoint = match AlsaEndpoint::open(&cli.rx_dev, &cli.tx_dev, cli.rate, cli.block_len) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    let mut relay = Relay::new(endpoint, baseband, ptt, shutdown);
    if let Err(e) = relay.run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
    // Bus sockets unbind when the relay is dropped here
}
