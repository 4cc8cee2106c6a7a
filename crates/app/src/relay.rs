// Copyright 2025-2026 CEMAXECUTER LLC

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lht_audio::{BasebandEndpoint, ReadOutcome, StreamDir, WriteOutcome};
use lht_bus::{BasebandLink, PttSource};
use lht_control::ControlRecord;

/// Bounded wait on the capture session. Long enough to keep the loop off
/// the CPU when idle, short enough that a PTT event takes effect promptly.
const CAPTURE_WAIT_MS: u32 = 100;

/// Bounded poll for inbound baseband while transmitting.
const TX_POLL_MS: i64 = 20;

/// Direction the radio is currently serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Receiving,
    Transmitting,
}

/// Parameter store fed by SetParameter records. Consulted by the transition
/// logic only; updating a parameter never changes state by itself.
#[derive(Debug, Default)]
struct Params {
    sustain_ms: Option<u64>,
}

impl Params {
    fn set(&mut self, name: &str, value: &str) {
        match name {
            "SUST" => match value.parse::<u64>() {
                Ok(ms) => {
                    log::info!("TX sustain set to {} ms", ms);
                    self.sustain_ms = Some(ms);
                }
                Err(_) => log::warn!("bad sustain value: {}", value),
            },
            _ => log::warn!("unknown parameter {}={}, ignored", name, value),
        }
    }

    fn sustain(&self) -> Option<Duration> {
        self.sustain_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}

/// The relay state machine. Owns the audio endpoint and both buses; single
/// control loop, no threads, every wait bounded.
///
/// PTT mapping as contracted by the PTT daemon: a key press publishes SOT
/// (go transmit), a release publishes EOT (go back to receive).
pub struct Relay<E, B, P> {
    endpoint: E,
    baseband: B,
    ptt: P,
    state: RelayState,
    params: Params,
    /// Deadline of a sustain-deferred stop, if one is pending.
    pending_stop: Option<Instant>,
    shutdown: Arc<AtomicBool>,
}

impl<E: BasebandEndpoint, B: BasebandLink, P: PttSource> Relay<E, B, P> {
    pub fn new(endpoint: E, baseband: B, ptt: P, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            endpoint,
            baseband,
            ptt,
            state: RelayState::Receiving,
            params: Params::default(),
            pending_stop: None,
            shutdown,
        }
    }

    /// Run until the shutdown flag is set, then tear down synchronously on
    /// this path. Errors are fatal (startup-grade device failure or a bus
    /// protocol violation).
    pub fn run(&mut self) -> Result<(), String> {
        eprintln!("Running...");
        while !self.shutdown.load(Ordering::Relaxed) {
            self.iterate()?;
        }
        eprintln!("shutdown requested, cleaning up");
        self.endpoint.shutdown();
        Ok(())
    }

    fn iterate(&mut self) -> Result<(), String> {
        self.poll_control()?;

        if let Some(deadline) = self.pending_stop {
            if Instant::now() >= deadline {
                self.pending_stop = None;
                log::info!("sustain elapsed");
                self.stop_transmit()?;
            }
        }

        match self.state {
            RelayState::Receiving => self.run_receive(),
            RelayState::Transmitting => self.run_transmit(),
        }
    }

    /// Drain and apply every control record currently queued.
    fn poll_control(&mut self) -> Result<(), String> {
        while let Some(raw) = self.ptt.try_recv()? {
            match lht_control::decode(&raw) {
                Some(record) => self.apply(record)?,
                // Empty or truncated: nothing this iteration
                None => {}
            }
        }
        Ok(())
    }

    fn apply(&mut self, record: ControlRecord) -> Result<(), String> {
        match record {
            ControlRecord::Start => match self.state {
                RelayState::Receiving => {
                    eprintln!("PTT pressed");
                    // Reset first: no frame captured before the press may be
                    // published after it, and TX starts from a clean buffer
                    self.endpoint.reset()?;
                    self.state = RelayState::Transmitting;
                    let stale = self.baseband.drain_inbound()?;
                    if stale > 0 {
                        log::debug!("discarded {} stale baseband messages", stale);
                    }
                }
                RelayState::Transmitting => {
                    if self.pending_stop.take().is_some() {
                        log::info!("PTT pressed during sustain, staying in transmit");
                    } else {
                        log::info!("duplicate start while transmitting, ignored");
                    }
                }
            },
            ControlRecord::Stop => match self.state {
                RelayState::Transmitting => {
                    eprintln!("PTT released");
                    if self.pending_stop.is_some() {
                        log::info!("duplicate stop while sustain pending, ignored");
                    } else if let Some(sustain) = self.params.sustain() {
                        log::info!("sustaining transmit for {} ms", sustain.as_millis());
                        self.pending_stop = Some(Instant::now() + sustain);
                    } else {
                        self.stop_transmit()?;
                    }
                }
                RelayState::Receiving => {
                    log::info!("stop while already receiving, ignored");
                }
            },
            ControlRecord::SetParameter { name, value } => self.params.set(&name, &value),
            ControlRecord::Unrecognized => log::warn!("unrecognized PMT record, ignored"),
        }
        Ok(())
    }

    fn stop_transmit(&mut self) -> Result<(), String> {
        self.endpoint.reset()?;
        self.state = RelayState::Receiving;
        Ok(())
    }

    fn run_receive(&mut self) -> Result<(), String> {
        if !self.endpoint.wait_readable(CAPTURE_WAIT_MS)? {
            // Timeout: back to the control channel
            return Ok(());
        }
        match self.endpoint.read_block()? {
            ReadOutcome::Block(block) => self.baseband.publish(&block),
            ReadOutcome::ShortRead => Ok(()),
            ReadOutcome::Xrun => {
                log::debug!("capture overrun");
                self.endpoint.recover(StreamDir::Capture)
            }
        }
    }

    fn run_transmit(&mut self) -> Result<(), String> {
        if !self.baseband.poll_inbound(TX_POLL_MS)? {
            return Ok(());
        }
        let blocks = match self.baseband.try_receive()? {
            Some(blocks) => blocks,
            None => return Ok(()),
        };
        for block in &blocks {
            loop {
                match self.endpoint.write_block(block)? {
                    WriteOutcome::Written => break,
                    WriteOutcome::Xrun => {
                        log::debug!("playback underrun");
                        self.endpoint.recover(StreamDir::Playback)?;
                        // A PTT release must be able to interrupt a stalled
                        // write loop
                        self.poll_control()?;
                        if self.state != RelayState::Transmitting {
                            return Ok(());
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
