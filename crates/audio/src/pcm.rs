// Copyright 2025-2026 CEMAXECUTER LLC

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};

use crate::{BasebandEndpoint, ReadOutcome, SampleBlock, StreamDir, WriteOutcome};

/// ALSA implementation of [`BasebandEndpoint`]: one capture and one playback
/// session on the SX1255 baseband card, both S32LE / 2ch interleaved / fixed
/// rate, period size equal to one SampleBlock.
pub struct AlsaEndpoint {
    capture: PCM,
    playback: PCM,
    rx_dev: String,
    tx_dev: String,
    rate: u32,
    /// Complex frames per block (block_len / 2).
    frames: usize,
    capture_err: Option<alsa::Error>,
    playback_err: Option<alsa::Error>,
}

impl AlsaEndpoint {
    /// Open and configure both sessions. Any failure here is a startup
    /// precondition failure; the process cannot proceed.
    pub fn open(rx_dev: &str, tx_dev: &str, rate: u32, block_len: usize) -> Result<Self, String> {
        if block_len == 0 || block_len % 2 != 0 {
            return Err(format!(
                "block length must be a positive even number of interleaved samples, got {}",
                block_len
            ));
        }
        let frames = block_len / 2;

        let capture = Self::open_session(rx_dev, Direction::Capture, rate, frames)
            .map_err(|e| format!("baseband input device {}: {}", rx_dev, e))?;
        let playback = Self::open_session(tx_dev, Direction::Playback, rate, frames)
            .map_err(|e| format!("baseband output device {}: {}", tx_dev, e))?;

        log::info!(
            "opened {} (capture) and {} (playback): {} Hz, {} frames/period",
            rx_dev,
            tx_dev,
            rate,
            frames
        );

        Ok(Self {
            capture,
            playback,
            rx_dev: rx_dev.to_string(),
            tx_dev: tx_dev.to_string(),
            rate,
            frames,
            capture_err: None,
            playback_err: None,
        })
    }

    fn open_session(dev: &str, dir: Direction, rate: u32, frames: usize) -> Result<PCM, String> {
        let pcm = PCM::new(dev, dir, false).map_err(|e| format!("open: {}", e))?;
        {
            let hwp = HwParams::any(&pcm).map_err(|e| format!("hw params: {}", e))?;
            hwp.set_access(Access::RWInterleaved)
                .map_err(|e| format!("set access: {}", e))?;
            hwp.set_format(Format::S32LE)
                .map_err(|e| format!("set format: {}", e))?;
            hwp.set_channels(2)
                .map_err(|e| format!("set channels: {}", e))?;
            hwp.set_rate(rate, ValueOr::Nearest)
                .map_err(|e| format!("set rate: {}", e))?;
            hwp.set_period_size(frames as alsa::pcm::Frames, ValueOr::Nearest)
                .map_err(|e| format!("set period size: {}", e))?;
            pcm.hw_params(&hwp)
                .map_err(|e| format!("apply hw params: {}", e))?;
        }
        pcm.prepare().map_err(|e| format!("prepare: {}", e))?;
        Ok(pcm)
    }

    fn reopen(&mut self, dir: StreamDir) -> Result<(), String> {
        match dir {
            StreamDir::Capture => {
                self.capture =
                    Self::open_session(&self.rx_dev, Direction::Capture, self.rate, self.frames)?;
                self.capture_err = None;
            }
            StreamDir::Playback => {
                self.playback =
                    Self::open_session(&self.tx_dev, Direction::Playback, self.rate, self.frames)?;
                self.playback_err = None;
            }
        }
        log::info!("reopened {:?} session", dir);
        Ok(())
    }
}

impl BasebandEndpoint for AlsaEndpoint {
    fn wait_readable(&mut self, timeout_ms: u32) -> Result<bool, String> {
        match self.capture.wait(Some(timeout_ms)) {
            Ok(ready) => Ok(ready),
            // An xrun signaled through wait surfaces on the next read
            Err(e) if e.errno() == libc::EPIPE => {
                self.capture_err = Some(e);
                Ok(true)
            }
            Err(e) => Err(format!("capture wait: {}", e)),
        }
    }

    fn read_block(&mut self) -> Result<ReadOutcome, String> {
        let mut buf = vec![0i32; self.frames * 2];
        let io = self
            .capture
            .io_i32()
            .map_err(|e| format!("capture io: {}", e))?;
        match io.readi(&mut buf) {
            Ok(n) if n == self.frames => Ok(ReadOutcome::Block(SampleBlock::from_samples(buf))),
            Ok(n) => {
                log::debug!("short read: {} of {} frames", n, self.frames);
                Ok(ReadOutcome::ShortRead)
            }
            Err(e) => {
                if e.errno() != libc::EPIPE {
                    log::debug!("capture read error: {}", e);
                }
                self.capture_err = Some(e);
                Ok(ReadOutcome::Xrun)
            }
        }
    }

    fn write_block(&mut self, block: &SampleBlock) -> Result<WriteOutcome, String> {
        let io = self
            .playback
            .io_i32()
            .map_err(|e| format!("playback io: {}", e))?;
        match io.writei(block.as_samples()) {
            Ok(n) => {
                if n < block.frames() {
                    log::debug!("short write: {} of {} frames", n, block.frames());
                }
                Ok(WriteOutcome::Written)
            }
            Err(e) => {
                if e.errno() != libc::EPIPE {
                    log::debug!("playback write error: {}", e);
                }
                self.playback_err = Some(e);
                Ok(WriteOutcome::Xrun)
            }
        }
    }

    fn reset(&mut self) -> Result<(), String> {
        // Stop and re-arm both sessions, whichever direction was active.
        // Guarantees nothing queued before the transition is ever played or
        // published after it.
        self.capture
            .drop()
            .map_err(|e| format!("capture stop: {}", e))?;
        self.capture
            .prepare()
            .map_err(|e| format!("capture prepare: {}", e))?;
        self.playback
            .drop()
            .map_err(|e| format!("playback stop: {}", e))?;
        self.playback
            .prepare()
            .map_err(|e| format!("playback prepare: {}", e))?;
        self.capture_err = None;
        self.playback_err = None;
        Ok(())
    }

    fn recover(&mut self, dir: StreamDir) -> Result<(), String> {
        let (pcm, err) = match dir {
            StreamDir::Capture => (&self.capture, self.capture_err.take()),
            StreamDir::Playback => (&self.playback, self.playback_err.take()),
        };
        let res = match err {
            Some(e) => pcm.try_recover(e, true),
            None => pcm.prepare(),
        };
        if let Err(e) = res {
            log::warn!("{:?} recovery failed ({}), reopening session", dir, e);
            self.reopen(dir)
                .map_err(|e| format!("unrecoverable {:?} session: {}", dir, e))?;
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.capture.drain() {
            log::debug!("capture drain: {}", e);
        }
        if let Err(e) = self.playback.drain() {
            log::debug!("playback drain: {}", e);
        }
        log::info!("audio sessions drained");
    }
}
