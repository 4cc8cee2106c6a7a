// Copyright 2025-2026 CEMAXECUTER LLC

use lht_audio::SampleBlock;

use crate::{BasebandLink, PttSource};

/// ZeroMQ implementation of [`BasebandLink`]: a PUB socket bound at the RX
/// endpoint carrying captured blocks out, and a SUB socket bound at the TX
/// endpoint carrying blocks to transmit in. Both endpoints are bound by this
/// process; the GUI, decoder and modulator connect to them.
pub struct ZmqBasebandLink {
    publisher: zmq::Socket,
    subscriber: zmq::Socket,
    _ctx: zmq::Context,
    /// Interleaved integers per block; one message must carry a whole number
    /// of blocks.
    block_len: usize,
}

impl ZmqBasebandLink {
    pub fn bind(rx_endpoint: &str, tx_endpoint: &str, block_len: usize) -> Result<Self, String> {
        let ctx = zmq::Context::new();

        let publisher = ctx
            .socket(zmq::PUB)
            .map_err(|e| format!("zmq PUB socket: {}", e))?;
        publisher
            .set_sndhwm(1000)
            .map_err(|e| format!("zmq set_sndhwm: {}", e))?;
        publisher
            .bind(rx_endpoint)
            .map_err(|e| format!("baseband PUB bind to {}: {}", rx_endpoint, e))?;

        let subscriber = ctx
            .socket(zmq::SUB)
            .map_err(|e| format!("zmq SUB socket: {}", e))?;
        subscriber
            .set_subscribe(b"")
            .map_err(|e| format!("zmq subscribe: {}", e))?;
        subscriber
            .bind(tx_endpoint)
            .map_err(|e| format!("baseband SUB bind to {}: {}", tx_endpoint, e))?;

        eprintln!(
            "baseband bus: PUB {} / SUB {} ({} samples per block)",
            rx_endpoint, tx_endpoint, block_len
        );

        Ok(Self {
            publisher,
            subscriber,
            _ctx: ctx,
            block_len,
        })
    }
}

impl BasebandLink for ZmqBasebandLink {
    fn publish(&mut self, block: &SampleBlock) -> Result<(), String> {
        let bytes = block.to_bytes();
        match self.publisher.send(&bytes[..], zmq::DONTWAIT) {
            Ok(()) => Ok(()),
            // Outbound queue full: drop the block, never stall capture
            Err(zmq::Error::EAGAIN) => {
                log::debug!("baseband publish queue full, block dropped");
                Ok(())
            }
            Err(e) => Err(format!("baseband publish: {}", e)),
        }
    }

    fn poll_inbound(&mut self, timeout_ms: i64) -> Result<bool, String> {
        let n = self
            .subscriber
            .poll(zmq::POLLIN, timeout_ms)
            .map_err(|e| format!("baseband poll: {}", e))?;
        Ok(n > 0)
    }

    fn try_receive(&mut self) -> Result<Option<Vec<SampleBlock>>, String> {
        match self.subscriber.recv_bytes(zmq::DONTWAIT) {
            Ok(msg) => {
                let blocks = SampleBlock::split_message(&msg, self.block_len)
                    .map_err(|e| format!("misconfigured baseband producer: {}", e))?;
                Ok(Some(blocks))
            }
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(e) => Err(format!("baseband receive: {}", e)),
        }
    }

    fn drain_inbound(&mut self) -> Result<usize, String> {
        let mut n = 0;
        loop {
            match self.subscriber.recv_bytes(zmq::DONTWAIT) {
                Ok(_) => n += 1,
                Err(zmq::Error::EAGAIN) => return Ok(n),
                Err(e) => return Err(format!("baseband drain: {}", e)),
            }
        }
    }
}

/// ZeroMQ implementation of [`PttSource`]: SUB socket connected to the PTT
/// daemon's PUB endpoint.
pub struct ZmqPttSource {
    socket: zmq::Socket,
    _ctx: zmq::Context,
}

impl ZmqPttSource {
    pub fn connect(endpoint: &str) -> Result<Self, String> {
        let ctx = zmq::Context::new();
        let socket = ctx
            .socket(zmq::SUB)
            .map_err(|e| format!("zmq SUB socket: {}", e))?;
        socket
            .set_subscribe(b"")
            .map_err(|e| format!("zmq subscribe: {}", e))?;
        socket
            .connect(endpoint)
            .map_err(|e| format!("PTT SUB connect to {}: {}", endpoint, e))?;

        eprintln!("PTT bus: SUB connected to {}", endpoint);

        Ok(Self { socket, _ctx: ctx })
    }
}

impl PttSource for ZmqPttSource {
    fn try_recv(&mut self) -> Result<Option<Vec<u8>>, String> {
        match self.socket.recv_bytes(zmq::DONTWAIT) {
            Ok(msg) => Ok(Some(msg)),
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(e) => Err(format!("PTT receive: {}", e)),
        }
    }
}
