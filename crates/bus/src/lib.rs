pub mod zmq_bus;

use lht_audio::SampleBlock;

/// Best-effort baseband transport: captured blocks go out on the publish
/// side, blocks to transmit come in on the subscribe side. No delivery
/// guarantee in either direction and no backpressure toward the capture
/// path.
pub trait BasebandLink {
    /// Non-blocking send; a full outbound queue silently drops the block.
    fn publish(&mut self, block: &SampleBlock) -> Result<(), String>;

    /// Bounded wait for inbound baseband. Returns `Ok(false)` on timeout.
    fn poll_inbound(&mut self, timeout_ms: i64) -> Result<bool, String>;

    /// Non-blocking receive of one message, split into whole blocks. A
    /// message length that is not an exact multiple of the block byte size
    /// is a fatal protocol violation, distinct from "no message available"
    /// (`Ok(None)`).
    fn try_receive(&mut self) -> Result<Option<Vec<SampleBlock>>, String>;

    /// Discard everything queued inbound; returns the number of messages
    /// dropped. Called on entry into transmit so TX starts on fresh
    /// baseband.
    fn drain_inbound(&mut self) -> Result<usize, String>;
}

/// Source of PMT control records from the external PTT daemon.
pub trait PttSource {
    /// Non-blocking receive of one raw record.
    fn try_recv(&mut self) -> Result<Option<Vec<u8>>, String>;
}
