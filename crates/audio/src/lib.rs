pub mod pcm;

/// One period of baseband: interleaved I,Q,I,Q,... as i32, little-endian on
/// the wire. The length is fixed at process start; partial blocks are never
/// published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBlock {
    data: Vec<i32>,
}

impl SampleBlock {
    /// Wrap a full block of interleaved samples. `data.len()` must be the
    /// configured block length (even, one period).
    pub fn from_samples(data: Vec<i32>) -> Self {
        debug_assert!(data.len() % 2 == 0);
        Self { data }
    }

    /// Number of interleaved integers in the block.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of complex (I,Q) samples.
    pub fn frames(&self) -> usize {
        self.data.len() / 2
    }

    pub fn as_samples(&self) -> &[i32] {
        &self.data
    }

    /// Serialize for the baseband bus: raw little-endian i32s, no header.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 4);
        for s in &self.data {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    /// Deserialize exactly one block of `block_len` interleaved integers.
    pub fn from_bytes(bytes: &[u8], block_len: usize) -> Result<Self, String> {
        if bytes.len() != block_len * 4 {
            return Err(format!(
                "expected {} bytes for one block, got {}",
                block_len * 4,
                bytes.len()
            ));
        }
        let data = bytes
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { data })
    }

    /// Split a bus message into whole blocks. A length that is not an exact
    /// multiple of the block byte size means the sender is misconfigured and
    /// is reported as an error; an empty message yields no blocks.
    pub fn split_message(bytes: &[u8], block_len: usize) -> Result<Vec<Self>, String> {
        let block_bytes = block_len * 4;
        if bytes.len() % block_bytes != 0 {
            return Err(format!(
                "baseband message of {} bytes is not a multiple of the {} byte block size",
                bytes.len(),
                block_bytes
            ));
        }
        bytes
            .chunks_exact(block_bytes)
            .map(|c| Self::from_bytes(c, block_len))
            .collect()
    }
}

/// Outcome of a capture read attempt.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A full period was read.
    Block(SampleBlock),
    /// Fewer frames than one period; discard and retry next iteration.
    ShortRead,
    /// Capture overrun; recover and retry next iteration.
    Xrun,
}

/// Outcome of a playback write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Playback underrun; recover, re-check control, retry.
    Xrun,
}

/// Which of the two device sessions an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDir {
    Capture,
    Playback,
}

/// Seam between the relay state machine and the baseband device. The real
/// implementation is [`pcm::AlsaEndpoint`]; tests substitute a recording
/// double.
pub trait BasebandEndpoint {
    /// Bounded wait for the capture session to have at least one period
    /// available. Returns `Ok(false)` on timeout.
    fn wait_readable(&mut self, timeout_ms: u32) -> Result<bool, String>;

    /// Attempt to read exactly one period from the capture session.
    fn read_block(&mut self) -> Result<ReadOutcome, String>;

    /// Attempt to write exactly one period to the playback session. A single
    /// attempt; the retry-through-recovery loop belongs to the caller so a
    /// PTT release can interrupt it.
    fn write_block(&mut self, block: &SampleBlock) -> Result<WriteOutcome, String>;

    /// Stop and re-arm BOTH sessions. Called unconditionally on every state
    /// transition so no stale frames cross a PTT boundary.
    fn reset(&mut self) -> Result<(), String>;

    /// Run the device's xrun recovery for one session, escalating through a
    /// reopen/reconfigure cycle on persistent failure. An error here is
    /// fatal.
    fn recover(&mut self, dir: StreamDir) -> Result<(), String>;

    /// Drain both sessions ahead of process exit.
    fn shutdown(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_of(len: usize, fill: i32) -> SampleBlock {
        SampleBlock::from_samples(vec![fill; len])
    }

    #[test]
    fn test_block_byte_round_trip() {
        let block = SampleBlock::from_samples(vec![0, -1, i32::MIN, i32::MAX, 42, -42]);
        let bytes = block.to_bytes();
        assert_eq!(bytes.len(), 24);
        assert_eq!(SampleBlock::from_bytes(&bytes, 6).unwrap(), block);
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        let bytes = block_of(8, 7).to_bytes();
        assert!(SampleBlock::from_bytes(&bytes[..bytes.len() - 1], 8).is_err());
        assert!(SampleBlock::from_bytes(&bytes, 6).is_err());
    }

    #[test]
    fn test_split_message_whole_blocks() {
        let mut bytes = block_of(4, 1).to_bytes();
        bytes.extend(block_of(4, 2).to_bytes());
        bytes.extend(block_of(4, 3).to_bytes());

        let blocks = SampleBlock::split_message(&bytes, 4).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].as_samples(), &[1, 1, 1, 1]);
        assert_eq!(blocks[2].as_samples(), &[3, 3, 3, 3]);
    }

    #[test]
    fn test_split_message_rejects_partial_block() {
        // One byte short of a whole block is a protocol violation
        let bytes = block_of(4, 1).to_bytes();
        assert!(SampleBlock::split_message(&bytes[..bytes.len() - 1], 4).is_err());
    }

    #[test]
    fn test_split_message_empty_is_no_blocks() {
        assert_eq!(SampleBlock::split_message(&[], 4).unwrap().len(), 0);
    }
}
