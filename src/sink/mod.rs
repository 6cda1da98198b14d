//! Block delivery targets.

mod file;

pub use file::FileSink;

use crate::extraction::EntropyBlock;
use thiserror::Error;

/// Errors that can occur while delivering a block.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for validated entropy blocks.
pub trait EntropySink {
    /// Accepts one block. Blocks arrive in sequence order.
    fn deliver(&mut self, block: &EntropyBlock) -> Result<(), SinkError>;
}

/// Keeps every delivered block in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    blocks: Vec<EntropyBlock>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[EntropyBlock] {
        &self.blocks
    }

    /// Total bytes held.
    pub fn total_bytes(&self) -> usize {
        self.blocks.iter().map(EntropyBlock::len).sum()
    }

    pub fn into_blocks(self) -> Vec<EntropyBlock> {
        self.blocks
    }
}

impl EntropySink for MemorySink {
    fn deliver(&mut self, block: &EntropyBlock) -> Result<(), SinkError> {
        self.blocks.push(block.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.deliver(&EntropyBlock::from_bytes(vec![1; 4], 1, 0.0)).unwrap();
        sink.deliver(&EntropyBlock::from_bytes(vec![2; 6], 2, 0.0)).unwrap();

        assert_eq!(sink.total_bytes(), 10);
        let sequences: Vec<u64> = sink.blocks().iter().map(EntropyBlock::sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }
}
