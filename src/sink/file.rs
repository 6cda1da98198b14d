//! Writes blocks to a directory.
//!
//! Each block becomes `block_<seq>_<timestamp>.bin`. With CSV output
//! enabled a `.csv` companion lists one byte per row under a `Values`
//! column, next to a `Bins` column holding 0-255 for spreadsheet
//! histogram tools.

use super::{EntropySink, SinkError};
use crate::analysis::BlockStatistics;
use crate::extraction::EntropyBlock;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct FileSink {
    directory: PathBuf,
    write_csv: bool,
    written: Vec<PathBuf>,
    last_statistics: Option<BlockStatistics>,
}

impl FileSink {
    /// Creates the sink, creating `directory` if needed.
    pub fn new(directory: impl Into<PathBuf>, write_csv: bool) -> Result<Self, SinkError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            write_csv,
            written: Vec::new(),
            last_statistics: None,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Every file written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Statistics of the most recently written block.
    pub fn last_statistics(&self) -> Option<&BlockStatistics> {
        self.last_statistics.as_ref()
    }

    fn csv(block: &EntropyBlock) -> String {
        let mut out = String::with_capacity(block.len() * 8 + 12);
        out.push_str("Values,Bins\n");
        for (i, byte) in block.data().iter().enumerate() {
            let row = if i < 256 {
                format!("{},{}\n", byte, i)
            } else {
                format!("{}\n", byte)
            };
            out.push_str(&row);
        }
        out
    }
}

impl EntropySink for FileSink {
    fn deliver(&mut self, block: &EntropyBlock) -> Result<(), SinkError> {
        let stem = format!(
            "block_{}_{}",
            block.sequence(),
            Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
        );

        let bin = self.directory.join(format!("{}.bin", stem));
        fs::write(&bin, block.data())?;
        self.written.push(bin.clone());

        if self.write_csv {
            let csv = self.directory.join(format!("{}.csv", stem));
            fs::write(&csv, Self::csv(block))?;
            self.written.push(csv);
        }

        let stats = BlockStatistics::analyze(block.data());
        tracing::info!(
            sequence = block.sequence(),
            bytes = block.len(),
            bit_bias = stats.bit_bias,
            entropy = stats.entropy,
            fingerprint = %block.fingerprint().to_hex(),
            path = %bin.display(),
            "Block written"
        );
        if !stats.looks_reasonable() {
            tracing::warn!(
                sequence = block.sequence(),
                bit_bias = stats.bit_bias,
                entropy = stats.entropy,
                "Written block looks skewed"
            );
        }
        self.last_statistics = Some(stats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("true-entropy-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_writes_binary_block() {
        let dir = temp_dir("bin");
        let mut sink = FileSink::new(&dir, false).unwrap();
        let block = EntropyBlock::from_bytes(vec![0xDE, 0xAD, 0xBE, 0xEF], 7, 250.0);

        sink.deliver(&block).unwrap();

        assert_eq!(sink.written().len(), 1);
        let path = &sink.written()[0];
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("block_7_"), "{}", name);
        assert!(name.ends_with(".bin"));
        assert_eq!(fs::read(path).unwrap(), block.data());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_records_block_statistics() {
        let dir = temp_dir("stats");
        let mut sink = FileSink::new(&dir, false).unwrap();
        assert!(sink.last_statistics().is_none());

        let counting: Vec<u8> = (0..=255).collect();
        sink.deliver(&EntropyBlock::from_bytes(counting, 1, 0.0)).unwrap();
        let stats = sink.last_statistics().unwrap();
        assert_eq!(stats.sample_size, 256);
        assert_eq!(stats.bit_bias, 0.0);
        assert!((stats.entropy - 8.0).abs() < 1e-12);
        assert!(stats.looks_reasonable());

        sink.deliver(&EntropyBlock::from_bytes(vec![0xFF; 64], 2, 0.0)).unwrap();
        let stats = sink.last_statistics().unwrap();
        assert!((stats.bit_bias - 0.5).abs() < 1e-12);
        assert!(!stats.looks_reasonable());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_writes_csv_companion() {
        let dir = temp_dir("csv");
        let mut sink = FileSink::new(&dir, true).unwrap();
        let data: Vec<u8> = (0..300).map(|i| (i % 7) as u8).collect();

        sink.deliver(&EntropyBlock::from_bytes(data, 1, 0.0)).unwrap();

        assert_eq!(sink.written().len(), 2);
        let csv = fs::read_to_string(&sink.written()[1]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Values,Bins");
        assert_eq!(lines.len(), 301);
        assert_eq!(lines[1], "0,0");
        assert_eq!(lines[256], "3,255");
        assert_eq!(lines[257], "4");

        fs::remove_dir_all(&dir).unwrap();
    }
}
