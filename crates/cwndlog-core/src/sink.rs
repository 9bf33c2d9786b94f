//! TSV sink for samples.
//!
//! # Storage Format
//!
//! One file per run, truncated at start, no header row. Each line is one
//! [`Sample`] record:
//!
//! ```text
//! run_label <TAB> "" <TAB> capture_time <TAB> "" <TAB> field_1 ... field_N
//! ```
//!
//! Lines end in a bare `\n`, not the `\r\n` some delimited-text writers
//! emit.
//!
//! Every record is flushed as soon as it is written so a killed run still
//! leaves complete lines behind.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::sample::Sample;

/// Handles incremental file I/O for a sampling run.
pub struct SampleWriter {
    writer: BufWriter<File>,
    records_written: u64,
}

impl SampleWriter {
    /// Create (or truncate) the output file.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            records_written: 0,
        })
    }

    /// Write one record and flush it.
    pub fn write_sample(&mut self, sample: &Sample) -> std::io::Result<()> {
        // Render first so a failed write never leaves half a line buffered.
        let mut line = sample.to_record();
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        self.records_written += 1;
        Ok(())
    }

    /// Flush, sync and close the file. Returns the number of records written.
    pub fn finish(self) -> std::io::Result<u64> {
        let records = self.records_written;
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(records)
    }

    /// Records written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}
