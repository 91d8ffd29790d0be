//! Shared tabular output. Each batch is encoded off-lock into one buffer and
//! then written and flushed under one lock, so rows from different workers
//! never interleave and a failed batch never leaves half a row behind.

use crate::area::{Area, AREA_HEADER};
use crate::runtime::error::CrawlError;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

/// Destination for finished records.
pub trait RecordSink: Send + Sync {
    /// Writes `records` as one contiguous block and returns how many rows were written.
    fn append(&self, records: &[Area]) -> Result<usize>;
}

struct SinkState<W: Write> {
    writer: W,
    header_written: bool,
    /// Set when a write failed after part of a block reached the writer.
    torn: bool,
    rows_written: u64,
}

pub struct CsvSink<W: Write + Send> {
    state: Mutex<SinkState<W>>,
}

impl CsvSink<File> {
    /// Opens `path` for writing, creating parent directories and truncating
    /// any previous content.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create output directory {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("failed to open output file {}", path.display()))?;
        tracing::info!(path = %path.display(), "opened output file");
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            state: Mutex::new(SinkState {
                writer,
                header_written: false,
                torn: false,
                rows_written: 0,
            }),
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.state
            .lock()
            .map(|state| state.rows_written)
            .unwrap_or_default()
    }

    /// Flushes and hands back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        let mut state = self
            .state
            .into_inner()
            .map_err(|_| CrawlError::write("output lock poisoned"))?;
        state
            .writer
            .flush()
            .map_err(|err| CrawlError::write(err.to_string()))?;
        Ok(state.writer)
    }
}

/// Encodes `records` (preceded by the header row when requested) into one
/// in-memory CSV block.
fn encode_block(records: &[Area], with_header: bool) -> Result<Vec<u8>> {
    let mut block = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    if with_header {
        block
            .write_record(AREA_HEADER)
            .map_err(|err| CrawlError::write(err.to_string()))?;
    }
    for record in records {
        block
            .serialize(record.as_row())
            .map_err(|err| CrawlError::write(err.to_string()))?;
    }
    block
        .into_inner()
        .map_err(|err| CrawlError::write(err.error().to_string()).into())
}

/// Like `write_all`, but reports how many bytes were accepted before a failure.
fn write_block<W: Write>(writer: &mut W, block: &[u8]) -> (usize, io::Result<()>) {
    let mut written = 0;
    while written < block.len() {
        match writer.write(&block[written..]) {
            Ok(0) => {
                return (
                    written,
                    Err(io::Error::new(io::ErrorKind::WriteZero, "output accepted no bytes")),
                )
            }
            Ok(n) => written += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return (written, Err(err)),
        }
    }
    (written, Ok(()))
}

impl<W: Write + Send> RecordSink for CsvSink<W> {
    fn append(&self, records: &[Area]) -> Result<usize> {
        let rows = encode_block(records, false)?;

        let mut state = self
            .state
            .lock()
            .map_err(|_| CrawlError::write("output lock poisoned"))?;
        if state.torn {
            return Err(
                CrawlError::write("output ends in a partial row from an earlier failed write").into(),
            );
        }
        let block = if state.header_written {
            rows
        } else {
            let mut block = encode_block(&[], true)?;
            block.extend_from_slice(&rows);
            block
        };

        let (written, result) = write_block(&mut state.writer, &block);
        if let Err(err) = result.and_then(|()| state.writer.flush()) {
            if written > 0 {
                state.torn = true;
                tracing::error!(bytes = written, error = %err, "output write failed mid-block");
            }
            return Err(CrawlError::write(err.to_string()).into());
        }

        state.header_written = true;
        state.rows_written += records.len() as u64;
        Ok(records.len())
    }
}
