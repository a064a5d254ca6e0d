//! Main copy engine
//!
//! [`Transfer`] is the read/write state machine over one borrowed buffer.
//! [`CatEngine`] wraps it: size the buffer, acquire it, hint the kernel, run
//! the transfer, then release the buffer and the source in that order on
//! every path.

use crate::config::{AllocStrategy, CatConfig};
use crate::core::{AllocationLedger, BufferAllocator, SizingPolicy};
use crate::error::{CatError, IoResultExt, Result};
use crate::fs::{advise, CopySource, RawStdout, SourceDescriptor};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Which side of the transfer failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Reading the source
    Read,
    /// Writing the destination
    Write,
}

/// Copy loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyState {
    /// Buffer in hand, nothing read yet
    Idle,
    /// Next step reads up to one buffer from the source
    Reading,
    /// First write attempt of `buffer[offset..pending]`
    Writing { pending: usize, offset: usize },
    /// Retrying after a partial write of the current chunk
    Draining { pending: usize, offset: usize },
    /// End of input reached, every byte written
    Done,
    /// Stopped by an I/O error
    Failed(FailureKind),
}

impl CopyState {
    /// Whether no further step changes the state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// Counters collected while a [`Transfer`] runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransferStats {
    /// Bytes written to the destination
    pub bytes_copied: u64,
    /// Completed read calls, including the final zero-length one
    pub reads: u64,
    /// Completed write calls
    pub writes: u64,
    /// Writes that accepted fewer bytes than requested
    pub partial_writes: u64,
}

/// The error that stopped a transfer
#[derive(Debug)]
pub struct TransferFailure {
    /// Side that failed
    pub kind: FailureKind,
    /// OS-reported reason
    pub source: io::Error,
}

/// Final result of [`Transfer::run`]
#[derive(Debug)]
pub struct TransferOutcome {
    /// Counters up to the point the transfer stopped
    pub stats: TransferStats,
    /// Set when the transfer ended in [`CopyState::Failed`]
    pub failure: Option<TransferFailure>,
}

/// Read/write state machine moving bytes from `reader` to `writer`
///
/// Short reads are normal and simply hand fewer bytes to the write stage.
/// Short writes keep the machine draining the same chunk until every byte
/// has been accepted. `Interrupted` is retried on both sides.
pub struct Transfer<'a, R: Read + ?Sized, W: Write + ?Sized> {
    reader: &'a mut R,
    writer: &'a mut W,
    buffer: &'a mut [u8],
    state: CopyState,
    stats: TransferStats,
    failure: Option<TransferFailure>,
}

impl<'a, R: Read + ?Sized, W: Write + ?Sized> Transfer<'a, R, W> {
    /// Create a transfer in [`CopyState::Idle`]
    pub fn new(reader: &'a mut R, writer: &'a mut W, buffer: &'a mut [u8]) -> Self {
        Self {
            reader,
            writer,
            buffer,
            state: CopyState::Idle,
            stats: TransferStats::default(),
            failure: None,
        }
    }

    /// Current state
    pub fn state(&self) -> CopyState {
        self.state
    }

    /// Counters so far
    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    /// Advance by one transition and return the new state
    pub fn step(&mut self) -> CopyState {
        let current = self.state;
        self.state = match current {
            CopyState::Idle => {
                if self.buffer.is_empty() {
                    self.fail(
                        FailureKind::Read,
                        io::Error::new(io::ErrorKind::InvalidInput, "empty copy buffer"),
                    )
                } else {
                    CopyState::Reading
                }
            }
            CopyState::Reading => self.read_chunk(),
            CopyState::Writing { pending, offset } | CopyState::Draining { pending, offset } => {
                self.write_chunk(pending, offset)
            }
            terminal => terminal,
        };
        self.state
    }

    /// Step until a terminal state
    pub fn run(mut self) -> TransferOutcome {
        while !self.step().is_terminal() {}

        TransferOutcome {
            stats: self.stats,
            failure: self.failure,
        }
    }

    fn read_chunk(&mut self) -> CopyState {
        loop {
            match self.reader.read(self.buffer) {
                Ok(0) => {
                    self.stats.reads += 1;
                    return CopyState::Done;
                }
                Ok(n) if n > self.buffer.len() => {
                    return self.fail(
                        FailureKind::Read,
                        io::Error::new(io::ErrorKind::InvalidData, "reader overran the buffer"),
                    );
                }
                Ok(n) => {
                    self.stats.reads += 1;
                    return CopyState::Writing {
                        pending: n,
                        offset: 0,
                    };
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return self.fail(FailureKind::Read, e),
            }
        }
    }

    fn write_chunk(&mut self, pending: usize, offset: usize) -> CopyState {
        let requested = pending - offset;

        match self.writer.write(&self.buffer[offset..pending]) {
            // Zero accepted bytes is a short write like any other
            Ok(written) => {
                let written = written.min(requested);
                self.stats.writes += 1;
                self.stats.bytes_copied += written as u64;

                let offset = offset + written;
                if offset == pending {
                    CopyState::Reading
                } else {
                    self.stats.partial_writes += 1;
                    tracing::trace!("Partial write: {} of {} bytes", written, requested);
                    CopyState::Draining { pending, offset }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => self.state,
            Err(e) => self.fail(FailureKind::Write, e),
        }
    }

    fn fail(&mut self, kind: FailureKind, source: io::Error) -> CopyState {
        self.failure = Some(TransferFailure { kind, source });
        CopyState::Failed(kind)
    }
}

/// Copy operation statistics
#[derive(Debug, Clone, Serialize)]
pub struct CopyStats {
    /// Bytes copied
    pub bytes_copied: u64,
    /// Read calls issued
    pub reads: u64,
    /// Write calls issued
    pub writes: u64,
    /// Writes that were short
    pub partial_writes: u64,
    /// Buffer capacity in bytes
    pub buffer_size: usize,
    /// Page size the buffer is aligned to
    pub page_size: usize,
    /// Validated filesystem block size, if block alignment was used
    pub block_size: Option<usize>,
    /// Scale factor applied
    pub scale_factor: usize,
    /// Allocation strategy used
    pub strategy: AllocStrategy,
    /// Whether the sequential hint was accepted
    pub advised: bool,
    /// Duration of the copy
    pub duration: Duration,
    /// Throughput in bytes/second
    pub throughput: f64,
}

impl CopyStats {
    /// Calculate throughput from bytes and duration
    pub fn calculate_throughput(&mut self) {
        if self.duration.as_secs_f64() > 0.0 {
            self.throughput = self.bytes_copied as f64 / self.duration.as_secs_f64();
        }
    }

    /// Print summary to stderr
    pub fn print_summary(&self) {
        eprintln!("=== Copy Summary ===");
        eprintln!("Bytes copied:    {}", humansize::format_size(self.bytes_copied, humansize::BINARY));
        eprintln!("Buffer:          {} ({} allocation)", humansize::format_size(self.buffer_size, humansize::BINARY), self.strategy.name());
        eprintln!("Page size:       {}", self.page_size);
        match self.block_size {
            Some(block) => eprintln!("Block size:      {}", block),
            None => eprintln!("Block size:      (not used)"),
        }
        eprintln!("Scale factor:    {}", self.scale_factor);
        eprintln!("Reads / writes:  {} / {} ({} partial)", self.reads, self.writes, self.partial_writes);
        eprintln!("Access hint:     {}", if self.advised { "applied" } else { "not applied" });
        eprintln!("Duration:        {:.2?}", self.duration);
        eprintln!("Throughput:      {}/s", humansize::format_size(self.throughput as u64, humansize::BINARY));
    }

    /// Summary as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

/// Single-file copy engine
pub struct CatEngine {
    policy: SizingPolicy,
    allocator: BufferAllocator,
    advise: bool,
}

impl CatEngine {
    /// Create an engine using the system page size
    pub fn new(config: &CatConfig) -> Self {
        Self::from_policy(config, SizingPolicy::new(config.sizing))
    }

    /// Create an engine aligning to an explicit page size
    pub fn with_page_size(config: &CatConfig, page_size: usize) -> Self {
        Self::from_policy(config, SizingPolicy::with_page_size(config.sizing, page_size))
    }

    fn from_policy(config: &CatConfig, policy: SizingPolicy) -> Self {
        Self {
            allocator: BufferAllocator::new(config.alloc, policy.page_size()),
            policy,
            advise: config.advise,
        }
    }

    /// Buffer acquire/release counters
    pub fn ledger(&self) -> Arc<AllocationLedger> {
        self.allocator.ledger()
    }

    /// Sizing policy in use
    pub fn policy(&self) -> &SizingPolicy {
        &self.policy
    }

    /// Copy `path` to standard output
    pub fn execute(&self, path: &Path) -> Result<CopyStats> {
        let mut stdout = RawStdout::open().or_write()?;
        self.copy_path(path, &mut stdout)
    }

    /// Open `path` and copy it to `dest`
    pub fn copy_path<W: Write + ?Sized>(&self, path: &Path, dest: &mut W) -> Result<CopyStats> {
        let source = SourceDescriptor::open(path)?;
        self.copy(source, dest)
    }

    /// Copy everything `source` yields into `dest`, consuming the source
    ///
    /// The buffer is released before the source, and the source is released
    /// exactly once whatever the outcome. A close failure after a successful
    /// copy is reported as [`CatError::Release`]; after a failed copy it is
    /// only logged and the copy error wins.
    pub fn copy<S: CopySource, W: Write + ?Sized>(&self, mut source: S, dest: &mut W) -> Result<CopyStats> {
        let outcome = self.pump(&mut source, dest);
        release_source(source, outcome)
    }

    fn pump<S: CopySource, W: Write + ?Sized>(&self, source: &mut S, dest: &mut W) -> Result<CopyStats> {
        let start = Instant::now();

        let params = self.policy.parameters(&*source);
        let buffer_size = params.buffer_size();
        tracing::debug!(
            "Sizing {:?}: page {}, block {:?}, scale {} -> {} bytes",
            source.path(),
            params.page_size,
            params.block_size,
            params.scale_factor,
            buffer_size
        );

        let mut buffer = self.allocator.acquire(buffer_size)?;
        let advised = self.advise && advise(&*source);

        let outcome = Transfer::new(source, dest, buffer.as_mut_slice()).run();
        buffer.release();

        if let Some(failure) = outcome.failure {
            tracing::debug!(
                "Copy of {:?} stopped after {} bytes",
                source.path(),
                outcome.stats.bytes_copied
            );
            return Err(match failure.kind {
                FailureKind::Read => CatError::read(source.path(), failure.source),
                FailureKind::Write => CatError::write(failure.source),
            });
        }

        dest.flush().or_write()?;

        let mut stats = CopyStats {
            bytes_copied: outcome.stats.bytes_copied,
            reads: outcome.stats.reads,
            writes: outcome.stats.writes,
            partial_writes: outcome.stats.partial_writes,
            buffer_size,
            page_size: params.page_size,
            block_size: params.block_size,
            scale_factor: params.scale_factor,
            strategy: self.allocator.strategy(),
            advised,
            duration: start.elapsed(),
            throughput: 0.0,
        };
        stats.calculate_throughput();

        tracing::info!(
            "Copied {} from {:?} in {:.2?}",
            humansize::format_size(stats.bytes_copied, humansize::BINARY),
            source.path(),
            stats.duration
        );

        Ok(stats)
    }
}

fn release_source<S: CopySource>(source: S, outcome: Result<CopyStats>) -> Result<CopyStats> {
    let path = source.path().to_path_buf();

    match (outcome, source.release()) {
        (Ok(stats), Ok(())) => Ok(stats),
        (Ok(_), Err(e)) => Err(CatError::release(path, e)),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(e)) => {
            tracing::warn!("Closing {:?} after failed copy also failed: {}", path, e);
            Err(err)
        }
    }
}

/// Copy `path` to stdout with the default (tuned) configuration
pub fn cat_file(path: &Path) -> Result<CopyStats> {
    CatEngine::new(&CatConfig::default()).execute(path)
}
