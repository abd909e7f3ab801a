//! Chunked streaming reader.
//!
//! [`StreamReader`] keeps a sliding window over an underlying [`Read`] and
//! hands a [`StreamDecoder`] the unconsumed bytes. A decoder that cannot
//! finish a record answers [`Decoded::NeedMore`]; the reader then refills,
//! keeping the partial trailing record, and asks again.

use footprint_core::{Error, Result};
use std::io::Read;

/// Default number of bytes requested from the source per refill.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Refill proactively once fewer than this many unconsumed bytes remain.
pub const DEFAULT_MIN_REMAINING: usize = 10_000;

/// Outcome of one decode attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    /// A complete record occupying `consumed` bytes.
    Record { value: T, consumed: usize },
    /// `consumed` bytes carried no record (header, blank line).
    Skip { consumed: usize },
    /// The view ends inside a record; more input is required.
    NeedMore,
}

/// Format-specific record framing over a byte view.
pub trait StreamDecoder {
    /// Record type produced.
    type Item;

    /// Decode the record at the start of `buf`.
    ///
    /// `eof` is true when `buf` holds every remaining byte of the input;
    /// a decoder must not answer `NeedMore` in that case. `offset` is the
    /// absolute position of `buf[0]` within the input, for error reports.
    fn decode(&mut self, buf: &[u8], eof: bool, offset: u64) -> Result<Decoded<Self::Item>>;
}

/// Sliding-window reader over a byte source.
pub struct StreamReader<R> {
    source: R,
    buffer: Vec<u8>,
    pos: usize,
    /// Absolute input offset of `buffer[0]`.
    base_offset: u64,
    eof: bool,
    chunk_size: usize,
    min_remaining: usize,
}

impl<R: Read> StreamReader<R> {
    /// Create a reader with default chunking.
    pub fn new(source: R) -> Self {
        Self::with_chunking(source, DEFAULT_CHUNK_SIZE, DEFAULT_MIN_REMAINING)
    }

    /// Create a reader with explicit chunk size and refill threshold.
    pub fn with_chunking(source: R, chunk_size: usize, min_remaining: usize) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            pos: 0,
            base_offset: 0,
            eof: false,
            chunk_size: chunk_size.max(1),
            min_remaining,
        }
    }

    /// Unconsumed bytes currently buffered.
    #[inline]
    pub fn current(&self) -> &[u8] {
        &self.buffer[self.pos..]
    }

    /// Number of unconsumed bytes currently buffered.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.pos
    }

    /// Absolute offset of the first unconsumed byte.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.base_offset + self.pos as u64
    }

    /// Whether the source is exhausted.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Consume `n` bytes of the current view.
    pub fn advance(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::data(format!(
                "cannot advance {} bytes with {} remaining",
                n,
                self.remaining()
            )));
        }
        self.pos += n;
        Ok(())
    }

    /// Whether unconsumed input remains, refilling when the view runs low.
    pub fn has_more(&mut self) -> Result<bool> {
        if self.remaining() < self.min_remaining && !self.eof {
            self.fill()?;
        }
        while self.remaining() == 0 && !self.eof {
            self.fill()?;
        }
        Ok(self.remaining() > 0)
    }

    /// Read one more chunk, discarding already-consumed bytes first.
    ///
    /// Returns the number of bytes read; 0 marks end of input.
    pub fn fill(&mut self) -> Result<usize> {
        if self.eof {
            return Ok(0);
        }
        self.compact();

        let start = self.buffer.len();
        self.buffer.resize(start + self.chunk_size, 0);
        let read = loop {
            match self.source.read(&mut self.buffer[start..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.truncate(start);
                    return Err(e.into());
                }
            }
        };
        self.buffer.truncate(start + read);
        if read == 0 {
            self.eof = true;
        }
        Ok(read)
    }

    /// Decode the next record, refilling as the decoder asks.
    ///
    /// Returns `Ok(None)` once the input is exhausted.
    pub fn next_record<D: StreamDecoder>(&mut self, decoder: &mut D) -> Result<Option<D::Item>> {
        loop {
            if !self.has_more()? {
                return Ok(None);
            }
            let offset = self.offset();
            match decoder.decode(self.current(), self.eof, offset)? {
                Decoded::Record { value, consumed } => {
                    self.consume(consumed, offset)?;
                    return Ok(Some(value));
                }
                Decoded::Skip { consumed } => {
                    self.consume(consumed, offset)?;
                }
                Decoded::NeedMore => {
                    if self.eof {
                        return Err(Error::malformed(offset, "truncated record at end of input"));
                    }
                    self.fill()?;
                }
            }
        }
    }

    fn consume(&mut self, consumed: usize, offset: u64) -> Result<()> {
        if consumed == 0 || consumed > self.remaining() {
            return Err(Error::malformed(
                offset,
                format!("decoder consumed {} of {} bytes", consumed, self.remaining()),
            ));
        }
        self.advance(consumed)
    }

    fn compact(&mut self) {
        if self.pos > 0 {
            self.buffer.drain(..self.pos);
            self.base_offset += self.pos as u64;
            self.pos = 0;
        }
    }
}
