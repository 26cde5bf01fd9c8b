//! Circular payload buffer
//!
//! A [`CircularBuffer`] pairs a fixed backing array with a logical target length.
//! Readers created from it walk the backing array and wrap around to its start
//! until exactly the target length has been produced, so an object of any size can
//! be served from a single block of generated data.
//!
//! Logical offset `O` maps to `(start + O) mod len(backing)` in the backing
//! array, where `start` is 0 unless the buffer was built with
//! [`CircularBuffer::with_start`]. Readers
//! are seekable, which the bulk-upload protocol relies on to stream arbitrary byte
//! ranges of an object into server-granted chunks.
//!
//! # Example
//!
//! ```
//! use bulkpulse::generator::circular::CircularBuffer;
//! use bytes::Bytes;
//! use std::io::Read;
//!
//! let buffer = CircularBuffer::new(Bytes::from_static(b"abc"), 7);
//! let mut out = String::new();
//! buffer.reader().read_to_string(&mut out).unwrap();
//! assert_eq!(out, "abcabca");
//! ```

use bytes::Bytes;
use std::io::{self, Read, Seek, SeekFrom};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

/// Backing bytes plus the logical length readers must produce
#[derive(Debug, Clone)]
pub struct CircularBuffer {
    data: Bytes,
    want: u64,
    start: u64,
}

impl CircularBuffer {
    /// Create a circular buffer serving `want` bytes from `data`
    ///
    /// # Panics
    ///
    /// Panics if `data` is empty while `want` is non-zero, since no byte could
    /// ever be produced.
    pub fn new(data: Bytes, want: u64) -> Self {
        assert!(
            want == 0 || !data.is_empty(),
            "circular buffer needs backing data to produce {} bytes",
            want
        );
        Self {
            data,
            want,
            start: 0,
        }
    }

    /// Like [`new`](Self::new), but logical offset 0 maps to `start` in `data`
    ///
    /// Lets many objects share one backing block without serving identical
    /// bytes. `start` is taken modulo the backing length.
    ///
    /// # Panics
    ///
    /// Panics under the same condition as [`new`](Self::new).
    pub fn with_start(data: Bytes, want: u64, start: u64) -> Self {
        let mut buffer = Self::new(data, want);
        if !buffer.data.is_empty() {
            buffer.start = start % buffer.data.len() as u64;
        }
        buffer
    }

    /// Backing offset that logical offset 0 maps to
    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Logical length produced by every reader
    #[inline]
    pub fn len(&self) -> u64 {
        self.want
    }

    /// Whether the logical length is zero
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.want == 0
    }

    /// The backing array readers wrap around
    #[inline]
    pub fn backing(&self) -> &Bytes {
        &self.data
    }

    /// Create a reader positioned at logical offset 0
    pub fn reader(&self) -> CircularReader {
        CircularReader {
            data: self.data.clone(),
            want: self.want,
            start: self.start,
            pos: 0,
        }
    }
}

/// Read cursor over a [`CircularBuffer`]
///
/// Cloning a reader is cheap: the backing bytes are reference counted and each
/// clone carries its own position.
#[derive(Debug, Clone)]
pub struct CircularReader {
    data: Bytes,
    want: u64,
    start: u64,
    pos: u64,
}

impl CircularReader {
    /// Current logical position
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Bytes left before the logical end
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.want - self.pos
    }

    /// Logical length of the underlying object
    #[inline]
    pub fn len(&self) -> u64 {
        self.want
    }

    /// Whether the underlying object is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.want == 0
    }

    /// Copy as many wrapped bytes as fit into `buf`, advancing the cursor
    fn fill(&mut self, buf: &mut [u8]) -> usize {
        let backing = self.data.len() as u64;
        let mut written = 0usize;

        while written < buf.len() && self.pos < self.want {
            let start = ((self.start + self.pos % backing) % backing) as usize;
            let n = (self.data.len() - start)
                .min(buf.len() - written)
                .min(self.remaining().min(usize::MAX as u64) as usize);

            buf[written..written + n].copy_from_slice(&self.data[start..start + n]);
            written += n;
            self.pos += n as u64;
        }

        written
    }

    /// Resolve a seek request to an absolute position inside `[0, want]`
    fn resolve(&self, from: SeekFrom) -> io::Result<u64> {
        let target = match from {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => offset_by(self.want, delta),
            SeekFrom::Current(delta) => offset_by(self.pos, delta),
        };

        match target {
            Some(pos) if pos <= self.want => Ok(pos),
            Some(pos) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("seek to {} beyond object length {}", pos, self.want),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative position",
            )),
        }
    }
}

fn offset_by(base: u64, delta: i64) -> Option<u64> {
    if delta >= 0 {
        base.checked_add(delta as u64)
    } else {
        base.checked_sub(delta.unsigned_abs())
    }
}

impl Read for CircularReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.fill(buf))
    }
}

impl Seek for CircularReader {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        self.pos = self.resolve(from)?;
        Ok(self.pos)
    }
}

impl AsyncRead for CircularReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let len = (buf.remaining() as u64).min(self.remaining()) as usize;
        let dst = buf.initialize_unfilled_to(len);
        let n = self.fill(dst);
        buf.advance(n);
        Poll::Ready(Ok(()))
    }
}

impl AsyncSeek for CircularReader {
    fn start_seek(mut self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        self.pos = self.resolve(position)?;
        Ok(())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Poll::Ready(Ok(self.pos))
    }
}
