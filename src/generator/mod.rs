//! Synthetic object generation
//!
//! Workers never read payloads from disk. Each one owns a [`Source`] that produces
//! [`SyntheticObject`]s on demand: a random name, a size, and a seekable byte
//! stream backed by a block of generated data.
//!
//! # Example
//!
//! ```
//! use bulkpulse::generator::{GeneratorOptions, Source};
//! use bulkpulse::generator::pattern::PatternOptions;
//!
//! let opts = GeneratorOptions::default()
//!     .size(64 * 1024)
//!     .pattern(PatternOptions::default().compressibility(0.3).seed(1));
//!
//! let mut source = opts.new_source()?;
//! let obj = source.object();
//! assert_eq!(obj.size, 64 * 1024);
//! assert!(obj.name.ends_with(".bin"));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod circular;
pub mod pattern;

use crate::Result;
use circular::{CircularBuffer, CircularReader};
use pattern::{PatternOptions, PatternSource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Seek, SeekFrom};

/// Content type attached to every generated object
pub const OBJECT_CONTENT_TYPE: &str = "application/octet-stream";

/// Producer of synthetic objects
///
/// A source is owned by a single worker and is never shared, so implementations
/// need no internal synchronization.
pub trait Source: fmt::Display + Send + Sync {
    /// Produce the next object
    fn object(&mut self) -> SyntheticObject;

    /// Produce `count` objects with distinct names sharing one backing block
    ///
    /// Payload memory stays at one block however large `count` is. Each
    /// object enters the block at its own offset.
    fn batch(&mut self, count: usize) -> Vec<SyntheticObject>;

    /// Prefix prepended to object names (empty if none)
    fn prefix(&self) -> &str;
}

/// A generated object ready for upload
///
/// The payload is exactly `size` bytes, read from the circular wrap of the
/// generator block. Objects from [`Source::object`] start at block offset 0;
/// objects of a [`Source::batch`] start where the source placed them.
#[derive(Debug, Clone)]
pub struct SyntheticObject {
    /// Object name, including any prefix
    pub name: String,
    /// Payload length in bytes
    pub size: u64,
    /// MIME type sent with the object
    pub content_type: &'static str,
    pub(crate) data: CircularBuffer,
}

impl SyntheticObject {
    /// Reader over the full payload
    pub fn reader(&self) -> CircularReader {
        self.data.reader()
    }

    /// Reader positioned at `offset`, for ranged uploads
    ///
    /// # Errors
    ///
    /// Fails if `offset` lies past the end of the object.
    pub fn reader_at(&self, offset: u64) -> io::Result<CircularReader> {
        let mut reader = self.data.reader();
        reader.seek(SeekFrom::Start(offset))?;
        Ok(reader)
    }
}

/// Options shared by all generator sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorOptions {
    /// Object size, or the maximum size when `random_size` is set
    pub size: u64,
    /// Draw each object size uniformly from `1..=size`
    pub random_size: bool,
    /// Custom name prefix
    pub prefix: Option<String>,
    /// Add a random 8-character prefix
    pub random_prefix: bool,
    /// Pattern data options
    pub pattern: PatternOptions,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            size: 1024 * 1024,
            random_size: false,
            prefix: None,
            random_prefix: false,
            pattern: PatternOptions::default(),
        }
    }
}

impl GeneratorOptions {
    /// Set the object size (maximum size in random mode)
    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Enable or disable random object sizes
    pub fn random_size(mut self, random: bool) -> Self {
        self.random_size = random;
        self
    }

    /// Set a custom name prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Enable or disable a random name prefix
    pub fn random_prefix(mut self, random: bool) -> Self {
        self.random_prefix = random;
        self
    }

    /// Set the pattern options
    pub fn pattern(mut self, pattern: PatternOptions) -> Self {
        self.pattern = pattern;
        self
    }

    /// Check the options before any source is built
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            anyhow::bail!("object size must be greater than 0");
        }
        self.pattern.validate()
    }

    /// Build a fresh source, one per worker
    pub fn new_source(&self) -> Result<Box<dyn Source>> {
        Ok(Box::new(PatternSource::new(self.clone())?))
    }

    /// Options for worker `thread`
    ///
    /// A fixed seed is offset by the worker index so concurrent workers stay
    /// reproducible without generating the same object names.
    pub fn for_worker(&self, thread: usize) -> Self {
        let mut opts = self.clone();
        if let Some(seed) = opts.pattern.seed {
            opts.pattern.seed = Some(seed.wrapping_add(thread as u64));
        }
        opts
    }
}
