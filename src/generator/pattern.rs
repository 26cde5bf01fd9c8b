//! Pattern data source with controlled compressibility
//!
//! The pattern source fills a backing block with a mix of constant "pattern" runs
//! and uniformly random runs. The share of pattern runs equals the configured
//! compressibility, so a deflate-family compressor shrinks the block to roughly
//! `len * (1 - compressibility)` bytes. Objects are then served from the block
//! through a [`CircularBuffer`], which keeps memory bounded by the block size no
//! matter how large the objects are. A batch shares a single block, each object
//! entering it at its own offset, so memory is also bounded no matter how many
//! objects a batch holds.

use super::circular::CircularBuffer;
use super::{GeneratorOptions, Source, SyntheticObject, OBJECT_CONTENT_TYPE};
use crate::Result;
use bytes::{Bytes, BytesMut};
use rand::distributions::Alphanumeric;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Byte repeated in pattern runs
pub const PATTERN_BYTE: u8 = b'A';

/// Run length used for buffers up to [`SMALL_BUFFER_LIMIT`]
pub const SMALL_RUN_LEN: usize = 1024;

/// Run length used for buffers larger than [`SMALL_BUFFER_LIMIT`]
pub const LARGE_RUN_LEN: usize = 32 * 1024;

/// Largest buffer filled with small runs
pub const SMALL_BUFFER_LIMIT: usize = 1024 * 1024;

/// Smallest block size that is rejected
///
/// Compression ratios cannot be held reliably for tiny blocks.
pub const MIN_BLOCK_SIZE: usize = 4096;

/// Length of generated object names, excluding the `.bin` suffix
pub const NAME_LEN: usize = 16;

/// Options for the pattern data source
///
/// Built from defaults and adjusted with builder-style setters:
///
/// ```
/// use bulkpulse::generator::pattern::PatternOptions;
///
/// let opts = PatternOptions::default()
///     .block_size(1024 * 1024)
///     .compressibility(0.25)
///     .seed(7);
/// assert!(opts.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternOptions {
    /// Fixed RNG seed for reproducible payloads
    pub seed: Option<u64>,
    /// Length of the generated block that objects wrap around
    pub block_size: usize,
    /// Fraction of the block filled with pattern runs (0.0 = random, 1.0 = pattern)
    pub compressibility: f32,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            seed: None,
            block_size: 16 * 1024 * 1024,
            compressibility: 0.5,
        }
    }
}

impl PatternOptions {
    /// Use a fixed RNG seed so generated data is reproducible
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the block size
    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Set the compressibility, from 0.0 (fully random) to 1.0 (fully pattern)
    pub fn compressibility(mut self, compressibility: f32) -> Self {
        self.compressibility = compressibility;
        self
    }

    /// Check the options
    ///
    /// # Errors
    ///
    /// Fails if the block size is 4096 bytes or less, or if compressibility lies
    /// outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.block_size <= MIN_BLOCK_SIZE {
            anyhow::bail!(
                "pattern: block size must be larger than {} bytes, got {}",
                MIN_BLOCK_SIZE,
                self.block_size
            );
        }
        if !(0.0..=1.0).contains(&self.compressibility) {
            anyhow::bail!(
                "pattern: compressibility must be in range [0, 1.0], got {}",
                self.compressibility
            );
        }
        Ok(())
    }
}

/// Fill `buf` with interleaved pattern and random runs
///
/// The buffer is cut into runs of 1 KiB (buffers up to 1 MiB) or 32 KiB. Exactly
/// `round(runs * compressibility)` full runs get the constant pattern and the rest
/// get random bytes. Each run draws a biased coin to decide its kind; once one
/// kind is used up the other is forced, so the order varies but the counts do not.
/// A trailing partial run is decided by a single biased coin flip.
pub fn pattern_fill<R: Rng + ?Sized>(buf: &mut [u8], rng: &mut R, compressibility: f32) {
    let run_len = if buf.len() > SMALL_BUFFER_LIMIT {
        LARGE_RUN_LEN
    } else {
        SMALL_RUN_LEN
    };
    let compressibility = f64::from(compressibility.clamp(0.0, 1.0));

    let runs = buf.len() / run_len;
    let mut pattern_runs = (runs as f64 * compressibility).round() as usize;
    let mut random_runs = runs - pattern_runs;
    // Saturating cast: 1.0 maps to u64::MAX.
    let bias = (compressibility * u64::MAX as f64) as u64;

    let (full, leftover) = buf.split_at_mut(runs * run_len);
    for run in full.chunks_exact_mut(run_len) {
        let draw: u64 = rng.gen();
        if pattern_runs > 0 && (random_runs == 0 || draw < bias) {
            run.fill(PATTERN_BYTE);
            pattern_runs -= 1;
        } else {
            rng.fill_bytes(run);
            random_runs -= 1;
        }
    }

    if !leftover.is_empty() {
        if rng.gen::<u64>() < bias {
            leftover.fill(PATTERN_BYTE);
        } else {
            rng.fill_bytes(leftover);
        }
    }
}

/// Generator state for pattern objects
///
/// Owns the backing block, the RNG and the naming prefix. One instance belongs to
/// exactly one worker.
///
/// The block is shared with the objects handed out, so a refill reuses the
/// allocation only when every earlier object has been dropped; otherwise a fresh
/// block is allocated and the outstanding objects keep the bytes they were
/// created with.
pub struct PatternSource {
    opts: GeneratorOptions,
    rng: Xoshiro256PlusPlus,
    block: Bytes,
    block_len: usize,
    prefix: String,
}

impl PatternSource {
    /// Create a pattern source from validated generator options
    ///
    /// # Errors
    ///
    /// Returns an error if the options fail validation.
    pub fn new(opts: GeneratorOptions) -> Result<Self> {
        opts.validate()?;

        let mut rng = match opts.pattern.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        // No point generating more distinct bytes than the largest object needs.
        let block_len = opts
            .pattern
            .block_size
            .min(usize::try_from(opts.size).unwrap_or(usize::MAX));

        let prefix = build_prefix(&opts, &mut rng);

        Ok(Self {
            opts,
            rng,
            block: Bytes::new(),
            block_len,
            prefix,
        })
    }

    /// Length of the backing block
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Refill the backing block, reusing its allocation when nothing else holds it
    fn refill(&mut self) -> Bytes {
        let mut block = match std::mem::take(&mut self.block).try_into_mut() {
            Ok(block) if block.len() == self.block_len => block,
            _ => BytesMut::zeroed(self.block_len),
        };
        pattern_fill(&mut block, &mut self.rng, self.opts.pattern.compressibility);
        self.block = block.freeze();
        self.block.clone()
    }

    fn next_size(&mut self) -> u64 {
        if self.opts.random_size {
            self.rng.gen_range(1..=self.opts.size)
        } else {
            self.opts.size
        }
    }

    fn next_name(&mut self) -> String {
        let base = random_ascii(&mut self.rng, NAME_LEN);
        if self.prefix.is_empty() {
            format!("{}.bin", base)
        } else {
            format!("{}/{}.bin", self.prefix, base)
        }
    }
}

impl Source for PatternSource {
    fn object(&mut self) -> SyntheticObject {
        let block = self.refill();
        let size = self.next_size();
        let name = self.next_name();

        SyntheticObject {
            name,
            size,
            content_type: OBJECT_CONTENT_TYPE,
            data: CircularBuffer::new(block, size),
        }
    }

    fn batch(&mut self, count: usize) -> Vec<SyntheticObject> {
        let block = self.refill();
        let mut names = HashSet::with_capacity(count);
        let mut objects = Vec::with_capacity(count);

        while objects.len() < count {
            let size = self.next_size();
            let name = self.next_name();
            if !names.insert(name.clone()) {
                continue;
            }
            let start = self.rng.gen_range(0..self.block_len as u64);
            objects.push(SyntheticObject {
                name,
                size,
                content_type: OBJECT_CONTENT_TYPE,
                data: CircularBuffer::with_start(block.clone(), size, start),
            });
        }
        objects
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl fmt::Display for PatternSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = crate::util::time::format_bytes(self.opts.size);
        if self.opts.random_size {
            write!(
                f,
                "Pattern data; random size up to {}, compressibility {:.2}",
                size, self.opts.pattern.compressibility
            )
        } else {
            write!(
                f,
                "Pattern data; {} total, compressibility {:.2}",
                size, self.opts.pattern.compressibility
            )
        }
    }
}

fn random_ascii<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

fn build_prefix<R: Rng + ?Sized>(opts: &GeneratorOptions, rng: &mut R) -> String {
    let random = opts.random_prefix.then(|| random_ascii(rng, 8));
    match (opts.prefix.as_deref().filter(|p| !p.is_empty()), random) {
        (Some(custom), Some(random)) => format!("{}/{}", custom.trim_end_matches('/'), random),
        (Some(custom), None) => custom.trim_end_matches('/').to_string(),
        (None, Some(random)) => random,
        (None, None) => String::new(),
    }
}
