//! Visited bitmaps and per-level frontiers

use crate::storage::GraphView;
use crate::types::Weight;
use std::sync::atomic::{AtomicU64, Ordering};

const WORD_BITS: usize = 64;

/// One bit per global vertex, settable concurrently
///
/// `set` is a `fetch_or`: when several workers race to set the same bit,
/// exactly one of them observes the transition and wins.
#[derive(Debug)]
pub struct VertexBitmap {
    words: Vec<AtomicU64>,
    len: usize,
}

impl VertexBitmap {
    /// All-clear bitmap over `len` vertices
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            words: (0..len.div_ceil(WORD_BITS)).map(|_| AtomicU64::new(0)).collect(),
            len,
        }
    }

    /// Number of vertices covered
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True when the bitmap covers no vertices
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set the bit of `v`; returns true if this call changed it
    ///
    /// # Panics
    ///
    /// Panics if `v` is outside the bitmap.
    pub fn set(&self, v: u32) -> bool {
        let (word, mask) = Self::locate(v);
        self.words[word].fetch_or(mask, Ordering::Relaxed) & mask == 0
    }

    /// True if the bit of `v` is set
    #[must_use]
    pub fn contains(&self, v: u32) -> bool {
        let (word, mask) = Self::locate(v);
        self.words[word].load(Ordering::Relaxed) & mask != 0
    }

    /// Number of set bits
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// Set vertices in ascending order
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // bit positions < MAX_VERTICES
    pub fn to_vec(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.count_ones());
        for (i, word) in self.words.iter().enumerate() {
            let mut bits = word.load(Ordering::Relaxed);
            while bits != 0 {
                let bit = bits.trailing_zeros() as usize;
                out.push((i * WORD_BITS + bit) as u32);
                bits &= bits - 1;
            }
        }
        out
    }

    const fn locate(v: u32) -> (usize, u64) {
        let v = v as usize;
        (v / WORD_BITS, 1 << (v % WORD_BITS))
    }
}

/// Vertices active in the current level, replicated on every rank
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontier {
    vertices: Vec<u32>,
}

impl Frontier {
    /// Frontier holding `vertices` in the given order
    #[must_use]
    pub const fn new(vertices: Vec<u32>) -> Self {
        Self { vertices }
    }

    /// True when no vertex is active
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of active vertices
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Active vertices
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.vertices
    }

    /// Local rows of the active vertices owned by `view`'s rank
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // local rows < MAX_VERTICES
    pub fn owned_rows<W: Weight>(&self, view: &GraphView<'_, W>) -> Vec<u32> {
        self.vertices
            .iter()
            .filter_map(|&v| view.global_to_local(v))
            .map(|local| local as u32)
            .collect()
    }
}
