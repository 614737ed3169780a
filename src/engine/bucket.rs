//! Degree bucketing and granularity dispatch
//!
//! Based on the load-balanced advance of Gunrock (Wang et al., `PPoPP` 2016):
//! vertices are grouped by degree into exponential buckets and each bucket is
//! processed at a granularity proportional to its expected work.
//!
//! ```text
//! bucket 0: degree 0
//! bucket i: degree in [2^(i-1), 2^i)        (1 <= i < 15)
//! bucket 15: degree >= 2^14
//!
//! Thread  (degree < 32):    tiles of 32 vertices per task
//! Warp    (degree < 1024):  one task per vertex
//! Block   (degree >= 1024): edge list split into 256-edge chunks
//! ```
//!
//! The dispatchers are operator-agnostic: callers hand in the per-edge work.
//! An empty bucket launches no work.

use crate::storage::GraphView;
use crate::types::{EdgeRef, Weight};
use rayon::prelude::*;

/// Number of degree buckets
pub const NUM_DEGREE_BUCKETS: usize = 16;

/// Vertices with degree below this are processed one thread per vertex
pub const THREAD_MAX_DEGREE: usize = 32;

/// Vertices with degree below this (and at least [`THREAD_MAX_DEGREE`]) get one warp
pub const WARP_MAX_DEGREE: usize = 1024;

/// Edges per parallel chunk for block-granularity vertices
pub const BLOCK_CHUNK: usize = 256;

/// Unit of parallel work assigned to one vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// One thread walks the whole edge list
    Thread,
    /// One cooperative group walks the edge list
    Warp,
    /// The edge list is split across many workers
    Block,
}

impl Granularity {
    /// Granularity for a vertex of the given degree
    #[must_use]
    pub const fn for_degree(degree: usize) -> Self {
        if degree < THREAD_MAX_DEGREE {
            Self::Thread
        } else if degree < WARP_MAX_DEGREE {
            Self::Warp
        } else {
            Self::Block
        }
    }

    /// Granularity assigned to every vertex of bucket `bucket`
    #[must_use]
    pub const fn for_bucket(bucket: usize) -> Self {
        Self::for_degree(bucket_lower_bound(bucket))
    }
}

/// Bucket index of a vertex with `degree` edges
#[must_use]
pub const fn bucket_index(degree: usize) -> usize {
    if degree == 0 {
        return 0;
    }
    let log2 = (usize::BITS - 1 - degree.leading_zeros()) as usize;
    let index = log2 + 1;
    if index < NUM_DEGREE_BUCKETS {
        index
    } else {
        NUM_DEGREE_BUCKETS - 1
    }
}

/// Smallest degree that lands in `bucket`
#[must_use]
pub const fn bucket_lower_bound(bucket: usize) -> usize {
    if bucket == 0 {
        0
    } else {
        1 << (bucket - 1)
    }
}

/// Local vertices grouped by degree bucket
///
/// Stored as one array of local row indices with per-bucket offsets, the same
/// offsets/values layout as the shard itself. Within a bucket rows keep
/// ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegreeBuckets {
    offsets: [usize; NUM_DEGREE_BUCKETS + 1],
    rows: Vec<u32>,
}

impl DegreeBuckets {
    /// Bucket every local vertex of `view`
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // local rows < MAX_VERTICES
    pub fn from_view<W: Weight>(view: &GraphView<'_, W>) -> Self {
        let rows: Vec<u32> = (0..view.num_local_vertices() as u32).collect();
        Self::from_rows(view, &rows)
    }

    /// Bucket a subset of local rows (e.g. the owned part of a frontier)
    ///
    /// # Panics
    ///
    /// Panics if a row is not a local row of `view`.
    #[must_use]
    pub fn from_rows<W: Weight>(view: &GraphView<'_, W>, rows: &[u32]) -> Self {
        let mut offsets = [0_usize; NUM_DEGREE_BUCKETS + 1];
        for &row in rows {
            offsets[bucket_index(view.local_degree(row as usize)) + 1] += 1;
        }
        for b in 0..NUM_DEGREE_BUCKETS {
            offsets[b + 1] += offsets[b];
        }

        let mut cursor = offsets;
        let mut grouped = vec![0_u32; rows.len()];
        for &row in rows {
            let b = bucket_index(view.local_degree(row as usize));
            grouped[cursor[b]] = row;
            cursor[b] += 1;
        }

        Self {
            offsets,
            rows: grouped,
        }
    }

    /// Local rows in bucket `bucket`
    #[must_use]
    pub fn bucket(&self, bucket: usize) -> &[u32] {
        &self.rows[self.offsets[bucket]..self.offsets[bucket + 1]]
    }

    /// Vertex count per bucket
    #[must_use]
    pub fn sizes(&self) -> [usize; NUM_DEGREE_BUCKETS] {
        let mut sizes = [0; NUM_DEGREE_BUCKETS];
        for (b, size) in sizes.iter_mut().enumerate() {
            *size = self.offsets[b + 1] - self.offsets[b];
        }
        sizes
    }

    /// Total number of bucketed rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows were bucketed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows, grouped by bucket
    #[must_use]
    pub fn rows(&self) -> &[u32] {
        &self.rows
    }

    /// Contiguous row ranges per granularity, skipping empty ones
    fn by_granularity(&self) -> impl Iterator<Item = (Granularity, &[u32])> {
        let split = |g: Granularity| {
            let first = (0..NUM_DEGREE_BUCKETS)
                .find(|&b| Granularity::for_bucket(b) == g)
                .unwrap_or(NUM_DEGREE_BUCKETS);
            let last = (0..NUM_DEGREE_BUCKETS)
                .rev()
                .find(|&b| Granularity::for_bucket(b) == g)
                .map_or(first, |b| b + 1);
            &self.rows[self.offsets[first]..self.offsets[last]]
        };
        [Granularity::Thread, Granularity::Warp, Granularity::Block]
            .into_iter()
            .map(move |g| (g, split(g)))
            .filter(|(_, rows)| !rows.is_empty())
    }

    /// Apply `f` to every edge of every bucketed row
    pub fn for_each_edge<W, F>(&self, view: &GraphView<'_, W>, f: F)
    where
        W: Weight,
        F: Fn(EdgeRef<W>) + Sync + Send,
    {
        for (granularity, rows) in self.by_granularity() {
            match granularity {
                Granularity::Thread => rows.par_chunks(THREAD_MAX_DEGREE).for_each(|tile| {
                    for &row in tile {
                        view.local_edges(row as usize).for_each(&f);
                    }
                }),
                Granularity::Warp => rows
                    .par_iter()
                    .for_each(|&row| view.local_edges(row as usize).for_each(&f)),
                Granularity::Block => {
                    for &row in rows {
                        let local = row as usize;
                        edge_positions(view, local)
                            .into_par_iter()
                            .with_min_len(BLOCK_CHUNK)
                            .for_each(|pos| f(view.edge_at(local, pos)));
                    }
                }
            }
        }
    }

    /// Collect `f(edge)` for every edge where it returns `Some`
    ///
    /// Output order follows bucket order, then row order, then edge order.
    pub fn filter_map_edges<W, T, F>(&self, view: &GraphView<'_, W>, f: F) -> Vec<T>
    where
        W: Weight,
        T: Send,
        F: Fn(EdgeRef<W>) -> Option<T> + Sync + Send,
    {
        let f_ref = &f;
        let mut out = Vec::new();
        for (granularity, rows) in self.by_granularity() {
            let part: Vec<T> = match granularity {
                Granularity::Thread => rows
                    .par_chunks(THREAD_MAX_DEGREE)
                    .flat_map_iter(|tile| {
                        tile.iter()
                            .flat_map(move |&row| view.local_edges(row as usize))
                            .filter_map(f_ref)
                    })
                    .collect(),
                Granularity::Warp => rows
                    .par_iter()
                    .flat_map_iter(|&row| view.local_edges(row as usize).filter_map(f_ref))
                    .collect(),
                Granularity::Block => {
                    let mut part = Vec::new();
                    for &row in rows {
                        let local = row as usize;
                        let found: Vec<T> = edge_positions(view, local)
                            .into_par_iter()
                            .with_min_len(BLOCK_CHUNK)
                            .filter_map(|pos| f(view.edge_at(local, pos)))
                            .collect();
                        part.extend(found);
                    }
                    part
                }
            };
            out.extend(part);
        }
        out
    }

    /// Reduce `map(edge)` over each bucketed row's edges
    ///
    /// Returns one value per local row of `view`; rows not in any bucket (or
    /// without edges) keep `identity`.
    pub fn reduce_per_vertex<W, T, M, R>(
        &self,
        view: &GraphView<'_, W>,
        identity: T,
        map: M,
        reduce: R,
    ) -> Vec<T>
    where
        W: Weight,
        T: Copy + Send + Sync,
        M: Fn(EdgeRef<W>) -> T + Sync + Send,
        R: Fn(T, T) -> T + Sync + Send,
    {
        let fold_row = |row: u32| {
            let value = view
                .local_edges(row as usize)
                .fold(identity, |acc, e| reduce(acc, map(e)));
            (row, value)
        };

        let mut out = vec![identity; view.num_local_vertices()];
        for (granularity, rows) in self.by_granularity() {
            let part: Vec<(u32, T)> = match granularity {
                Granularity::Thread => rows
                    .par_chunks(THREAD_MAX_DEGREE)
                    .flat_map_iter(|tile| tile.iter().map(move |&row| fold_row(row)))
                    .collect(),
                Granularity::Warp => rows.par_iter().map(|&row| fold_row(row)).collect(),
                Granularity::Block => rows
                    .iter()
                    .map(|&row| {
                        let local = row as usize;
                        let value = edge_positions(view, local)
                            .into_par_iter()
                            .with_min_len(BLOCK_CHUNK)
                            .map(|pos| map(view.edge_at(local, pos)))
                            .reduce(|| identity, &reduce);
                        (row, value)
                    })
                    .collect(),
            };
            for (row, value) in part {
                out[row as usize] = value;
            }
        }
        out
    }
}

fn edge_positions<W: Weight>(view: &GraphView<'_, W>, local: usize) -> std::ops::Range<usize> {
    view.offsets()[local]..view.offsets()[local + 1]
}
