//! Read-only graph view shared by every algorithm
//!
//! A [`GraphView`] is a `Copy` handle over the buffers of one
//! [`CompressedShard`](super::CompressedShard): no buffer is cloned and no
//! mutation is exposed, so any number of algorithms (or parallel phases of
//! one algorithm) can hold and query the same view concurrently.

use super::partition::PartitionMap;
use crate::comms::Comms;
use crate::error::Result;
use crate::types::{EdgeRef, Orientation, VertexId, Weight};
use rayon::prelude::*;
use std::ops::Range;

/// Borrowed, immutable view over one rank's shard plus global partition metadata
#[derive(Debug, Clone, Copy)]
pub struct GraphView<'a, W: Weight> {
    offsets: &'a [usize],
    indices: &'a [u32],
    weights: Option<&'a [W]>,
    partition: &'a PartitionMap,
    rank: usize,
    orientation: Orientation,
}

impl<'a, W: Weight> GraphView<'a, W> {
    pub(crate) fn new(
        offsets: &'a [usize],
        indices: &'a [u32],
        weights: Option<&'a [W]>,
        partition: &'a PartitionMap,
        rank: usize,
        orientation: Orientation,
    ) -> Self {
        debug_assert_eq!(offsets.len(), partition.local_vertex_count(rank) + 1);
        debug_assert_eq!(offsets.last().copied().unwrap_or(0), indices.len());
        Self {
            offsets,
            indices,
            weights,
            partition,
            rank,
            orientation,
        }
    }

    /// Global vertex count
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.partition.num_vertices()
    }

    /// Global edge count
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.partition.num_edges()
    }

    /// Vertices owned by this rank
    #[must_use]
    pub fn num_local_vertices(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Edges stored in this shard
    #[must_use]
    pub fn num_local_edges(&self) -> usize {
        self.indices.len()
    }

    /// Row offsets (`num_local_vertices + 1` entries)
    #[must_use]
    pub const fn offsets(&self) -> &'a [usize] {
        self.offsets
    }

    /// Neighbor ids (global)
    #[must_use]
    pub const fn indices(&self) -> &'a [u32] {
        self.indices
    }

    /// Edge weights, if the graph is weighted
    #[must_use]
    pub const fn weights(&self) -> Option<&'a [W]> {
        self.weights
    }

    /// True when edge weights are stored
    #[must_use]
    pub const fn is_weighted(&self) -> bool {
        self.weights.is_some()
    }

    /// Orientation of the neighbor lists
    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Rank owning this shard
    #[must_use]
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// Partition metadata
    #[must_use]
    pub const fn partition(&self) -> &'a PartitionMap {
        self.partition
    }

    /// Global id range owned by this rank
    #[must_use]
    pub fn local_vertex_range(&self) -> Range<u32> {
        self.partition.vertex_range(self.rank)
    }

    /// True if this rank owns global vertex `v`
    #[must_use]
    pub fn is_local(&self, v: u32) -> bool {
        self.local_vertex_range().contains(&v)
    }

    /// Global id of a local row index
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // local < num_local_vertices <= MAX_VERTICES
    pub fn local_to_global(&self, local: usize) -> u32 {
        self.partition.to_global(self.rank, local as u32)
    }

    /// Local row index of a global vertex, if owned by this rank
    #[must_use]
    pub fn global_to_local(&self, v: u32) -> Option<usize> {
        self.partition.to_local(self.rank, v).map(|l| l as usize)
    }

    /// Neighbor list of local row `local`
    #[must_use]
    pub fn local_neighbors(&self, local: usize) -> &'a [u32] {
        &self.indices[self.offsets[local]..self.offsets[local + 1]]
    }

    /// Edge weights of local row `local`
    #[must_use]
    pub fn local_weights(&self, local: usize) -> Option<&'a [W]> {
        self.weights
            .map(|w| &w[self.offsets[local]..self.offsets[local + 1]])
    }

    /// Degree (in this view's orientation) of local row `local`
    #[must_use]
    pub fn local_degree(&self, local: usize) -> usize {
        self.offsets[local + 1] - self.offsets[local]
    }

    /// Neighbor list of an owned vertex, `None` if not owned by this rank
    #[must_use]
    pub fn neighbors(&self, vertex: VertexId) -> Option<&'a [u32]> {
        self.global_to_local(vertex.0)
            .map(|local| self.local_neighbors(local))
    }

    /// Degree of an owned vertex, `None` if not owned by this rank
    #[must_use]
    pub fn degree(&self, vertex: VertexId) -> Option<usize> {
        self.global_to_local(vertex.0)
            .map(|local| self.local_degree(local))
    }

    /// Edge at position `pos` of the shard, seen from local row `local`
    #[must_use]
    pub fn edge_at(&self, local: usize, pos: usize) -> EdgeRef<W> {
        EdgeRef {
            row: self.local_to_global(local),
            neighbor: self.indices[pos],
            weight: self.weights.map_or_else(W::one, |w| w[pos]),
        }
    }

    /// Edges of local row `local`
    pub fn local_edges(&self, local: usize) -> impl Iterator<Item = EdgeRef<W>> + 'a {
        let view = *self;
        (self.offsets[local]..self.offsets[local + 1]).map(move |pos| view.edge_at(local, pos))
    }

    /// True if every edge `u → v` is matched by an edge `v → u`
    ///
    /// Compares wrapping sums of a 64-bit mix of `(u, v)` and of `(v, u)`
    /// over all edges, so the check is linear and exchanges two words per
    /// rank. A non-symmetric edge multiset passes only on a hash collision.
    /// Collective.
    ///
    /// # Errors
    ///
    /// `CommunicationFailure` from the collective layer
    pub fn is_symmetric<C: Comms>(&self, comms: &C) -> Result<bool> {
        let add = |a: (u64, u64), b: (u64, u64)| (a.0.wrapping_add(b.0), a.1.wrapping_add(b.1));
        let (forward, backward) = (0..self.num_local_vertices())
            .into_par_iter()
            .map(|local| {
                let row = self.local_to_global(local);
                self.local_neighbors(local).iter().fold((0, 0), |acc, &nbr| {
                    add(acc, (edge_hash(row, nbr), edge_hash(nbr, row)))
                })
            })
            .reduce(|| (0, 0), add);

        let totals = comms
            .all_gather_v(&[(forward, backward)])?
            .into_iter()
            .flatten()
            .fold((0, 0), add);
        Ok(totals.0 == totals.1)
    }
}

/// splitmix64 finalizer over the packed pair
fn edge_hash(a: u32, b: u32) -> u64 {
    let mut z = (u64::from(a) << 32 | u64::from(b)).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
