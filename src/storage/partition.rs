//! Partition map: contiguous vertex and edge ranges owned by each rank
//!
//! ```text
//! ranks = 2, vertices 0..6, degrees [3, 1, 0, 2, 2, 0]
//!
//! vertex_offsets: [0, 3, 6]    rank 0 owns vertices [0, 3), rank 1 owns [3, 6)
//! edge_offsets:   [0, 4, 8]    rank 0 owns edges [0, 4), rank 1 owns [4, 8)
//! ```
//!
//! Ranges never overlap and together cover the full id range. Edge ranges
//! refer to the global edge order induced by the grouping key (source for
//! `Out`, destination for `In`).

use crate::error::{GraphError, Result};
use crate::types::MAX_VERTICES;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Vertex / edge ownership of every rank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionMap {
    vertex_offsets: Vec<u32>,
    edge_offsets: Vec<usize>,
}

impl PartitionMap {
    /// Build from explicit offsets, validating the cover/non-overlap invariant
    ///
    /// # Errors
    ///
    /// Returns `InvalidCall` if there are no ranks, offsets do not start at
    /// zero, or decrease; `SizeMismatch` if the two offset arrays disagree in
    /// rank count; `Overflow` if the vertex count exceeds the id limit
    pub fn from_offsets(vertex_offsets: Vec<u32>, edge_offsets: Vec<usize>) -> Result<Self> {
        if vertex_offsets.len() < 2 {
            return Err(GraphError::InvalidCall(
                "partition map needs at least one rank".to_string(),
            ));
        }
        if vertex_offsets.len() != edge_offsets.len() {
            return Err(GraphError::SizeMismatch {
                what: "vertex/edge partition offsets",
                left: vertex_offsets.len(),
                right: edge_offsets.len(),
            });
        }
        if vertex_offsets[0] != 0 || edge_offsets[0] != 0 {
            return Err(GraphError::InvalidCall(
                "partition offsets must start at zero".to_string(),
            ));
        }
        if vertex_offsets.windows(2).any(|w| w[0] > w[1])
            || edge_offsets.windows(2).any(|w| w[0] > w[1])
        {
            return Err(GraphError::InvalidCall(
                "partition offsets must be non-decreasing".to_string(),
            ));
        }
        let num_vertices = *vertex_offsets.last().unwrap_or(&0) as usize;
        if num_vertices > MAX_VERTICES {
            return Err(GraphError::Overflow {
                count: num_vertices,
                limit: MAX_VERTICES,
            });
        }

        Ok(Self {
            vertex_offsets,
            edge_offsets,
        })
    }

    /// Single rank owning everything
    ///
    /// # Errors
    ///
    /// Returns `Overflow` if `num_vertices` exceeds the id limit
    pub fn single(num_vertices: usize, num_edges: usize) -> Result<Self> {
        Self::from_offsets(vec![0, checked_vertex_count(num_vertices)?], vec![0, num_edges])
    }

    /// Split vertices into `num_ranks` ranges of (nearly) equal size
    ///
    /// `degrees[v]` is the number of edges grouped under vertex `v`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCall` for zero ranks, `Overflow` for too many vertices
    pub fn uniform(degrees: &[usize], num_ranks: usize) -> Result<Self> {
        if num_ranks == 0 {
            return Err(GraphError::InvalidCall("zero ranks requested".to_string()));
        }
        let n = checked_vertex_count(degrees.len())?;
        #[allow(clippy::cast_possible_truncation)] // num_ranks <= n or offsets clamp to n
        let vertex_offsets: Vec<u32> = (0..=num_ranks)
            .map(|r| ((u64::from(n) * r as u64) / num_ranks as u64) as u32)
            .collect();
        Self::from_vertex_offsets(vertex_offsets, degrees)
    }

    /// Split vertices into contiguous ranges holding roughly `E / num_ranks` edges each
    ///
    /// # Errors
    ///
    /// Returns `InvalidCall` for zero ranks, `Overflow` for too many vertices
    pub fn balanced(degrees: &[usize], num_ranks: usize) -> Result<Self> {
        if num_ranks == 0 {
            return Err(GraphError::InvalidCall("zero ranks requested".to_string()));
        }
        let n = checked_vertex_count(degrees.len())?;
        let prefix = prefix_sum(degrees);
        let total = prefix[degrees.len()];
        if total == 0 {
            return Self::uniform(degrees, num_ranks);
        }

        let mut vertex_offsets = Vec::with_capacity(num_ranks + 1);
        vertex_offsets.push(0_u32);
        for r in 1..num_ranks {
            let target = total * r / num_ranks;
            // First vertex whose preceding edge count reaches the target
            #[allow(clippy::cast_possible_truncation)]
            let cut = prefix.partition_point(|&p| p < target).min(n as usize) as u32;
            let prev = *vertex_offsets.last().unwrap_or(&0);
            vertex_offsets.push(cut.max(prev));
        }
        vertex_offsets.push(n);

        Self::from_vertex_offsets(vertex_offsets, degrees)
    }

    /// Map with fixed vertex cuts; edge offsets follow from per-vertex degrees
    pub(crate) fn from_vertex_offsets(vertex_offsets: Vec<u32>, degrees: &[usize]) -> Result<Self> {
        let prefix = prefix_sum(degrees);
        let edge_offsets = vertex_offsets.iter().map(|&v| prefix[v as usize]).collect();
        Self::from_offsets(vertex_offsets, edge_offsets)
    }

    /// Number of ranks
    #[must_use]
    pub fn num_ranks(&self) -> usize {
        self.vertex_offsets.len() - 1
    }

    /// Global vertex count
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        *self.vertex_offsets.last().unwrap_or(&0) as usize
    }

    /// Global edge count
    #[must_use]
    pub fn num_edges(&self) -> usize {
        *self.edge_offsets.last().unwrap_or(&0)
    }

    /// Vertex range `[begin, end)` owned by `rank`
    #[must_use]
    pub fn vertex_range(&self, rank: usize) -> Range<u32> {
        self.vertex_offsets[rank]..self.vertex_offsets[rank + 1]
    }

    /// Edge range `[begin, end)` owned by `rank`
    #[must_use]
    pub fn edge_range(&self, rank: usize) -> Range<usize> {
        self.edge_offsets[rank]..self.edge_offsets[rank + 1]
    }

    /// Number of vertices owned by `rank`
    #[must_use]
    pub fn local_vertex_count(&self, rank: usize) -> usize {
        (self.vertex_offsets[rank + 1] - self.vertex_offsets[rank]) as usize
    }

    /// Number of edges owned by `rank`
    #[must_use]
    pub fn local_edge_count(&self, rank: usize) -> usize {
        self.edge_offsets[rank + 1] - self.edge_offsets[rank]
    }

    /// Rank owning global vertex `v`, or `None` if out of range
    #[must_use]
    pub fn rank_of(&self, v: u32) -> Option<usize> {
        if v as usize >= self.num_vertices() {
            return None;
        }
        // Last rank whose begin <= v; empty ranks share a begin with their successor
        Some(self.vertex_offsets.partition_point(|&o| o <= v) - 1)
    }

    /// Local index of global vertex `v` on `rank`, if owned there
    #[must_use]
    pub fn to_local(&self, rank: usize, v: u32) -> Option<u32> {
        let range = self.vertex_range(rank);
        range.contains(&v).then(|| v - range.start)
    }

    /// Global id of local index `local` on `rank`
    #[must_use]
    pub fn to_global(&self, rank: usize, local: u32) -> u32 {
        self.vertex_offsets[rank] + local
    }

    /// Per-rank vertex offsets (`num_ranks + 1` entries)
    #[must_use]
    pub fn vertex_offsets(&self) -> &[u32] {
        &self.vertex_offsets
    }

    /// Per-rank edge offsets (`num_ranks + 1` entries)
    #[must_use]
    pub fn edge_offsets(&self) -> &[usize] {
        &self.edge_offsets
    }
}

fn checked_vertex_count(n: usize) -> Result<u32> {
    if n > MAX_VERTICES {
        return Err(GraphError::Overflow {
            count: n,
            limit: MAX_VERTICES,
        });
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(n as u32)
}

fn prefix_sum(degrees: &[usize]) -> Vec<usize> {
    let mut prefix = Vec::with_capacity(degrees.len() + 1);
    let mut acc = 0;
    prefix.push(acc);
    for &d in degrees {
        acc += d;
        prefix.push(acc);
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_partition() {
        let map = PartitionMap::single(5, 7).unwrap();
        assert_eq!(map.num_ranks(), 1);
        assert_eq!(map.vertex_range(0), 0..5);
        assert_eq!(map.edge_range(0), 0..7);
        assert_eq!(map.rank_of(4), Some(0));
        assert_eq!(map.rank_of(5), None);
    }

    #[test]
    fn test_uniform_partition_covers_range() {
        let degrees = vec![3, 1, 0, 2, 2, 0];
        let map = PartitionMap::uniform(&degrees, 2).unwrap();

        assert_eq!(map.vertex_offsets(), &[0, 3, 6]);
        assert_eq!(map.edge_offsets(), &[0, 4, 8]);
        assert_eq!(map.num_edges(), 8);
        assert_eq!(map.local_vertex_count(1), 3);
        assert_eq!(map.local_edge_count(0), 4);
    }

    #[test]
    fn test_balanced_partition_follows_edges() {
        // Vertex 0 holds most of the edges
        let degrees = vec![9, 1, 1, 1];
        let map = PartitionMap::balanced(&degrees, 2).unwrap();

        assert_eq!(map.vertex_offsets(), &[0, 1, 4]);
        assert_eq!(map.edge_offsets(), &[0, 9, 12]);
    }

    #[test]
    fn test_more_ranks_than_vertices() {
        let degrees = vec![1, 1];
        let map = PartitionMap::uniform(&degrees, 4).unwrap();

        assert_eq!(map.num_ranks(), 4);
        let owned: usize = (0..4).map(|r| map.local_vertex_count(r)).sum();
        assert_eq!(owned, 2);
        for v in 0..2 {
            let rank = map.rank_of(v).unwrap();
            assert!(map.vertex_range(rank).contains(&v));
        }
    }

    #[test]
    fn test_local_global_translation() {
        let map = PartitionMap::from_offsets(vec![0, 2, 5], vec![0, 4, 6]).unwrap();
        assert_eq!(map.to_local(1, 3), Some(1));
        assert_eq!(map.to_local(0, 3), None);
        assert_eq!(map.to_global(1, 1), 3);
        assert_eq!(map.rank_of(2), Some(1));
    }

    #[test]
    fn test_from_offsets_validation() {
        assert!(PartitionMap::from_offsets(vec![0], vec![0]).is_err());
        assert!(PartitionMap::from_offsets(vec![1, 3], vec![0, 2]).is_err());
        assert!(PartitionMap::from_offsets(vec![0, 3, 2], vec![0, 1, 2]).is_err());
        assert!(matches!(
            PartitionMap::from_offsets(vec![0, 3], vec![0, 1, 2]),
            Err(GraphError::SizeMismatch { .. })
        ));
        assert!(PartitionMap::uniform(&[1, 2], 0).is_err());
    }

    #[test]
    fn test_partition_map_serde() {
        let map = PartitionMap::uniform(&[1, 2, 3], 2).unwrap();
        let json = serde_json::to_string(&map).unwrap();
        let back: PartitionMap = serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
    }
}
