//! COO → CSR / CSC conversion and the owning compressed shard
//!
//! Based on `GraphBLAST` (Yang et al., ACM `ToMS` 2022) for GPU-optimized sparse matrix operations.
//!
//! # Compressed format
//!
//! ```text
//! Graph: 0 → 1, 0 → 2, 1 → 2
//!
//! CSR (Orientation::Out):
//!   offsets: [0, 2, 3, 3]  // Vertex 0: edges [0..2), vertex 1: [2..3), vertex 2: [3..3)
//!   indices: [1, 2, 2]     // Edge 0 → 1, edge 0 → 2, edge 1 → 2
//!
//! CSC (Orientation::In):
//!   offsets: [0, 0, 1, 3]
//!   indices: [0, 0, 1]     // In-neighbors of 1: {0}; of 2: {0, 1}
//! ```
//!
//! Conversion is a stable counting sort on the grouping key: per-vertex
//! counts, an exclusive prefix sum into `offsets`, then a scatter that uses a
//! copy of `offsets` as write cursors. Parallel edges keep input order.
//!
//! On a multi-rank graph each shard holds only the rows of its own vertex
//! range, but `indices` always store global ids.

use super::coo::CooEdges;
use super::partition::PartitionMap;
use super::view::GraphView;
use crate::comms::Comms;
use crate::error::{GraphError, Result};
use crate::types::{Orientation, Weight};

/// Owning compressed-sparse shard of one rank
///
/// Immutable once built; any "update" means building a new shard.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedShard<W: Weight> {
    /// Row offsets, `local_vertices + 1` entries
    offsets: Vec<usize>,

    /// Neighbor ids (global), `local_edges` entries
    indices: Vec<u32>,

    /// Edge weights parallel to `indices`
    weights: Option<Vec<W>>,

    partition: PartitionMap,
    rank: usize,
    orientation: Orientation,
}

impl<W: Weight> CompressedShard<W> {
    /// Convert a whole edge list into a single-rank shard
    ///
    /// # Errors
    ///
    /// Returns `DatasetEmpty` for an empty edge list and `InvalidCall` if
    /// `num_vertices` is smaller than the largest endpoint
    ///
    /// # Example
    ///
    /// ```
    /// use shardgraph::storage::{CompressedShard, CooEdges};
    /// use shardgraph::Orientation;
    ///
    /// let coo = CooEdges::<f32>::from_pairs(&[(0, 1), (0, 2), (1, 2)]);
    /// let shard = CompressedShard::from_coo(&coo, 3, Orientation::Out).unwrap();
    ///
    /// assert_eq!(shard.view().offsets(), &[0, 2, 3, 3]);
    /// ```
    pub fn from_coo(coo: &CooEdges<W>, num_vertices: usize, orientation: Orientation) -> Result<Self> {
        check_vertex_count(coo, num_vertices)?;
        let partition = PartitionMap::single(num_vertices, coo.len())?;
        Self::from_coo_partitioned(coo, &partition, 0, orientation)
    }

    /// Convert the part of `coo` whose grouping key falls in `rank`'s vertex range
    ///
    /// `coo` may be the full edge list or any superset of this rank's edges.
    ///
    /// # Errors
    ///
    /// Returns `DatasetEmpty` for an empty edge list and `InvalidCall` if the
    /// rank is outside the partition map or the map's edge range for this
    /// rank disagrees with the edges found
    ///
    /// # Panics
    ///
    /// Panics if an endpoint lies outside the partition's vertex range; the
    /// caller must pass edges in the dense id space.
    pub fn from_coo_partitioned(
        coo: &CooEdges<W>,
        partition: &PartitionMap,
        rank: usize,
        orientation: Orientation,
    ) -> Result<Self> {
        if coo.is_empty() {
            return Err(GraphError::DatasetEmpty);
        }
        if rank >= partition.num_ranks() {
            return Err(GraphError::InvalidCall(format!(
                "rank {rank} outside partition map of {} ranks",
                partition.num_ranks()
            )));
        }

        let num_vertices = partition.num_vertices();
        let (keys, others) = match orientation {
            Orientation::Out => (coo.src(), coo.dst()),
            Orientation::In => (coo.dst(), coo.src()),
        };
        assert!(
            keys.iter().chain(others.iter()).all(|&v| (v as usize) < num_vertices),
            "edge endpoint outside vertex range [0, {num_vertices})"
        );

        let range = partition.vertex_range(rank);
        let begin = range.start;
        let local_n = partition.local_vertex_count(rank);

        // Count per local row
        let mut offsets = vec![0_usize; local_n + 1];
        for &k in keys {
            if range.contains(&k) {
                offsets[(k - begin) as usize + 1] += 1;
            }
        }
        // Exclusive prefix sum
        for i in 0..local_n {
            offsets[i + 1] += offsets[i];
        }
        let nnz = offsets[local_n];

        if nnz != partition.local_edge_count(rank) {
            return Err(GraphError::InvalidCall(format!(
                "partition assigns {} edges to rank {rank} but {nnz} were found",
                partition.local_edge_count(rank)
            )));
        }

        // Scatter using the offsets as write cursors
        let mut cursor = offsets[..local_n].to_vec();
        let mut indices = vec![0_u32; nnz];
        let mut weights = coo.weights().map(|_| vec![W::zero(); nnz]);
        for (e, (&k, &o)) in keys.iter().zip(others.iter()).enumerate() {
            if !range.contains(&k) {
                continue;
            }
            let row = (k - begin) as usize;
            let pos = cursor[row];
            cursor[row] += 1;
            indices[pos] = o;
            if let (Some(out), Some(w)) = (weights.as_mut(), coo.weights()) {
                out[pos] = w[e];
            }
        }

        tracing::debug!(
            rank,
            ?orientation,
            local_vertices = local_n,
            local_edges = nnz,
            "built compressed shard"
        );

        Ok(Self {
            offsets,
            indices,
            weights,
            partition: partition.clone(),
            rank,
            orientation,
        })
    }

    /// Partition `coo` over `num_ranks` ranks by edge balance and build every shard
    ///
    /// Convenience for in-process deployments where one host holds the full
    /// edge list; shard `r` belongs to rank `r`.
    ///
    /// # Errors
    ///
    /// Propagates partitioning and conversion errors
    pub fn build_partitioned(
        coo: &CooEdges<W>,
        num_vertices: usize,
        num_ranks: usize,
        orientation: Orientation,
    ) -> Result<Vec<Self>> {
        check_vertex_count(coo, num_vertices)?;
        let keys = match orientation {
            Orientation::Out => coo.src(),
            Orientation::In => coo.dst(),
        };
        let partition = PartitionMap::balanced(&degree_counts(keys, num_vertices), num_ranks)?;
        (0..num_ranks)
            .map(|rank| Self::from_coo_partitioned(coo, &partition, rank, orientation))
            .collect()
    }

    /// Build the opposite-orientation shard for this rank's vertex range
    ///
    /// Re-derives the local edge list, exchanges it across ranks and re-runs
    /// the converter. Every rank must call this collectively.
    ///
    /// # Errors
    ///
    /// Returns `CommunicationFailure` if the exchange fails and `DatasetEmpty`
    /// if the graph has no edges
    pub fn materialize_transpose<C: Comms>(&self, comms: &C) -> Result<Self> {
        let gathered = all_gather_edges(self.edge_list(), comms)?;
        self.rebuild(&gathered, self.orientation.transposed())
    }

    /// Build this rank's shard of `gathered` over the same vertex ranges
    ///
    /// `gathered` must hold every rank's edges; edge ranges are re-derived
    /// from its degrees.
    pub(crate) fn rebuild(&self, gathered: &CooEdges<W>, orientation: Orientation) -> Result<Self> {
        let keys = match orientation {
            Orientation::Out => gathered.src(),
            Orientation::In => gathered.dst(),
        };
        let degrees = degree_counts(keys, self.partition.num_vertices());
        let partition =
            PartitionMap::from_vertex_offsets(self.partition.vertex_offsets().to_vec(), &degrees)?;

        Self::from_coo_partitioned(gathered, &partition, self.rank, orientation)
    }

    /// Re-derive this shard's edges as `(source, destination)` pairs
    #[must_use]
    pub fn edge_list(&self) -> CooEdges<W> {
        let view = self.view();
        let mut rows = Vec::with_capacity(self.indices.len());
        for local in 0..view.num_local_vertices() {
            let global = view.local_to_global(local);
            let degree = self.offsets[local + 1] - self.offsets[local];
            rows.extend(std::iter::repeat(global).take(degree));
        }
        let (src, dst) = match self.orientation {
            Orientation::Out => (rows, self.indices.clone()),
            Orientation::In => (self.indices.clone(), rows),
        };
        Self::coo_unchecked(src, dst, self.weights.clone())
    }

    fn coo_unchecked(src: Vec<u32>, dst: Vec<u32>, weights: Option<Vec<W>>) -> CooEdges<W> {
        // Lengths agree by construction
        match CooEdges::new(src, dst, weights) {
            Ok(coo) => coo,
            Err(err) => unreachable!("shard arrays out of sync: {err}"),
        }
    }

    /// Read-only view over this shard
    #[must_use]
    pub fn view(&self) -> GraphView<'_, W> {
        GraphView::new(
            &self.offsets,
            &self.indices,
            self.weights.as_deref(),
            &self.partition,
            self.rank,
            self.orientation,
        )
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

    /// Partition metadata shared by all shards of the graph
    #[must_use]
    pub const fn partition(&self) -> &PartitionMap {
        &self.partition
    }
}

/// Concatenate every rank's edges in rank order; collective
pub(crate) fn all_gather_edges<W: Weight, C: Comms>(
    local: CooEdges<W>,
    comms: &C,
) -> Result<CooEdges<W>> {
    let (src, dst, weights) = local.into_parts();
    let src: Vec<u32> = comms.all_gather_v(&src)?.concat();
    let dst: Vec<u32> = comms.all_gather_v(&dst)?.concat();
    let weights = match weights {
        Some(w) => Some(comms.all_gather_v(&w)?.concat()),
        None => None,
    };
    CooEdges::new(src, dst, weights)
}

/// Number of edges grouped under each vertex
#[must_use]
pub fn degree_counts(keys: &[u32], num_vertices: usize) -> Vec<usize> {
    let mut counts = vec![0_usize; num_vertices];
    for &k in keys {
        counts[k as usize] += 1;
    }
    counts
}

fn check_vertex_count<W: Weight>(coo: &CooEdges<W>, num_vertices: usize) -> Result<()> {
    if coo.is_empty() {
        return Err(GraphError::DatasetEmpty);
    }
    let needed = coo.min_num_vertices();
    if needed > num_vertices {
        return Err(GraphError::InvalidCall(format!(
            "edge list references vertex {} but num_vertices is {num_vertices}",
            needed - 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comms::{SingleComms, ThreadComms};

    fn triangle() -> CooEdges<f32> {
        CooEdges::new(vec![0, 0, 1], vec![1, 2, 2], Some(vec![1.0, 2.0, 3.0])).unwrap()
    }

    #[test]
    fn test_from_coo_csr() {
        let shard = CompressedShard::from_coo(&triangle(), 3, Orientation::Out).unwrap();
        let view = shard.view();

        assert_eq!(view.offsets(), &[0, 2, 3, 3]);
        let mut first: Vec<u32> = view.indices()[0..2].to_vec();
        first.sort_unstable();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(&view.indices()[2..3], &[2]);
        assert_eq!(view.weights(), Some(&[1.0, 2.0, 3.0][..]));
    }

    #[test]
    fn test_from_coo_csc() {
        let shard = CompressedShard::from_coo(&triangle(), 3, Orientation::In).unwrap();
        let view = shard.view();

        assert_eq!(view.offsets(), &[0, 0, 1, 3]);
        assert_eq!(view.indices(), &[0, 0, 1]);
        assert_eq!(view.weights(), Some(&[1.0, 2.0, 3.0][..]));
    }

    #[test]
    fn test_isolated_trailing_vertices() {
        let coo = CooEdges::<f64>::from_pairs(&[(0, 1)]);
        let shard = CompressedShard::from_coo(&coo, 4, Orientation::Out).unwrap();
        assert_eq!(shard.view().offsets(), &[0, 1, 1, 1, 1]);
        assert!(!shard.view().is_weighted());
    }

    #[test]
    fn test_empty_edge_list() {
        let coo = CooEdges::<f32>::from_pairs(&[]);
        let err = CompressedShard::from_coo(&coo, 3, Orientation::Out).unwrap_err();
        assert!(matches!(err, GraphError::DatasetEmpty));
    }

    #[test]
    fn test_vertex_count_too_small() {
        let err = CompressedShard::from_coo(&triangle(), 2, Orientation::Out).unwrap_err();
        assert!(matches!(err, GraphError::InvalidCall(_)));
    }

    #[test]
    fn test_multi_edges_keep_input_order() {
        let coo = CooEdges::new(vec![0, 0, 0], vec![1, 1, 1], Some(vec![1.0_f32, 2.0, 3.0])).unwrap();
        let shard = CompressedShard::from_coo(&coo, 2, Orientation::Out).unwrap();
        assert_eq!(shard.view().weights(), Some(&[1.0, 2.0, 3.0][..]));
    }

    #[test]
    fn test_build_partitioned_covers_edges() {
        let coo = CooEdges::<f32>::from_pairs(&[(0, 1), (1, 2), (2, 3), (3, 0), (3, 1)]);
        let shards = CompressedShard::build_partitioned(&coo, 4, 2, Orientation::Out).unwrap();

        assert_eq!(shards.len(), 2);
        let total: usize = shards.iter().map(|s| s.view().num_local_edges()).sum();
        assert_eq!(total, 5);
        for (rank, shard) in shards.iter().enumerate() {
            let view = shard.view();
            assert_eq!(view.num_local_edges(), view.partition().local_edge_count(rank));
            assert_eq!(view.offsets()[0], 0);
        }
    }

    #[test]
    fn test_partition_edge_range_mismatch() {
        let coo = CooEdges::<f32>::from_pairs(&[(0, 1), (1, 0)]);
        let partition = PartitionMap::from_offsets(vec![0, 1, 2], vec![0, 2, 2]).unwrap();
        let err = CompressedShard::from_coo_partitioned(&coo, &partition, 0, Orientation::Out)
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidCall(_)));
    }

    #[test]
    fn test_edge_list_round_trip() {
        let shard = CompressedShard::from_coo(&triangle(), 3, Orientation::In).unwrap();
        let edges = shard.edge_list();
        let mut triples: Vec<_> = edges.iter().map(|(s, d, w)| (s, d, w.to_bits())).collect();
        triples.sort_unstable();
        assert_eq!(
            triples,
            vec![(0, 1, 1.0_f32.to_bits()), (0, 2, 2.0_f32.to_bits()), (1, 2, 3.0_f32.to_bits())]
        );
    }

    #[test]
    fn test_materialize_transpose_single_rank() {
        let shard = CompressedShard::from_coo(&triangle(), 3, Orientation::Out).unwrap();
        let transposed = shard.materialize_transpose(&SingleComms).unwrap();
        let expected = CompressedShard::from_coo(&triangle(), 3, Orientation::In).unwrap();
        assert_eq!(transposed, expected);
    }

    #[test]
    fn test_materialize_transpose_multi_rank() {
        let coo = CooEdges::<f32>::from_pairs(&[(0, 3), (1, 3), (2, 0), (3, 1), (3, 2)]);
        let shards = CompressedShard::build_partitioned(&coo, 4, 2, Orientation::Out).unwrap();

        let results = ThreadComms::launch(2, |comms| {
            let shard = &shards[comms.rank()];
            let transposed = shard.materialize_transpose(&comms)?;
            let view = transposed.view();
            let mut rows = Vec::new();
            for local in 0..view.num_local_vertices() {
                let mut nbrs = view.local_neighbors(local).to_vec();
                nbrs.sort_unstable();
                rows.push((view.local_to_global(local), nbrs));
            }
            Ok(rows)
        })
        .unwrap();

        let mut all: Vec<_> = results.into_iter().flatten().collect();
        all.sort();
        assert_eq!(
            all,
            vec![(0, vec![2]), (1, vec![3]), (2, vec![3]), (3, vec![0, 1])]
        );
    }
}
