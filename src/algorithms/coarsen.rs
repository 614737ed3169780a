//! Graph coarsening: collapse vertices sharing a label into one vertex
//!
//! Used between levels of multilevel community detection (Blondel et al.
//! 2008): every community becomes a vertex and edges between communities are
//! aggregated.

use crate::comms::Comms;
use crate::error::{GraphError, Result};
use crate::storage::{degree_counts, CompressedShard, CooEdges, PartitionMap};
use crate::types::{Orientation, Weight};

/// Output of [`coarsen_graph`]
#[derive(Debug, Clone, PartialEq)]
pub struct CoarsenedGraph<W: Weight> {
    /// This rank's shard of the coarse graph, same orientation as the input
    pub shard: CompressedShard<W>,
    /// Original label of each coarse vertex, ascending
    pub coarse_vertex_labels: Vec<u32>,
}

impl<W: Weight> CoarsenedGraph<W> {
    /// Number of coarse vertices
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.coarse_vertex_labels.len()
    }
}

/// Collapse every group of vertices with the same label into one vertex
///
/// `labels[v]` is vertex `v`'s label, replicated on every rank. Coarse vertex
/// `i` stands for the `i`-th smallest distinct label. Each edge `u → v`
/// becomes `label(u) → label(v)` (self-loops included); parallel coarse edges
/// are merged, summing their weights on weighted graphs. Neighbor lists of
/// the result are sorted.
///
/// Collective: the coarse edges are exchanged across ranks and
/// re-partitioned by edge balance.
///
/// # Errors
///
/// `SizeMismatch` if `labels` does not hold one label per vertex;
/// `CommunicationFailure` from the collective layer
pub fn coarsen_graph<W: Weight, C: Comms>(
    shard: &CompressedShard<W>,
    comms: &C,
    labels: &[u32],
) -> Result<CoarsenedGraph<W>> {
    let view = shard.view();
    let n = view.num_vertices();
    if labels.len() != n {
        return Err(GraphError::SizeMismatch {
            what: "labels/vertices",
            left: labels.len(),
            right: n,
        });
    }

    let mut coarse_vertex_labels = labels.to_vec();
    coarse_vertex_labels.sort_unstable();
    coarse_vertex_labels.dedup();
    #[allow(clippy::cast_possible_truncation)] // coarse ids <= vertex count
    let coarse_id = |v: u32| {
        let label = labels[v as usize];
        coarse_vertex_labels.partition_point(|&l| l < label) as u32
    };

    // Map local edges to coarse pairs, then aggregate locally before the exchange
    let local = shard.edge_list();
    let mut triples: Vec<(u32, u32, W)> = local
        .iter()
        .map(|(s, d, w)| (coarse_id(s), coarse_id(d), w))
        .collect();
    aggregate(&mut triples, view.is_weighted());

    let gathered: Vec<(u32, u32, W)> = comms.all_gather_v(&triples)?.concat();
    let mut triples = gathered;
    aggregate(&mut triples, view.is_weighted());

    let num_coarse = coarse_vertex_labels.len();
    let coarse = into_coo(triples, view.is_weighted())?;
    let keys = match shard.orientation() {
        Orientation::Out => coarse.src(),
        Orientation::In => coarse.dst(),
    };
    let partition = PartitionMap::balanced(&degree_counts(keys, num_coarse), comms.size())?;
    let coarse_shard =
        CompressedShard::from_coo_partitioned(&coarse, &partition, comms.rank(), shard.orientation())?;

    tracing::info!(
        vertices = n,
        coarse_vertices = num_coarse,
        coarse_edges = coarse.len(),
        "graph coarsened"
    );
    Ok(CoarsenedGraph {
        shard: coarse_shard,
        coarse_vertex_labels,
    })
}

/// Sort by (source, destination) and merge duplicates
fn aggregate<W: Weight>(triples: &mut Vec<(u32, u32, W)>, weighted: bool) {
    triples.sort_unstable_by_key(|&(s, d, _)| (s, d));
    triples.dedup_by(|next, kept| {
        let same = next.0 == kept.0 && next.1 == kept.1;
        if same && weighted {
            kept.2 = kept.2 + next.2;
        }
        same
    });
}

fn into_coo<W: Weight>(triples: Vec<(u32, u32, W)>, weighted: bool) -> Result<CooEdges<W>> {
    let mut src = Vec::with_capacity(triples.len());
    let mut dst = Vec::with_capacity(triples.len());
    let mut weights = Vec::with_capacity(if weighted { triples.len() } else { 0 });
    for (s, d, w) in triples {
        src.push(s);
        dst.push(d);
        if weighted {
            weights.push(w);
        }
    }
    CooEdges::new(src, dst, weighted.then_some(weights))
}
