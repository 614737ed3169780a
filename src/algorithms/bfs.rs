//! Breadth-first search (distances and predecessors)
//!
//! Based on Ligra (Shun & Blelloch, `PPoPP` 2013) frontier-based traversal.
//! On an out-view edges are followed forward; on an in-view they are followed
//! backwards, which answers "who reaches this vertex" queries.

use crate::comms::Comms;
use crate::config::BfsConfig;
use crate::engine::{run_traversal, TraversalOperator};
use crate::error::Result;
use crate::storage::GraphView;
use crate::types::{VertexId, Weight};

/// Distance of a vertex no source reaches
pub const UNREACHABLE: u32 = u32::MAX;

/// Predecessor of sources and unreached vertices
pub const NO_PREDECESSOR: i32 = -1;

/// Per-vertex BFS output, indexed by global vertex id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BfsResult {
    /// Hops from the nearest source, [`UNREACHABLE`] if none reaches the vertex
    pub distances: Vec<u32>,
    /// Vertex the discovery came from, [`NO_PREDECESSOR`] for sources and unreached vertices
    pub predecessors: Vec<i32>,
}

impl BfsResult {
    /// True if some source reaches `v`
    #[must_use]
    pub fn is_reachable(&self, v: VertexId) -> bool {
        self.distances
            .get(v.0 as usize)
            .is_some_and(|&d| d != UNREACHABLE)
    }

    /// Vertices on the discovery path from a source to `v`, source first
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)] // ids fit in i32
    pub fn path_to(&self, v: VertexId) -> Option<Vec<u32>> {
        if !self.is_reachable(v) {
            return None;
        }
        let mut path = vec![v.0];
        let mut current = v.0 as usize;
        while self.predecessors[current] != NO_PREDECESSOR {
            current = self.predecessors[current] as usize;
            path.push(current as u32);
        }
        path.reverse();
        Some(path)
    }
}

struct BfsOperator {
    distances: Vec<u32>,
    predecessors: Vec<i32>,
}

impl<W: Weight> TraversalOperator<W> for BfsOperator {
    #[allow(clippy::cast_possible_wrap)] // vertex ids < MAX_VERTICES = i32::MAX
    fn discover(&mut self, vertex: u32, predecessor: Option<u32>, level: u32) {
        self.distances[vertex as usize] = level;
        self.predecessors[vertex as usize] = predecessor.map_or(NO_PREDECESSOR, |p| p as i32);
    }
}

/// Breadth-first search from one or more sources
///
/// Collective: every rank passes the same sources and config and receives
/// the full result arrays.
///
/// # Errors
///
/// `InvalidCall` for an invalid config, no sources, or a source outside the
/// vertex range; `CommunicationFailure` from the collective layer
///
/// # Example
///
/// ```
/// use shardgraph::comms::SingleComms;
/// use shardgraph::storage::{CompressedShard, CooEdges};
/// use shardgraph::{bfs, BfsConfig, Orientation, VertexId};
///
/// let coo = CooEdges::<f32>::from_pairs(&[(0, 1), (1, 2), (2, 3), (3, 0)]);
/// let shard = CompressedShard::from_coo(&coo, 4, Orientation::Out).unwrap();
///
/// let result = bfs(&shard.view(), &SingleComms, &[VertexId(0)], &BfsConfig::default()).unwrap();
/// assert_eq!(result.distances, vec![0, 1, 2, 3]);
/// assert_eq!(result.predecessors, vec![-1, 0, 1, 2]);
/// ```
pub fn bfs<W: Weight, C: Comms>(
    view: &GraphView<'_, W>,
    comms: &C,
    sources: &[VertexId],
    config: &BfsConfig,
) -> Result<BfsResult> {
    config.validate()?;
    let n = view.num_vertices();
    let sources: Vec<u32> = sources.iter().map(|s| s.0).collect();

    let mut op = BfsOperator {
        distances: vec![UNREACHABLE; n],
        predecessors: vec![NO_PREDECESSOR; n],
    };
    run_traversal(view, comms, &sources, config.max_depth, &mut op)?;

    Ok(BfsResult {
        distances: op.distances,
        predecessors: op.predecessors,
    })
}
