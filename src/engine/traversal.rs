//! Level-synchronous traversal shape
//!
//! Based on Ligra (Shun & Blelloch, `PPoPP` 2013) frontier-based traversal.
//!
//! ```text
//! frontier = sources                 (replicated on every rank)
//! loop:
//!   rows   = frontier ∩ owned vertices
//!   local  = bucketed expand(rows): unvisited neighbor → (neighbor, row)
//!   global = all_gather_v(local)     (rank order)
//!   next   = first discovery of each vertex in global order
//!   stop when next is empty on every rank
//! ```
//!
//! The visited bitmap is replicated: every rank applies the same gathered
//! discoveries in the same order, so every rank makes the same decisions and
//! the operator sees each vertex discovered exactly once.

use super::bucket::DegreeBuckets;
use super::frontier::{Frontier, VertexBitmap};
use crate::comms::Comms;
use crate::error::{GraphError, Result};
use crate::storage::GraphView;
use crate::types::{EdgeRef, Weight};

/// Algorithm-specific part of a traversal
pub trait TraversalOperator<W: Weight>: Sync {
    /// Whether an edge may be followed; called concurrently during expansion
    fn filter(&self, _edge: &EdgeRef<W>) -> bool {
        true
    }

    /// Record the discovery of `vertex` at `level`
    ///
    /// Called exactly once per reached vertex, identically on every rank.
    /// Sources are discovered at level 0 without a predecessor.
    fn discover(&mut self, vertex: u32, predecessor: Option<u32>, level: u32);
}

/// Summary of a finished traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalOutcome {
    /// Distance of the farthest reached vertex
    pub levels: u32,
    /// Number of vertices reached, sources included
    pub visited: usize,
}

/// Traversal state that outlives a single run
///
/// The visited and claimed bitmaps are allocated once. Later runs skip
/// everything earlier runs reached, which lets one object label a whole
/// graph seed by seed (see
/// [`weakly_connected_components`](crate::weakly_connected_components)).
#[derive(Debug)]
pub struct Traversal<'a, 'g, W: Weight, C: Comms> {
    view: &'a GraphView<'g, W>,
    comms: &'a C,
    visited: VertexBitmap,
    // Rank-local dedup. Every claimed vertex is discovered in the same
    // level, so claimed stays a subset of visited and is never reset.
    claimed: VertexBitmap,
}

impl<'a, 'g, W: Weight, C: Comms> Traversal<'a, 'g, W, C> {
    /// Fresh state over every vertex of `view`
    #[must_use]
    pub fn new(view: &'a GraphView<'g, W>, comms: &'a C) -> Self {
        let n = view.num_vertices();
        Self {
            view,
            comms,
            visited: VertexBitmap::new(n),
            claimed: VertexBitmap::new(n),
        }
    }

    /// True if some run so far reached `v`
    #[must_use]
    pub fn is_visited(&self, v: u32) -> bool {
        self.visited.contains(v)
    }

    /// Expand from `sources`, skipping vertices reached by earlier runs
    ///
    /// Every rank must call this collectively with the same arguments.
    /// `max_depth = Some(d)` stops after vertices at distance `d` have been
    /// discovered. Sources already visited are ignored.
    ///
    /// # Errors
    ///
    /// `InvalidCall` for an empty source list or a source outside the vertex
    /// range; `CommunicationFailure` from the collective layer
    pub fn run<O: TraversalOperator<W>>(
        &mut self,
        sources: &[u32],
        max_depth: Option<u32>,
        op: &mut O,
    ) -> Result<TraversalOutcome> {
        let view = self.view;
        let n = view.num_vertices();
        if sources.is_empty() {
            return Err(GraphError::InvalidCall(
                "traversal needs at least one source".to_string(),
            ));
        }
        if let Some(&bad) = sources.iter().find(|&&s| s as usize >= n) {
            return Err(GraphError::InvalidCall(format!(
                "source {bad} outside vertex range [0, {n})"
            )));
        }

        let mut frontier_vertices = Vec::with_capacity(sources.len());
        for &s in sources {
            if self.visited.set(s) {
                op.discover(s, None, 0);
                frontier_vertices.push(s);
            }
        }
        let mut reached = frontier_vertices.len();
        let mut frontier = Frontier::new(frontier_vertices);
        let mut level = 0_u32;

        while !frontier.is_empty() && max_depth.map_or(true, |d| level < d) {
            let rows = frontier.owned_rows(view);
            let buckets = DegreeBuckets::from_rows(view, &rows);

            let visited = &self.visited;
            let claimed = &self.claimed;
            let shared_op: &O = op;
            let local: Vec<(u32, u32)> = buckets.filter_map_edges(view, |edge| {
                let candidate = !visited.contains(edge.neighbor)
                    && shared_op.filter(&edge)
                    && claimed.set(edge.neighbor);
                candidate.then_some((edge.neighbor, edge.row))
            });

            let gathered = self.comms.all_gather_v(&local)?;
            let next_level = level + 1;

            let mut next = Vec::new();
            for (vertex, predecessor) in gathered.into_iter().flatten() {
                if self.visited.set(vertex) {
                    op.discover(vertex, Some(predecessor), next_level);
                    next.push(vertex);
                }
            }

            tracing::debug!(
                level = next_level,
                expanded = rows.len(),
                local_candidates = local.len(),
                discovered = next.len(),
                "traversal level"
            );
            if !next.is_empty() {
                level = next_level;
            }
            reached += next.len();
            frontier = Frontier::new(next);
        }

        Ok(TraversalOutcome {
            levels: level,
            visited: reached,
        })
    }
}

/// Run a single traversal from `sources` over `view`
///
/// Every rank must call this collectively with the same sources and depth
/// limit. See [`Traversal::run`].
///
/// # Errors
///
/// `InvalidCall` for an empty source list or a source outside the vertex
/// range; `CommunicationFailure` from the collective layer
pub fn run_traversal<W, C, O>(
    view: &GraphView<'_, W>,
    comms: &C,
    sources: &[u32],
    max_depth: Option<u32>,
    op: &mut O,
) -> Result<TraversalOutcome>
where
    W: Weight,
    C: Comms,
    O: TraversalOperator<W>,
{
    let span = tracing::info_span!("traversal", rank = comms.rank(), ranks = comms.size());
    let _enter = span.enter();

    let outcome = Traversal::new(view, comms).run(sources, max_depth, op)?;
    tracing::info!(levels = outcome.levels, visited = outcome.visited, "traversal finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comms::{SingleComms, ThreadComms};
    use crate::storage::{CompressedShard, CooEdges};
    use crate::types::Orientation;

    #[derive(Default)]
    struct Levels {
        level: Vec<Option<u32>>,
        pred: Vec<Option<u32>>,
        discoveries: usize,
    }

    impl Levels {
        fn new(n: usize) -> Self {
            Self {
                level: vec![None; n],
                pred: vec![None; n],
                discoveries: 0,
            }
        }
    }

    impl<W: Weight> TraversalOperator<W> for Levels {
        fn discover(&mut self, vertex: u32, predecessor: Option<u32>, level: u32) {
            self.level[vertex as usize] = Some(level);
            self.pred[vertex as usize] = predecessor;
            self.discoveries += 1;
        }
    }

    struct SkipHeavy(Levels);

    impl TraversalOperator<f32> for SkipHeavy {
        fn filter(&self, edge: &EdgeRef<f32>) -> bool {
            edge.weight < 5.0
        }

        fn discover(&mut self, vertex: u32, predecessor: Option<u32>, level: u32) {
            <Levels as TraversalOperator<f32>>::discover(&mut self.0, vertex, predecessor, level);
        }
    }

    fn diamond() -> CooEdges<f32> {
        // 0 → 1 → 3, 0 → 2 → 3, 3 → 4
        CooEdges::from_pairs(&[(0, 1), (0, 2), (1, 3), (2, 3), (3, 4)])
    }

    #[test]
    fn test_levels_on_diamond() {
        let shard = CompressedShard::from_coo(&diamond(), 6, Orientation::Out).unwrap();
        let mut op = Levels::new(6);
        let outcome = run_traversal(&shard.view(), &SingleComms, &[0], None, &mut op).unwrap();

        assert_eq!(op.level, vec![Some(0), Some(1), Some(1), Some(2), Some(3), None]);
        assert!(matches!(op.pred[3], Some(1 | 2)));
        assert_eq!(op.discoveries, 5);
        assert_eq!(outcome, TraversalOutcome { levels: 3, visited: 5 });
    }

    #[test]
    fn test_depth_limit() {
        let shard = CompressedShard::from_coo(&diamond(), 6, Orientation::Out).unwrap();
        let mut op = Levels::new(6);
        let outcome = run_traversal(&shard.view(), &SingleComms, &[0], Some(1), &mut op).unwrap();

        assert_eq!(outcome.levels, 1);
        assert_eq!(op.level[3], None);
        assert_eq!(op.discoveries, 3);
    }

    #[test]
    fn test_multiple_and_duplicate_sources() {
        let shard = CompressedShard::from_coo(&diamond(), 6, Orientation::Out).unwrap();
        let mut op = Levels::new(6);
        run_traversal(&shard.view(), &SingleComms, &[3, 0, 3], None, &mut op).unwrap();

        assert_eq!(op.level[3], Some(0));
        assert_eq!(op.level[4], Some(1));
        assert_eq!(op.pred[3], None);
        assert_eq!(op.discoveries, 5);
    }

    #[test]
    fn test_filter_blocks_edges() {
        let coo = CooEdges::new(vec![0, 0, 1], vec![1, 2, 2], Some(vec![10.0_f32, 1.0, 1.0])).unwrap();
        let shard = CompressedShard::from_coo(&coo, 3, Orientation::Out).unwrap();
        let mut op = SkipHeavy(Levels::new(3));
        run_traversal(&shard.view(), &SingleComms, &[0], None, &mut op).unwrap();

        assert_eq!(op.0.level, vec![Some(0), None, Some(1)]);
    }

    #[test]
    fn test_invalid_sources() {
        let shard = CompressedShard::from_coo(&diamond(), 6, Orientation::Out).unwrap();
        let mut op = Levels::new(6);
        let err = run_traversal(&shard.view(), &SingleComms, &[], None, &mut op).unwrap_err();
        assert!(matches!(err, GraphError::InvalidCall(_)));
        let err = run_traversal(&shard.view(), &SingleComms, &[6], None, &mut op).unwrap_err();
        assert!(matches!(err, GraphError::InvalidCall(_)));
    }

    #[test]
    fn test_long_path_reaches_every_level() {
        let n = 50_000_u32;
        let pairs: Vec<(u32, u32)> = (0..n - 1).map(|v| (v, v + 1)).collect();
        let coo = CooEdges::<f32>::from_pairs(&pairs);
        let shard = CompressedShard::from_coo(&coo, n as usize, Orientation::Out).unwrap();
        let mut op = Levels::new(n as usize);

        let outcome = run_traversal(&shard.view(), &SingleComms, &[0], None, &mut op).unwrap();

        assert_eq!(outcome, TraversalOutcome { levels: n - 1, visited: n as usize });
        assert_eq!(op.level[n as usize - 1], Some(n - 1));
        assert_eq!(op.pred[n as usize - 1], Some(n - 2));
    }

    #[test]
    fn test_reused_state_skips_visited() {
        let shard = CompressedShard::from_coo(&diamond(), 6, Orientation::Out).unwrap();
        let view = shard.view();
        let mut traversal = Traversal::new(&view, &SingleComms);
        let mut op = Levels::new(6);

        let first = traversal.run(&[1], None, &mut op).unwrap();
        assert_eq!(first, TraversalOutcome { levels: 2, visited: 3 });
        assert!(traversal.is_visited(4));

        // From 0 only 2 is new
        let second = traversal.run(&[0], None, &mut op).unwrap();
        assert_eq!(second, TraversalOutcome { levels: 1, visited: 2 });
        assert_eq!(op.level[2], Some(1));
        assert_eq!(op.discoveries, 5);

        let third = traversal.run(&[4], None, &mut op).unwrap();
        assert_eq!(third, TraversalOutcome { levels: 0, visited: 0 });
        assert!(!traversal.is_visited(5));
    }

    #[test]
    fn test_multi_rank_matches_single() {
        let coo = diamond();
        let shards = CompressedShard::build_partitioned(&coo, 6, 3, Orientation::Out).unwrap();

        let levels = ThreadComms::launch(3, |comms| {
            let mut op = Levels::new(6);
            run_traversal(&shards[comms.rank()].view(), &comms, &[0], None, &mut op)?;
            Ok(op.level)
        })
        .unwrap();

        for rank_levels in levels {
            assert_eq!(rank_levels, vec![Some(0), Some(1), Some(1), Some(2), Some(3), None]);
        }
    }
}
