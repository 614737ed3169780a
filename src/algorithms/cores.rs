//! Core numbers and k-core extraction by iterative peeling
//!
//! The k-core is the largest subgraph in which every vertex has degree at
//! least k; a vertex's core number is the largest k whose k-core contains it
//! (Batagelj & Zaversnik 2003). Peeling removes every vertex of degree `<= k`,
//! decrements its neighbors and repeats; when nothing is left to peel at `k`,
//! `k` jumps to the smallest remaining degree.
//!
//! Each peel round is two collectives: the peeled vertices (so every rank
//! records their core number) and the neighbor decrements they cause (applied
//! by the owning rank). Rows of peeled vertices are expanded through degree
//! buckets, so every edge is walked once per call.

use crate::comms::{Comms, ReduceOp};
use crate::engine::{DegreeBuckets, VertexBitmap};
use crate::error::{GraphError, Result};
use crate::storage::csr::all_gather_edges;
use crate::storage::{CompressedShard, CooEdges, GraphView};
use crate::types::Weight;

/// Core number per vertex, indexed by global vertex id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreNumberResult {
    /// Largest k whose k-core contains the vertex
    pub core_numbers: Vec<u32>,
    /// Largest core number in the graph
    pub max_core: u32,
}

impl CoreNumberResult {
    /// Vertices of the k-core, ascending
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // vertex ids < MAX_VERTICES
    pub fn members(&self, k: u32) -> Vec<u32> {
        self.core_numbers
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c >= k)
            .map(|(v, _)| v as u32)
            .collect()
    }
}

fn require_symmetric<W: Weight, C: Comms>(view: &GraphView<'_, W>, comms: &C) -> Result<()> {
    if view.is_symmetric(comms)? {
        Ok(())
    } else {
        Err(GraphError::InvalidCall(
            "core numbers need a symmetric view (see CooEdges::symmetrized)".to_string(),
        ))
    }
}

/// Core number of every vertex of a symmetric graph
///
/// Self-loops are ignored; parallel edges each count towards the degree, so
/// pass a deduplicated edge list (e.g. from
/// [`CooEdges::symmetrized`](crate::storage::CooEdges::symmetrized)) for the
/// usual simple-graph definition. Isolated vertices have core number 0.
///
/// # Errors
///
/// `InvalidCall` if the view is not symmetric;
/// `CommunicationFailure` from the collective layer
#[allow(clippy::cast_possible_truncation)] // degrees and ids < MAX_VERTICES
pub fn core_number<W: Weight, C: Comms>(
    view: &GraphView<'_, W>,
    comms: &C,
) -> Result<CoreNumberResult> {
    require_symmetric(view, comms)?;

    let span = tracing::info_span!("core_number", rank = comms.rank(), ranks = comms.size());
    let _enter = span.enter();

    let n = view.num_vertices();
    let mut degrees = DegreeBuckets::from_view(view).reduce_per_vertex(
        view,
        0_u32,
        |e| u32::from(e.row != e.neighbor),
        |a, b| a + b,
    );

    let mut core_numbers = vec![0_u32; n];
    let removed = VertexBitmap::new(n);
    // Owned rows not yet peeled; compacted whenever k moves
    let mut remaining: Vec<u32> = (0..view.num_local_vertices() as u32).collect();
    let mut pending: Vec<u32> = remaining
        .iter()
        .copied()
        .filter(|&row| degrees[row as usize] == 0)
        .collect();
    let mut k = 0_u32;
    let mut rounds = 0_usize;

    loop {
        let peeled: Vec<u32> = pending
            .iter()
            .map(|&row| view.local_to_global(row as usize))
            .collect();
        let decrements = DegreeBuckets::from_rows(view, &pending).filter_map_edges(view, |e| {
            (e.row != e.neighbor && !removed.contains(e.neighbor)).then_some(e.neighbor)
        });
        pending.clear();

        let peeled = comms.all_gather_v(&peeled)?;
        let decrements = comms.all_gather_v(&decrements)?;

        if peeled.iter().all(Vec::is_empty) {
            remaining.retain(|&row| !removed.contains(view.local_to_global(row as usize)));
            let local_min = remaining
                .iter()
                .map(|&row| u64::from(degrees[row as usize]))
                .min()
                .unwrap_or(u64::MAX);
            let global_min = comms.all_reduce_scalar(local_min, ReduceOp::Min)?;
            if global_min == u64::MAX {
                break;
            }
            // Nothing of degree <= k is left, so the minimum exceeds k
            k = global_min as u32;
            pending.extend(
                remaining
                    .iter()
                    .copied()
                    .filter(|&row| degrees[row as usize] <= k),
            );
            tracing::debug!(k, candidates = pending.len(), "core level raised");
            continue;
        }

        for &v in peeled.iter().flatten() {
            removed.set(v);
            core_numbers[v as usize] = k;
        }
        for &target in decrements.iter().flatten() {
            if removed.contains(target) {
                continue;
            }
            if let Some(row) = view.global_to_local(target) {
                let degree = &mut degrees[row];
                *degree = degree.saturating_sub(1);
                // Degrees only fall, so each row crosses down to k once
                if *degree == k {
                    pending.push(row as u32);
                }
            }
        }
        rounds += 1;
    }

    let max_core = core_numbers.iter().copied().max().unwrap_or(0);
    tracing::info!(max_core, rounds, "core numbers finished");
    Ok(CoreNumberResult {
        core_numbers,
        max_core,
    })
}

/// This rank's shard of the k-core subgraph
///
/// Keeps every edge whose endpoints both have core number `>= k`, weights
/// included. The result has the same vertex ids, vertex ranges and
/// orientation as `shard`; vertices outside the k-core keep empty rows.
/// `core_numbers` may be passed in from an earlier [`core_number`] call,
/// otherwise they are computed here.
///
/// Collective: the kept edges are exchanged across ranks.
///
/// # Errors
///
/// `InvalidCall` if core numbers must be computed and the shard is not
/// symmetric; `SizeMismatch` if `core_numbers` does not cover every vertex;
/// `DatasetEmpty` if the k-core has no edges;
/// `CommunicationFailure` from the collective layer
pub fn k_core<W: Weight, C: Comms>(
    shard: &CompressedShard<W>,
    comms: &C,
    k: u32,
    core_numbers: Option<&[u32]>,
) -> Result<CompressedShard<W>> {
    let view = shard.view();
    let computed;
    let cores = match core_numbers {
        Some(cores) => {
            if cores.len() != view.num_vertices() {
                return Err(GraphError::SizeMismatch {
                    what: "core numbers/vertices",
                    left: cores.len(),
                    right: view.num_vertices(),
                });
            }
            cores
        }
        None => {
            computed = core_number(&view, comms)?;
            &computed.core_numbers[..]
        }
    };

    let in_core = |v: u32| cores[v as usize] >= k;
    let (src, dst, weights) = shard.edge_list().into_parts();
    let keep: Vec<usize> = (0..src.len())
        .filter(|&i| in_core(src[i]) && in_core(dst[i]))
        .collect();
    let local = CooEdges::new(
        keep.iter().map(|&i| src[i]).collect(),
        keep.iter().map(|&i| dst[i]).collect(),
        weights.map(|w| keep.iter().map(|&i| w[i]).collect()),
    )?;

    let gathered = all_gather_edges(local, comms)?;
    tracing::info!(k, edges = gathered.len(), "k-core extracted");
    shard.rebuild(&gathered, shard.orientation())
}
