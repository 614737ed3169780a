//! Weakly connected components by repeated traversal
//!
//! Each unlabelled vertex, taken in ascending id order, seeds a traversal that
//! labels everything it reaches with the seed's id. All seeds share one
//! visited bitmap, so every vertex and edge is expanded once per call. Over a
//! symmetric graph this yields the weakly connected components, each labelled
//! by its smallest vertex id.

use crate::comms::Comms;
use crate::engine::{Traversal, TraversalOperator};
use crate::error::{GraphError, Result};
use crate::storage::GraphView;
use crate::types::Weight;

/// Component label per vertex, indexed by global vertex id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentsResult {
    /// Smallest vertex id of the vertex's component
    pub labels: Vec<u32>,
    /// Number of distinct components
    pub num_components: usize,
}

impl ComponentsResult {
    /// Vertex count of every component, keyed by label in ascending order
    #[must_use]
    pub fn component_sizes(&self) -> Vec<(u32, usize)> {
        let mut sizes = std::collections::BTreeMap::new();
        for &label in &self.labels {
            *sizes.entry(label).or_insert(0) += 1;
        }
        sizes.into_iter().collect()
    }
}

struct Labeler {
    labels: Vec<u32>,
    seed: u32,
}

impl<W: Weight> TraversalOperator<W> for Labeler {
    fn discover(&mut self, vertex: u32, _predecessor: Option<u32>, _level: u32) {
        self.labels[vertex as usize] = self.seed;
    }
}

/// Weakly connected components of a symmetric graph
///
/// The view must hold both directions of every edge, e.g. built from
/// [`CooEdges::symmetrized`](crate::storage::CooEdges::symmetrized).
///
/// # Errors
///
/// `InvalidCall` if the view is not symmetric;
/// `CommunicationFailure` from the collective layer
#[allow(clippy::cast_possible_truncation)] // vertex ids < MAX_VERTICES
pub fn weakly_connected_components<W: Weight, C: Comms>(
    view: &GraphView<'_, W>,
    comms: &C,
) -> Result<ComponentsResult> {
    if !view.is_symmetric(comms)? {
        return Err(GraphError::InvalidCall(
            "weakly connected components need a symmetric view (see CooEdges::symmetrized)"
                .to_string(),
        ));
    }

    let span = tracing::info_span!("wcc", rank = comms.rank(), ranks = comms.size());
    let _enter = span.enter();

    let n = view.num_vertices();
    let mut traversal = Traversal::new(view, comms);
    let mut op = Labeler {
        labels: vec![0; n],
        seed: 0,
    };
    let mut num_components = 0;

    for seed in 0..n as u32 {
        if traversal.is_visited(seed) {
            continue;
        }
        op.seed = seed;
        traversal.run(&[seed], None, &mut op)?;
        num_components += 1;
    }

    tracing::info!(num_components, "weakly connected components finished");
    Ok(ComponentsResult {
        labels: op.labels,
        num_components,
    })
}
