//! Katz centrality
//!
//! Based on Katz (1953) "A new status index derived from sociometric analysis"
//!
//! ```text
//! x(v) = α Σ_{u → v} w(u,v) · x(u) + β
//! ```

use super::pagerank::CentralityResult;
use crate::comms::Comms;
use crate::config::KatzConfig;
use crate::engine::{run_propagation, PropagationOperator};
use crate::error::{GraphError, Result};
use crate::storage::GraphView;
use crate::types::{EdgeRef, Orientation, Weight};

struct KatzOperator {
    alpha: f64,
    beta: f64,
}

impl<W: Weight> PropagationOperator<W> for KatzOperator {
    fn contribution(&self, edge: &EdgeRef<W>, values: &[f64]) -> f64 {
        edge.weight.as_f64() * values[edge.neighbor as usize]
    }

    fn update(&self, _vertex: u32, accumulated: f64, _scalar: f64) -> f64 {
        self.alpha.mul_add(accumulated, self.beta)
    }
}

/// Katz centrality over the in (transposed) view, starting from zero
///
/// Convergence needs `alpha` below the reciprocal of the adjacency matrix's
/// largest eigenvalue; otherwise the iteration cap is hit and the returned
/// result carries a warning.
///
/// # Errors
///
/// `InvalidCall` for an invalid config or a missing in-view;
/// `CommunicationFailure` from the collective layer
pub fn katz_centrality<W: Weight, C: Comms>(
    view: &GraphView<'_, W>,
    comms: &C,
    config: &KatzConfig,
) -> Result<CentralityResult> {
    config.validate()?;
    if view.orientation() != Orientation::In {
        return Err(GraphError::InvalidCall(
            "katz centrality needs the transposed (in) view".to_string(),
        ));
    }

    let op = KatzOperator {
        alpha: config.alpha,
        beta: config.beta,
    };
    let initial = vec![0.0; view.num_vertices()];
    let mut result: CentralityResult =
        run_propagation(view, comms, initial, &config.propagation(), &op)?.into();

    if config.normalize {
        let norm = result.scores.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            for x in &mut result.scores {
                *x /= norm;
            }
        }
    }
    Ok(result)
}
