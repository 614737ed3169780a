//! Power-iteration propagation shape
//!
//! Every vertex participates in every iteration; there is no frontier.
//!
//! ```text
//! values = initial                          (replicated, length n)
//! repeat:
//!   scalar = all_reduce(Σ local_scalar)     (e.g. dangling mass)
//!   acc[v] = Σ_{u → v} contribution(u → v)  (bucketed over the in-view)
//!   new[v] = update(v, acc[v], scalar)      (owned v only)
//!   values = all_gather_v(new)              (rank order = id order)
//!   residual = all_reduce(Σ_owned |new - old|)
//! until residual < tolerance or the cap is hit
//! ```

use super::bucket::DegreeBuckets;
use crate::comms::{Comms, ReduceOp};
use crate::config::PropagationConfig;
use crate::error::{ConvergenceWarning, GraphError, Result};
use crate::storage::GraphView;
use crate::types::{EdgeRef, Orientation, Weight};
use rayon::prelude::*;

/// Algorithm-specific part of a power iteration
pub trait PropagationOperator<W: Weight>: Sync {
    /// This rank's share of a per-iteration scalar, summed across ranks
    fn local_scalar(&self, _view: &GraphView<'_, W>, _values: &[f64]) -> f64 {
        0.0
    }

    /// Contribution of in-edge `edge` (`neighbor → row`) to `row`'s accumulator
    fn contribution(&self, edge: &EdgeRef<W>, values: &[f64]) -> f64;

    /// New value of `vertex` from its accumulated contributions
    fn update(&self, vertex: u32, accumulated: f64, scalar: f64) -> f64;
}

/// Result of a propagation run
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationOutcome {
    /// Last iterate, indexed by global vertex id
    pub values: Vec<f64>,
    /// Iterations executed
    pub iterations: usize,
    /// L1 change of the last iteration
    pub residual: f64,
    /// Set when the cap was reached before the tolerance
    pub warning: Option<ConvergenceWarning>,
}

impl PropagationOutcome {
    /// True when the tolerance was met
    #[must_use]
    pub const fn converged(&self) -> bool {
        self.warning.is_none()
    }
}

/// Run a power iteration over the in-view `view`
///
/// `initial` must be replicated on every rank. Every rank must call this
/// collectively with the same configuration.
///
/// # Errors
///
/// `InvalidCall` if `view` is not the in (transposed) orientation or the
/// config is invalid; `SizeMismatch` if `initial` does not hold one value per
/// vertex; `CommunicationFailure` from the collective layer
pub fn run_propagation<W, C, O>(
    view: &GraphView<'_, W>,
    comms: &C,
    initial: Vec<f64>,
    config: &PropagationConfig,
    op: &O,
) -> Result<PropagationOutcome>
where
    W: Weight,
    C: Comms,
    O: PropagationOperator<W>,
{
    config.validate()?;
    if view.orientation() != Orientation::In {
        return Err(GraphError::InvalidCall(
            "propagation needs the transposed (in) view".to_string(),
        ));
    }
    let n = view.num_vertices();
    if initial.len() != n {
        return Err(GraphError::SizeMismatch {
            what: "initial values/vertices",
            left: initial.len(),
            right: n,
        });
    }

    let span = tracing::info_span!("propagation", rank = comms.rank(), ranks = comms.size());
    let _enter = span.enter();

    let buckets = DegreeBuckets::from_view(view);
    let range = view.local_vertex_range();
    let (begin, end) = (range.start as usize, range.end as usize);

    let mut values = initial;
    let mut residual = f64::INFINITY;
    let mut iterations = 0;

    while iterations < config.max_iterations {
        let scalar = comms.all_reduce_scalar(op.local_scalar(view, &values), ReduceOp::Sum)?;
        let current = &values;
        let sums = buckets.reduce_per_vertex(
            view,
            0.0,
            |edge| op.contribution(&edge, current),
            |a, b| a + b,
        );
        let local_new: Vec<f64> = sums
            .par_iter()
            .enumerate()
            .map(|(local, &acc)| op.update(view.local_to_global(local), acc, scalar))
            .collect();

        let local_diff: f64 = local_new
            .iter()
            .zip(&values[begin..end])
            .map(|(new, old)| (new - old).abs())
            .sum();

        let next: Vec<f64> = comms.all_gather_v(&local_new)?.concat();
        if next.len() != n {
            return Err(GraphError::CommunicationFailure(format!(
                "gathered {} values for {n} vertices",
                next.len()
            )));
        }
        values = next;
        residual = comms.all_reduce_scalar(local_diff, ReduceOp::Sum)?;
        iterations += 1;

        tracing::debug!(iteration = iterations, residual, "propagation iteration");
        if residual < config.tolerance {
            tracing::info!(iterations, residual, "propagation converged");
            return Ok(PropagationOutcome {
                values,
                iterations,
                residual,
                warning: None,
            });
        }
    }

    let warning = ConvergenceWarning {
        iterations,
        residual,
        tolerance: config.tolerance,
    };
    tracing::warn!(%warning, "propagation hit the iteration cap");
    Ok(PropagationOutcome {
        values,
        iterations,
        residual,
        warning: Some(warning),
    })
}
