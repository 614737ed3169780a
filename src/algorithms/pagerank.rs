//! `PageRank` by power iteration over the transposed view
//!
//! Based on Page et al. (1999) "The `PageRank` Citation Ranking: Bringing Order to the Web"
//!
//! ```text
//! PR(v) = α Σ_{u → v} PR(u) · w(u,v) / W(u)  +  (α D + (1 - α)) · p(v)
//! ```
//!
//! Where:
//! - W(u) = total out-weight of u
//! - D = rank mass on dangling vertices (W(u) = 0)
//! - p = personalization distribution, uniform 1/N by default

use crate::comms::{Comms, ReduceOp};
use crate::config::PageRankConfig;
use crate::engine::{run_propagation, PropagationOperator, PropagationOutcome};
use crate::error::{ConvergenceWarning, GraphError, Result};
use crate::storage::GraphView;
use crate::types::{EdgeRef, Orientation, VertexId, Weight};

/// Scores of a centrality run, indexed by global vertex id
#[derive(Debug, Clone, PartialEq)]
pub struct CentralityResult {
    /// One score per vertex
    pub scores: Vec<f64>,
    /// Iterations executed
    pub iterations: usize,
    /// L1 change of the last iteration
    pub residual: f64,
    /// Set when the iteration cap was reached first
    pub warning: Option<ConvergenceWarning>,
}

impl From<PropagationOutcome> for CentralityResult {
    fn from(outcome: PropagationOutcome) -> Self {
        Self {
            scores: outcome.values,
            iterations: outcome.iterations,
            residual: outcome.residual,
            warning: outcome.warning,
        }
    }
}

/// Teleport distribution over a subset of vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Personalization {
    vertices: Vec<VertexId>,
    values: Vec<f64>,
}

impl Personalization {
    /// Pair `vertices[i]` with `values[i]`; values are normalised to sum 1
    ///
    /// # Errors
    ///
    /// `SizeMismatch` if the arrays differ in length; `InvalidCall` if a value
    /// is negative or the values do not sum to a positive number
    pub fn new(vertices: Vec<VertexId>, values: Vec<f64>) -> Result<Self> {
        if vertices.len() != values.len() {
            return Err(GraphError::SizeMismatch {
                what: "personalization vertices/values",
                left: vertices.len(),
                right: values.len(),
            });
        }
        if values.iter().any(|&v| v < 0.0 || !v.is_finite()) {
            return Err(GraphError::InvalidCall(
                "personalization values must be finite and non-negative".to_string(),
            ));
        }
        let sum: f64 = values.iter().sum();
        if sum <= 0.0 {
            return Err(GraphError::InvalidCall(
                "personalization values must sum to a positive number".to_string(),
            ));
        }
        Ok(Self {
            vertices,
            values: values.into_iter().map(|v| v / sum).collect(),
        })
    }

    fn dense(&self, n: usize) -> Result<Vec<f64>> {
        let mut p = vec![0.0; n];
        for (&v, &value) in self.vertices.iter().zip(&self.values) {
            let slot = p.get_mut(v.0 as usize).ok_or_else(|| {
                GraphError::InvalidCall(format!(
                    "personalization vertex {} outside vertex range [0, {n})",
                    v.0
                ))
            })?;
            *slot += value;
        }
        Ok(p)
    }
}

struct PageRankOperator {
    alpha: f64,
    out_weight: Vec<f64>,
    teleport: Teleport,
}

enum Teleport {
    Uniform(f64),
    Personalized(Vec<f64>),
}

impl Teleport {
    fn at(&self, v: u32) -> f64 {
        match self {
            Self::Uniform(p) => *p,
            Self::Personalized(p) => p[v as usize],
        }
    }
}

impl<W: Weight> PropagationOperator<W> for PageRankOperator {
    fn local_scalar(&self, view: &GraphView<'_, W>, values: &[f64]) -> f64 {
        view.local_vertex_range()
            .filter(|&v| self.out_weight[v as usize] == 0.0)
            .map(|v| values[v as usize])
            .sum()
    }

    fn contribution(&self, edge: &EdgeRef<W>, values: &[f64]) -> f64 {
        let source = edge.neighbor as usize;
        let total = self.out_weight[source];
        if total > 0.0 {
            self.alpha * values[source] * edge.weight.as_f64() / total
        } else {
            0.0
        }
    }

    fn update(&self, vertex: u32, accumulated: f64, dangling: f64) -> f64 {
        accumulated + (self.alpha * dangling + (1.0 - self.alpha)) * self.teleport.at(vertex)
    }
}

/// Total out-weight of every vertex, from the in-view of every rank
fn out_weight_sums<W: Weight, C: Comms>(view: &GraphView<'_, W>, comms: &C) -> Result<Vec<f64>> {
    let mut sums = vec![0.0; view.num_vertices()];
    match view.weights() {
        Some(weights) => {
            for (&source, w) in view.indices().iter().zip(weights) {
                sums[source as usize] += w.as_f64();
            }
        }
        None => {
            for &source in view.indices() {
                sums[source as usize] += 1.0;
            }
        }
    }
    comms.all_reduce(&mut sums, ReduceOp::Sum)?;
    Ok(sums)
}

/// `PageRank` with a uniform teleport distribution and uniform start
///
/// # Errors
///
/// See [`pagerank_with`]
///
/// # Example
///
/// ```
/// use shardgraph::comms::SingleComms;
/// use shardgraph::storage::{CompressedShard, CooEdges};
/// use shardgraph::{pagerank, Orientation, PageRankConfig};
///
/// let coo = CooEdges::<f32>::from_pairs(&[(0, 1), (1, 2), (2, 0)]);
/// let shard = CompressedShard::from_coo(&coo, 3, Orientation::In).unwrap();
///
/// let result = pagerank(&shard.view(), &SingleComms, &PageRankConfig::default()).unwrap();
/// assert!((result.scores.iter().sum::<f64>() - 1.0).abs() < 1e-6);
/// ```
pub fn pagerank<W: Weight, C: Comms>(
    view: &GraphView<'_, W>,
    comms: &C,
    config: &PageRankConfig,
) -> Result<CentralityResult> {
    pagerank_with(view, comms, config, None, None)
}

/// `PageRank` with optional personalization and initial guess
///
/// `view` must be the in (transposed) view. `initial_guess` is required when
/// `config.has_initial_guess` is set, and rejected otherwise; it is
/// normalised to sum 1.
///
/// # Errors
///
/// `InvalidCall` for an invalid config, a missing in-view, or an
/// inconsistent initial guess; `SizeMismatch` if the guess does not hold one
/// value per vertex; `CommunicationFailure` from the collective layer
#[allow(clippy::cast_precision_loss)]
pub fn pagerank_with<W: Weight, C: Comms>(
    view: &GraphView<'_, W>,
    comms: &C,
    config: &PageRankConfig,
    personalization: Option<&Personalization>,
    initial_guess: Option<&[f64]>,
) -> Result<CentralityResult> {
    config.validate()?;
    if view.orientation() != Orientation::In {
        return Err(GraphError::InvalidCall(
            "pagerank needs the transposed (in) view".to_string(),
        ));
    }
    let n = view.num_vertices();
    if n == 0 {
        return Err(GraphError::DatasetEmpty);
    }

    let initial = match (config.has_initial_guess, initial_guess) {
        (false, None) => vec![1.0 / n as f64; n],
        (true, Some(guess)) => normalized_guess(guess, n)?,
        (true, None) => {
            return Err(GraphError::InvalidCall(
                "has_initial_guess is set but no initial guess was supplied".to_string(),
            ))
        }
        (false, Some(_)) => {
            return Err(GraphError::InvalidCall(
                "initial guess supplied but has_initial_guess is not set".to_string(),
            ))
        }
    };

    let teleport = match personalization {
        Some(p) => Teleport::Personalized(p.dense(n)?),
        None => Teleport::Uniform(1.0 / n as f64),
    };
    let op = PageRankOperator {
        alpha: config.alpha,
        out_weight: out_weight_sums(view, comms)?,
        teleport,
    };

    let outcome = run_propagation(view, comms, initial, &config.propagation(n), &op)?;
    Ok(outcome.into())
}

fn normalized_guess(guess: &[f64], n: usize) -> Result<Vec<f64>> {
    if guess.len() != n {
        return Err(GraphError::SizeMismatch {
            what: "initial guess/vertices",
            left: guess.len(),
            right: n,
        });
    }
    let sum: f64 = guess.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return Err(GraphError::InvalidCall(
            "initial guess must sum to a positive number".to_string(),
        ));
    }
    Ok(guess.iter().map(|g| g / sum).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comms::{SingleComms, ThreadComms};
    use crate::storage::{CompressedShard, CooEdges};

    fn in_shard(pairs: &[(u32, u32)], n: usize) -> CompressedShard<f64> {
        let coo = CooEdges::from_pairs(pairs);
        CompressedShard::from_coo(&coo, n, Orientation::In).unwrap()
    }

    #[test]
    fn test_cycle_is_uniform() {
        let shard = in_shard(&[(0, 1), (1, 2), (2, 0)], 3);
        let result = pagerank(&shard.view(), &SingleComms, &PageRankConfig::default()).unwrap();

        assert!(result.warning.is_none());
        for s in &result.scores {
            assert!((s - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_hub_ranks_highest() {
        // 1, 2, 3 all point to 0; 0 points to 1
        let shard = in_shard(&[(1, 0), (2, 0), (3, 0), (0, 1)], 4);
        let result = pagerank(&shard.view(), &SingleComms, &PageRankConfig::default()).unwrap();

        let max = result.scores.iter().copied().fold(f64::MIN, f64::max);
        assert!((result.scores[0] - max).abs() < f64::EPSILON);
        assert!((result.scores.iter().sum::<f64>() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_dangling_mass_is_redistributed() {
        // 2 has no out-edges
        let shard = in_shard(&[(0, 1), (1, 2)], 3);
        let result = pagerank(&shard.view(), &SingleComms, &PageRankConfig::default()).unwrap();
        assert!((result.scores.iter().sum::<f64>() - 1.0).abs() < 1e-4);
        assert!(result.scores[2] > result.scores[0]);
    }

    #[test]
    fn test_weights_shift_rank() {
        let coo = CooEdges::new(
            vec![0, 0, 1, 2],
            vec![1, 2, 0, 0],
            Some(vec![9.0_f64, 1.0, 1.0, 1.0]),
        )
        .unwrap();
        let shard = CompressedShard::from_coo(&coo, 3, Orientation::In).unwrap();
        let result = pagerank(&shard.view(), &SingleComms, &PageRankConfig::default()).unwrap();
        assert!(result.scores[1] > result.scores[2]);
    }

    #[test]
    fn test_personalization_concentrates_teleport() {
        let shard = in_shard(&[(0, 1), (1, 2), (2, 0), (3, 0)], 4);
        let p = Personalization::new(vec![VertexId(3)], vec![5.0]).unwrap();
        let result =
            pagerank_with(&shard.view(), &SingleComms, &PageRankConfig::default(), Some(&p), None)
                .unwrap();

        let uniform = pagerank(&shard.view(), &SingleComms, &PageRankConfig::default()).unwrap();
        assert!(result.scores[3] > uniform.scores[3]);
        assert!((result.scores.iter().sum::<f64>() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_initial_guess_contract() {
        let shard = in_shard(&[(0, 1), (1, 0)], 2);
        let cfg = PageRankConfig {
            has_initial_guess: true,
            ..PageRankConfig::default()
        };
        let err = pagerank(&shard.view(), &SingleComms, &cfg).unwrap_err();
        assert!(matches!(err, GraphError::InvalidCall(_)));

        let err = pagerank_with(&shard.view(), &SingleComms, &cfg, None, Some(&[1.0])).unwrap_err();
        assert!(matches!(err, GraphError::SizeMismatch { .. }));

        let result =
            pagerank_with(&shard.view(), &SingleComms, &cfg, None, Some(&[3.0, 1.0])).unwrap();
        assert!((result.scores[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_requires_in_view() {
        let coo = CooEdges::<f32>::from_pairs(&[(0, 1), (1, 0)]);
        let shard = CompressedShard::from_coo(&coo, 2, Orientation::Out).unwrap();
        let err = pagerank(&shard.view(), &SingleComms, &PageRankConfig::default()).unwrap_err();
        assert!(matches!(err, GraphError::InvalidCall(_)));
    }

    #[test]
    fn test_iteration_cap_warns() {
        let shard = in_shard(&[(1, 0), (2, 0), (3, 0), (0, 1)], 4);
        let cfg = PageRankConfig {
            max_iterations: 1,
            epsilon: 1e-12,
            ..PageRankConfig::default()
        };
        let result = pagerank(&shard.view(), &SingleComms, &cfg).unwrap();
        assert_eq!(result.iterations, 1);
        assert!(result.warning.is_some());
        assert_eq!(result.scores.len(), 4);
    }

    #[test]
    fn test_personalization_validation() {
        assert!(Personalization::new(vec![VertexId(0)], vec![]).is_err());
        assert!(Personalization::new(vec![VertexId(0)], vec![0.0]).is_err());
        assert!(Personalization::new(vec![VertexId(0)], vec![-1.0]).is_err());
    }

    #[test]
    fn test_two_ranks_match_single() {
        let pairs = [(0, 1), (0, 2), (1, 2), (2, 0), (3, 2), (4, 3), (2, 4)];
        let coo = CooEdges::<f64>::from_pairs(&pairs);
        let single = CompressedShard::from_coo(&coo, 5, Orientation::In).unwrap();
        let expected = pagerank(&single.view(), &SingleComms, &PageRankConfig::default()).unwrap();

        let shards = CompressedShard::build_partitioned(&coo, 5, 2, Orientation::In).unwrap();
        let results = ThreadComms::launch(2, |comms| {
            pagerank(&shards[comms.rank()].view(), &comms, &PageRankConfig::default())
        })
        .unwrap();

        for result in results {
            for (a, b) in result.scores.iter().zip(&expected.scores) {
                assert!((a - b).abs() < 1e-9);
            }
        }
    }
}
