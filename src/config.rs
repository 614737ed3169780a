//! Algorithm parameters
//!
//! Every config deserializes with missing fields filled from `Default`, so a
//! binding layer can pass `{}` or a partial JSON object. `validate` runs
//! before any kernel work.

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};

/// Termination parameters of the propagation shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Stop once the L1 change between iterates drops below this
    pub tolerance: f64,
    /// Iteration cap; hitting it yields a `ConvergenceWarning`
    pub max_iterations: usize,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

impl PropagationConfig {
    /// Check parameter ranges
    ///
    /// # Errors
    ///
    /// `InvalidCall` for a non-positive tolerance or a zero iteration cap
    pub fn validate(&self) -> Result<()> {
        check_positive("tolerance", self.tolerance)?;
        check_iterations(self.max_iterations)
    }
}

/// Breadth-first search parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BfsConfig {
    /// Stop after discovering vertices at this distance; `None` is unbounded
    pub max_depth: Option<u32>,
}

impl BfsConfig {
    /// Check parameter ranges
    ///
    /// # Errors
    ///
    /// `InvalidCall` for a depth limit of zero
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == Some(0) {
            return Err(GraphError::InvalidCall(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// `PageRank` parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    /// Damping factor
    pub alpha: f64,
    /// Per-vertex tolerance; the run stops when the L1 change is below `n * epsilon`
    pub epsilon: f64,
    /// Iteration cap
    pub max_iterations: usize,
    /// Start from the caller's initial values instead of the uniform vector
    pub has_initial_guess: bool,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            alpha: 0.85,
            epsilon: 1e-5,
            max_iterations: 500,
            has_initial_guess: false,
        }
    }
}

impl PageRankConfig {
    /// Check parameter ranges
    ///
    /// # Errors
    ///
    /// `InvalidCall` for alpha outside (0, 1), non-positive epsilon or a zero
    /// iteration cap
    pub fn validate(&self) -> Result<()> {
        check_alpha(self.alpha)?;
        check_positive("epsilon", self.epsilon)?;
        check_iterations(self.max_iterations)
    }

    /// Propagation termination for a graph of `num_vertices` vertices
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn propagation(&self, num_vertices: usize) -> PropagationConfig {
        PropagationConfig {
            tolerance: num_vertices as f64 * self.epsilon,
            max_iterations: self.max_iterations,
        }
    }
}

/// Katz centrality parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KatzConfig {
    /// Attenuation factor; must stay below 1 / largest eigenvalue to converge
    pub alpha: f64,
    /// Constant added to every vertex each iteration
    pub beta: f64,
    /// Tolerance on the L1 change between iterates
    pub epsilon: f64,
    /// Iteration cap
    pub max_iterations: usize,
    /// Scale the result to unit L2 norm
    pub normalize: bool,
}

impl Default for KatzConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            beta: 1.0,
            epsilon: 1e-6,
            max_iterations: 100,
            normalize: false,
        }
    }
}

impl KatzConfig {
    /// Check parameter ranges
    ///
    /// # Errors
    ///
    /// `InvalidCall` for alpha outside (0, 1), a non-finite beta,
    /// non-positive epsilon or a zero iteration cap
    pub fn validate(&self) -> Result<()> {
        check_alpha(self.alpha)?;
        if !self.beta.is_finite() {
            return Err(GraphError::InvalidCall(format!(
                "beta must be finite, got {}",
                self.beta
            )));
        }
        check_positive("epsilon", self.epsilon)?;
        check_iterations(self.max_iterations)
    }

    /// Propagation termination
    #[must_use]
    pub const fn propagation(&self) -> PropagationConfig {
        PropagationConfig {
            tolerance: self.epsilon,
            max_iterations: self.max_iterations,
        }
    }
}

fn check_alpha(alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(GraphError::InvalidCall(format!(
            "alpha must lie in (0, 1), got {alpha}"
        )))
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(GraphError::InvalidCall(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

fn check_iterations(max_iterations: usize) -> Result<()> {
    if max_iterations == 0 {
        return Err(GraphError::InvalidCall(
            "max_iterations must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let pr = PageRankConfig::default();
        assert!((pr.alpha - 0.85).abs() < f64::EPSILON);
        assert_eq!(pr.max_iterations, 500);
        pr.validate().unwrap();

        let katz = KatzConfig::default();
        assert!((katz.alpha - 0.1).abs() < f64::EPSILON);
        assert!((katz.beta - 1.0).abs() < f64::EPSILON);
        katz.validate().unwrap();

        BfsConfig::default().validate().unwrap();
        PropagationConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let pr: PageRankConfig = serde_json::from_str(r#"{"alpha": 0.9}"#).unwrap();
        assert!((pr.alpha - 0.9).abs() < f64::EPSILON);
        assert!((pr.epsilon - 1e-5).abs() < f64::EPSILON);

        let bfs: BfsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(bfs.max_depth, None);

        let katz: KatzConfig = serde_json::from_str(r#"{"normalize": true}"#).unwrap();
        assert!(katz.normalize);
        assert_eq!(katz.max_iterations, 100);
    }

    #[test]
    fn test_invalid_parameters() {
        let bad_alpha = PageRankConfig {
            alpha: 1.0,
            ..PageRankConfig::default()
        };
        assert!(matches!(bad_alpha.validate(), Err(GraphError::InvalidCall(_))));

        let bad_eps = KatzConfig {
            epsilon: 0.0,
            ..KatzConfig::default()
        };
        assert!(bad_eps.validate().is_err());

        let bad_iters = PropagationConfig {
            max_iterations: 0,
            ..PropagationConfig::default()
        };
        assert!(bad_iters.validate().is_err());

        assert!(BfsConfig { max_depth: Some(0) }.validate().is_err());
    }

    #[test]
    fn test_pagerank_tolerance_scales_with_vertices() {
        let cfg = PageRankConfig::default().propagation(1000);
        assert!((cfg.tolerance - 1e-2).abs() < 1e-12);
    }
}
