//! Coordinate-list (COO) edge lists in the dense id space

use crate::error::{GraphError, Result};
use crate::types::{VertexId, Weight};
use std::collections::HashSet;

/// Unordered edge list: parallel source / destination / optional weight arrays
///
/// Multi-edges and self-loops are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct CooEdges<W: Weight> {
    src: Vec<u32>,
    dst: Vec<u32>,
    weights: Option<Vec<W>>,
}

impl<W: Weight> CooEdges<W> {
    /// Create an edge list from parallel arrays
    ///
    /// # Errors
    ///
    /// Returns `SizeMismatch` if the arrays differ in length
    pub fn new(src: Vec<u32>, dst: Vec<u32>, weights: Option<Vec<W>>) -> Result<Self> {
        if src.len() != dst.len() {
            return Err(GraphError::SizeMismatch {
                what: "source/destination",
                left: src.len(),
                right: dst.len(),
            });
        }
        if let Some(w) = &weights {
            if w.len() != src.len() {
                return Err(GraphError::SizeMismatch {
                    what: "edges/weights",
                    left: src.len(),
                    right: w.len(),
                });
            }
        }
        Ok(Self { src, dst, weights })
    }

    /// Create a weighted edge list from `(source, destination, weight)` triples
    #[must_use]
    pub fn from_triples(edges: &[(VertexId, VertexId, W)]) -> Self {
        Self {
            src: edges.iter().map(|(s, _, _)| s.0).collect(),
            dst: edges.iter().map(|(_, d, _)| d.0).collect(),
            weights: Some(edges.iter().map(|(_, _, w)| *w).collect()),
        }
    }

    /// Create an unweighted edge list from `(source, destination)` pairs
    #[must_use]
    pub fn from_pairs(edges: &[(u32, u32)]) -> Self {
        Self {
            src: edges.iter().map(|(s, _)| *s).collect(),
            dst: edges.iter().map(|(_, d)| *d).collect(),
            weights: None,
        }
    }

    /// Number of edges
    #[must_use]
    pub fn len(&self) -> usize {
        self.src.len()
    }

    /// True when there are no edges
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    /// Source endpoints
    #[must_use]
    pub fn src(&self) -> &[u32] {
        &self.src
    }

    /// Destination endpoints
    #[must_use]
    pub fn dst(&self) -> &[u32] {
        &self.dst
    }

    /// Edge weights, if any
    #[must_use]
    pub fn weights(&self) -> Option<&[W]> {
        self.weights.as_deref()
    }

    /// True when weights are present
    #[must_use]
    pub const fn is_weighted(&self) -> bool {
        self.weights.is_some()
    }

    /// One past the largest endpoint id, or zero for an empty list
    #[must_use]
    pub fn min_num_vertices(&self) -> usize {
        self.src
            .iter()
            .chain(self.dst.iter())
            .max()
            .map_or(0, |&v| v as usize + 1)
    }

    /// Same edges with source and destination swapped
    #[must_use]
    pub fn transposed(&self) -> Self {
        Self {
            src: self.dst.clone(),
            dst: self.src.clone(),
            weights: self.weights.clone(),
        }
    }

    /// Undirected closure: every edge plus its reverse, exact duplicates removed
    ///
    /// Duplicate `(src, dst)` pairs keep the weight of their first occurrence.
    #[must_use]
    pub fn symmetrized(&self) -> Self {
        let mut seen = HashSet::with_capacity(self.len() * 2);
        let mut src = Vec::with_capacity(self.len() * 2);
        let mut dst = Vec::with_capacity(self.len() * 2);
        let mut weights = self.weights.as_ref().map(|_| Vec::with_capacity(self.len() * 2));

        for i in 0..self.len() {
            let (s, d) = (self.src[i], self.dst[i]);
            for (a, b) in [(s, d), (d, s)] {
                if seen.insert((a, b)) {
                    src.push(a);
                    dst.push(b);
                    if let (Some(out), Some(w)) = (weights.as_mut(), self.weights.as_ref()) {
                        out.push(w[i]);
                    }
                }
            }
        }

        Self { src, dst, weights }
    }

    /// Iterate `(source, destination, weight)`; unweighted edges report one
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, W)> + '_ {
        (0..self.len()).map(move |i| {
            let weight = self.weights.as_ref().map_or_else(W::one, |w| w[i]);
            (self.src[i], self.dst[i], weight)
        })
    }

    /// Split into raw arrays
    #[must_use]
    pub fn into_parts(self) -> (Vec<u32>, Vec<u32>, Option<Vec<W>>) {
        (self.src, self.dst, self.weights)
    }
}
