//! Renumbering of raw vertex identifiers into a dense `u32` space
//!
//! Distinct ids from both endpoint columns are sorted and assigned dense ids
//! in ascending order, so the mapping is reproducible for identical input:
//!
//! ```text
//! src: [10, 10, 30, 40]      dense src: [0, 0, 1, 2]
//! dst: [30, 40, 10, 10]  ->  dense dst: [1, 2, 0, 0]
//!                            numbering map: [10, 30, 40]
//! ```
//!
//! The dense space is always 32-bit, also for 64-bit input. Inputs with more
//! than [`MAX_VERTICES`] distinct ids fail with [`GraphError::Overflow`]
//! instead of truncating.

use crate::error::{GraphError, Result};
use crate::types::{VertexId, MAX_VERTICES};
use rayon::prelude::*;

/// Borrowed identifier column in one of the two supported widths
#[derive(Debug, Clone, Copy)]
pub enum VertexColumn<'a> {
    /// 32-bit signed ids
    Int32(&'a [i32]),
    /// 64-bit signed ids
    Int64(&'a [i64]),
}

impl<'a> VertexColumn<'a> {
    /// Number of entries
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::Int32(ids) => ids.len(),
            Self::Int64(ids) => ids.len(),
        }
    }

    /// True when the column has no entries
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dtype name
    #[must_use]
    pub const fn dtype(&self) -> &'static str {
        match self {
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
        }
    }

    fn widened(&self) -> Vec<i64> {
        match self {
            Self::Int32(ids) => ids.par_iter().map(|&id| i64::from(id)).collect(),
            Self::Int64(ids) => ids.to_vec(),
        }
    }
}

impl<'a> From<&'a [i32]> for VertexColumn<'a> {
    fn from(ids: &'a [i32]) -> Self {
        Self::Int32(ids)
    }
}

impl<'a> From<&'a [i64]> for VertexColumn<'a> {
    fn from(ids: &'a [i64]) -> Self {
        Self::Int64(ids)
    }
}

/// Dense id → original id, sorted ascending by original id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingMap {
    original: Vec<i64>,
}

impl NumberingMap {
    /// Number of distinct vertices
    #[must_use]
    pub fn len(&self) -> usize {
        self.original.len()
    }

    /// True when no vertices were renumbered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// `numbering_map[dense_id] == original_id`
    #[must_use]
    pub fn as_slice(&self) -> &[i64] {
        &self.original
    }

    /// Original identifier of a dense vertex
    #[must_use]
    pub fn original_id(&self, vertex: VertexId) -> Option<i64> {
        self.original.get(vertex.0 as usize).copied()
    }

    /// Dense id assigned to an original identifier
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // len checked against MAX_VERTICES
    pub fn dense_id(&self, original: i64) -> Option<VertexId> {
        self.original
            .binary_search(&original)
            .ok()
            .map(|pos| VertexId(pos as u32))
    }

    /// Translate dense ids back to original identifiers
    ///
    /// # Errors
    ///
    /// Returns `InvalidCall` if a dense id is outside the map
    pub fn unrenumber(&self, dense: &[u32]) -> Result<Vec<i64>> {
        dense
            .par_iter()
            .map(|&v| {
                self.original.get(v as usize).copied().ok_or_else(|| {
                    GraphError::InvalidCall(format!(
                        "dense id {v} outside numbering map of {} vertices",
                        self.original.len()
                    ))
                })
            })
            .collect()
    }
}

/// Output of [`renumber`]
#[derive(Debug, Clone)]
pub struct Renumbered {
    /// Dense source ids
    pub src: Vec<u32>,
    /// Dense destination ids
    pub dst: Vec<u32>,
    /// Dense → original mapping
    pub numbering_map: NumberingMap,
}

impl Renumbered {
    /// Size of the dense vertex space
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.numbering_map.len()
    }
}

/// Renumber source/destination columns into a dense, sorted-order id space
///
/// # Errors
///
/// - `SizeMismatch` if the columns differ in length
/// - `UnsupportedType` if the columns differ in width
/// - `DatasetEmpty` if the columns are empty
/// - `Overflow` if more than [`MAX_VERTICES`] distinct ids appear
///
/// # Example
///
/// ```
/// use shardgraph::storage::{renumber, VertexColumn};
///
/// let src = [10_i64, 10, 30, 40];
/// let dst = [30_i64, 40, 10, 10];
/// let out = renumber(VertexColumn::from(&src[..]), VertexColumn::from(&dst[..])).unwrap();
///
/// assert_eq!(out.src, vec![0, 0, 1, 2]);
/// assert_eq!(out.numbering_map.as_slice(), &[10, 30, 40]);
/// ```
pub fn renumber(src: VertexColumn<'_>, dst: VertexColumn<'_>) -> Result<Renumbered> {
    renumber_with_limit(src, dst, MAX_VERTICES)
}

pub(crate) fn renumber_with_limit(
    src: VertexColumn<'_>,
    dst: VertexColumn<'_>,
    limit: usize,
) -> Result<Renumbered> {
    if src.len() != dst.len() {
        return Err(GraphError::SizeMismatch {
            what: "source/destination columns",
            left: src.len(),
            right: dst.len(),
        });
    }
    if src.dtype() != dst.dtype() {
        return Err(GraphError::UnsupportedType(format!(
            "source column is {} but destination column is {}",
            src.dtype(),
            dst.dtype()
        )));
    }
    if src.is_empty() {
        return Err(GraphError::DatasetEmpty);
    }

    let src = src.widened();
    let dst = dst.widened();

    let mut unique: Vec<i64> = src.iter().chain(dst.iter()).copied().collect();
    unique.par_sort_unstable();
    unique.dedup();

    if unique.len() > limit {
        return Err(GraphError::Overflow {
            count: unique.len(),
            limit,
        });
    }

    let numbering_map = NumberingMap { original: unique };
    let dense = |ids: &[i64]| -> Vec<u32> {
        ids.par_iter()
            .map(|&id| {
                numbering_map
                    .dense_id(id)
                    .map_or(u32::MAX, |vertex| vertex.0)
            })
            .collect()
    };

    let src_dense = dense(&src);
    let dst_dense = dense(&dst);

    tracing::debug!(
        edges = src_dense.len(),
        vertices = numbering_map.len(),
        "renumbered edge list"
    );

    Ok(Renumbered {
        src: src_dense,
        dst: dst_dense,
        numbering_map,
    })
}
