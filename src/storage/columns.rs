//! Columnar edge ingestion with dtype dispatch at the boundary
//!
//! Columns arrive tagged with a runtime dtype. They are matched once, here,
//! into the closed set the engine supports (`int32`/`int64` ids,
//! `float32`/`float64` weights) and converted to strongly typed
//! [`CooEdges`] right away. Anything else is `UnsupportedType`.

use super::coo::CooEdges;
use super::renumber::{renumber, NumberingMap, VertexColumn};
use crate::error::Result;

/// Borrowed weight column in one of the two supported widths
#[derive(Debug, Clone, Copy)]
pub enum WeightColumn<'a> {
    /// 32-bit float weights
    Float32(&'a [f32]),
    /// 64-bit float weights
    Float64(&'a [f64]),
}

impl WeightColumn<'_> {
    /// Number of entries
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::Float32(w) => w.len(),
            Self::Float64(w) => w.len(),
        }
    }

    /// True when the column has no entries
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Renumbered edge list with its weight type resolved
#[derive(Debug, Clone, PartialEq)]
pub enum TypedEdges {
    /// `float32` weights, or no weights at all
    Float32(CooEdges<f32>),
    /// `float64` weights
    Float64(CooEdges<f64>),
}

impl TypedEdges {
    /// Number of edges
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float32(e) => e.len(),
            Self::Float64(e) => e.len(),
        }
    }

    /// True when there are no edges
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Output of [`build_edge_list`]
#[derive(Debug, Clone)]
pub struct EdgeListBuild {
    /// Edges in the dense id space
    pub edges: TypedEdges,
    /// Dense → original id mapping
    pub numbering_map: NumberingMap,
}

impl EdgeListBuild {
    /// Size of the dense vertex space
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.numbering_map.len()
    }
}

/// Renumber the id columns and attach the weight column
///
/// # Errors
///
/// Renumbering errors, plus `SizeMismatch` if the weight column length
/// differs from the edge count
pub fn build_edge_list(
    src: VertexColumn<'_>,
    dst: VertexColumn<'_>,
    weights: Option<WeightColumn<'_>>,
) -> Result<EdgeListBuild> {
    let renumbered = renumber(src, dst)?;
    let numbering_map = renumbered.numbering_map;
    let edges = match weights {
        None => TypedEdges::Float32(CooEdges::new(renumbered.src, renumbered.dst, None)?),
        Some(WeightColumn::Float32(w)) => TypedEdges::Float32(CooEdges::new(
            renumbered.src,
            renumbered.dst,
            Some(w.to_vec()),
        )?),
        Some(WeightColumn::Float64(w)) => TypedEdges::Float64(CooEdges::new(
            renumbered.src,
            renumbered.dst,
            Some(w.to_vec()),
        )?),
    };
    Ok(EdgeListBuild {
        edges,
        numbering_map,
    })
}

#[cfg(feature = "arrow")]
pub use self::arrow_columns::{
    build_edge_list_from_arrow, vertex_column_from_arrow, weight_column_from_arrow,
};

#[cfg(feature = "arrow")]
mod arrow_columns {
    use super::{build_edge_list, EdgeListBuild, WeightColumn};
    use crate::error::{GraphError, Result};
    use crate::storage::renumber::VertexColumn;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};

    fn reject_nulls(array: &dyn Array, what: &str) -> Result<()> {
        if array.null_count() > 0 {
            return Err(GraphError::InvalidCall(format!(
                "{what} column contains {} null values",
                array.null_count()
            )));
        }
        Ok(())
    }

    /// View an Arrow array as a vertex id column
    ///
    /// # Errors
    ///
    /// `UnsupportedType` for dtypes other than `Int32` / `Int64`;
    /// `InvalidCall` if the column contains nulls
    pub fn vertex_column_from_arrow(array: &dyn Array) -> Result<VertexColumn<'_>> {
        reject_nulls(array, "vertex")?;
        match array.data_type() {
            DataType::Int32 => Ok(VertexColumn::Int32(
                &array.as_primitive::<Int32Type>().values()[..],
            )),
            DataType::Int64 => Ok(VertexColumn::Int64(
                &array.as_primitive::<Int64Type>().values()[..],
            )),
            other => Err(GraphError::UnsupportedType(format!(
                "vertex ids must be int32 or int64, got {other}"
            ))),
        }
    }

    /// View an Arrow array as a weight column
    ///
    /// # Errors
    ///
    /// `UnsupportedType` for dtypes other than `Float32` / `Float64`;
    /// `InvalidCall` if the column contains nulls
    pub fn weight_column_from_arrow(array: &dyn Array) -> Result<WeightColumn<'_>> {
        reject_nulls(array, "weight")?;
        match array.data_type() {
            DataType::Float32 => Ok(WeightColumn::Float32(
                &array.as_primitive::<Float32Type>().values()[..],
            )),
            DataType::Float64 => Ok(WeightColumn::Float64(
                &array.as_primitive::<Float64Type>().values()[..],
            )),
            other => Err(GraphError::UnsupportedType(format!(
                "weights must be float32 or float64, got {other}"
            ))),
        }
    }

    /// Renumber Arrow source/destination columns and attach optional weights
    ///
    /// # Errors
    ///
    /// Dtype errors from the column views, then renumbering errors
    pub fn build_edge_list_from_arrow(
        src: &dyn Array,
        dst: &dyn Array,
        weights: Option<&dyn Array>,
    ) -> Result<EdgeListBuild> {
        let weights = weights.map(weight_column_from_arrow).transpose()?;
        build_edge_list(
            vertex_column_from_arrow(src)?,
            vertex_column_from_arrow(dst)?,
            weights,
        )
    }
}
