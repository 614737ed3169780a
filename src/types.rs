//! Core scalar types: vertex ids, edge weights, orientation

use num_traits::{Float, FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::iter::Sum;

/// Dense vertex identifier (zero-indexed, after renumbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub u32);

impl From<u32> for VertexId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Largest number of vertices the dense id space may hold
///
/// Ids must also be representable as `i32` so predecessors can use `-1`.
#[allow(clippy::cast_sign_loss)]
pub const MAX_VERTICES: usize = i32::MAX as usize;

/// Which endpoint groups the compressed neighbor lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Grouped by source: row `v` lists out-neighbors (CSR)
    Out,
    /// Grouped by destination: row `v` lists in-neighbors (CSC, transposed)
    In,
}

impl Orientation {
    /// The opposite orientation
    #[must_use]
    pub const fn transposed(self) -> Self {
        match self {
            Self::Out => Self::In,
            Self::In => Self::Out,
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Edge weight type: implemented for `f32` and `f64` only
pub trait Weight:
    sealed::Sealed
    + Float
    + FromPrimitive
    + ToPrimitive
    + Sum
    + Default
    + Debug
    + Send
    + Sync
    + 'static
{
    /// Dtype name reported in errors
    const DTYPE: &'static str;

    /// Lossless widening to `f64`
    fn as_f64(self) -> f64;

    /// Narrowing from `f64`
    fn from_f64_lossy(value: f64) -> Self;
}

impl Weight for f32 {
    const DTYPE: &'static str = "float32";

    fn as_f64(self) -> f64 {
        f64::from(self)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_f64_lossy(value: f64) -> Self {
        value as f32
    }
}

impl Weight for f64 {
    const DTYPE: &'static str = "float64";

    fn as_f64(self) -> f64 {
        self
    }

    fn from_f64_lossy(value: f64) -> Self {
        value
    }
}

/// One edge as seen by an operator
///
/// `row` is the vertex whose neighbor list is being scanned (source in an
/// `Out` view, destination in an `In` view); `neighbor` is the entry of that
/// list. Unweighted graphs report a weight of one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeRef<W> {
    /// Vertex owning the neighbor list (global id)
    pub row: u32,
    /// Neighbor (global id)
    pub neighbor: u32,
    /// Edge weight, or one when unweighted
    pub weight: W,
}
