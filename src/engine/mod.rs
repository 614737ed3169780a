//! Frontier/iteration engine
//!
//! Two generic execution shapes, both delegating all edge-level work to the
//! degree bucketer:
//!
//! - [`run_traversal`]: level-synchronous expansion of a frontier
//! - [`run_propagation`]: power iteration over every vertex
//!
//! Algorithms plug in as [`TraversalOperator`] / [`PropagationOperator`].

pub mod bucket;
pub mod frontier;
pub mod propagation;
pub mod traversal;

pub use bucket::{
    bucket_index, DegreeBuckets, Granularity, BLOCK_CHUNK, NUM_DEGREE_BUCKETS, THREAD_MAX_DEGREE,
    WARP_MAX_DEGREE,
};
pub use frontier::{Frontier, VertexBitmap};
pub use propagation::{run_propagation, PropagationOperator, PropagationOutcome};
pub use traversal::{run_traversal, Traversal, TraversalOperator, TraversalOutcome};
