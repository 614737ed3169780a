//! shardgraph: partitioned compressed-sparse graph engine
//!
//! # Overview
//!
//! shardgraph turns columnar edge lists into renumbered, partitioned CSR/CSC
//! shards and runs vertex-centric algorithms over them, on one device or
//! sharded across many ranks that talk only through collectives.
//!
//! # Quick Start
//!
//! ```
//! use shardgraph::comms::SingleComms;
//! use shardgraph::storage::{build_edge_list, CompressedShard, TypedEdges, VertexColumn};
//! use shardgraph::{bfs, BfsConfig, Orientation, VertexId};
//!
//! # fn main() -> Result<(), shardgraph::GraphError> {
//! // Sparse 64-bit ids are renumbered into a dense 32-bit space
//! let src = [100_i64, 200, 300];
//! let dst = [200_i64, 300, 100];
//! let built = build_edge_list(VertexColumn::from(&src[..]), VertexColumn::from(&dst[..]), None)?;
//!
//! let TypedEdges::Float32(ref edges) = built.edges else { unreachable!() };
//! let shard = CompressedShard::from_coo(&edges, built.num_vertices(), Orientation::Out)?;
//!
//! let start = built.numbering_map.dense_id(100).unwrap();
//! let result = bfs(&shard.view(), &SingleComms, &[start], &BfsConfig::default())?;
//! assert_eq!(result.distances, vec![0, 1, 2]);
//!
//! // Translate dense ids back
//! assert_eq!(built.numbering_map.original_id(VertexId(2)), Some(300));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Storage**: renumbering, COO → CSR/CSC conversion, partition map, read-only views
//! - **Engine**: degree bucketing, traversal shape, propagation shape
//! - **Comms**: broadcast / all-gather / all-reduce across ranks
//! - **Algorithms**: BFS, `PageRank`, Katz, weakly connected components, core numbers
//!   and k-cores, coarsening
//! - **GPU** (feature `gpu`): wgpu level-synchronous BFS

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithms;
pub mod comms;
pub mod config;
pub mod engine;
pub mod error;
pub mod storage;
pub mod types;

// GPU acceleration (optional)
#[cfg(feature = "gpu")]
pub mod gpu;

// Re-export core types
pub use algorithms::{
    bfs, coarsen_graph, core_number, k_core, katz_centrality, pagerank, pagerank_with,
    weakly_connected_components, BfsResult, CentralityResult, CoarsenedGraph, ComponentsResult,
    CoreNumberResult, Personalization,
};
pub use comms::{Comms, ReduceOp, SingleComms, ThreadComms};
pub use config::{BfsConfig, KatzConfig, PageRankConfig, PropagationConfig};
pub use error::{ConvergenceWarning, GraphError, Result};
pub use storage::{CompressedShard, CooEdges, GraphView, NumberingMap, PartitionMap};
pub use types::{EdgeRef, Orientation, VertexId, Weight, MAX_VERTICES};

#[cfg(feature = "gpu")]
pub use gpu::{gpu_bfs, GpuBfsResult, GpuCsrBuffers, GpuDevice};
