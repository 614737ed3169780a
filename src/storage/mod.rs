//! Graph storage layer
//!
//! Renumbering, COO edge lists, COO → CSR/CSC conversion, partition
//! metadata, and the read-only [`GraphView`].

pub mod columns;
pub mod coo;
pub mod csr;
pub mod partition;
pub mod renumber;
pub mod view;

#[cfg(feature = "arrow")]
pub use columns::build_edge_list_from_arrow;
pub use columns::{build_edge_list, EdgeListBuild, TypedEdges, WeightColumn};
pub use coo::CooEdges;
pub use csr::{degree_counts, CompressedShard};
pub use partition::PartitionMap;
pub use renumber::{renumber, NumberingMap, Renumbered, VertexColumn};
pub use view::GraphView;
