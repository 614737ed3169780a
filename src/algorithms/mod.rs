//! Graph algorithms (BFS, `PageRank`, Katz, components, core numbers, coarsening)
//!
//! Thin operators plugged into the frontier/iteration engine; none of them
//! touch neighbor lists directly except for one-off preprocessing.

pub mod bfs;
pub mod coarsen;
pub mod components;
pub mod cores;
pub mod katz;
pub mod pagerank;

pub use bfs::{bfs, BfsResult, NO_PREDECESSOR, UNREACHABLE};
pub use coarsen::{coarsen_graph, CoarsenedGraph};
pub use components::{weakly_connected_components, ComponentsResult};
pub use cores::{core_number, k_core, CoreNumberResult};
pub use katz::katz_centrality;
pub use pagerank::{pagerank, pagerank_with, CentralityResult, Personalization};
