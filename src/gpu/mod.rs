//! GPU acceleration for graph algorithms
//!
//! Based on research from:
//! - **Gunrock** (Wang et al., ACM `ToPC` 2017) - GPU graph traversal primitives
//! - **`cuGraph`** (Bader et al., 2022) - GPU-accelerated graph analytics
//!
//! # Architecture
//!
//! - `device`: wgpu device initialization, buffer creation and readback
//! - `buffer`: upload of a single-rank CSR/CSC shard
//! - `bfs`: level-synchronous BFS kernel (`shaders/bfs_level.wgsl`)
//!
//! # Feature Flag
//!
//! This module is only available with the `gpu` feature flag:
//! ```bash
//! cargo build --features gpu
//! ```

mod bfs;
mod buffer;
mod device;

pub use bfs::{gpu_bfs, GpuBfsResult};
pub use buffer::GpuCsrBuffers;
pub use device::{GpuDevice, GpuDeviceError};
