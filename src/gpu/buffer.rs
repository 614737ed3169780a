//! GPU buffer management for CSR shards
//!
//! Uploads a [`GraphView`]'s offsets and indices to device storage buffers.
//! Offsets are narrowed to `u32` since WGSL has no 64-bit integers. The BFS
//! kernel ignores edge weights, so they stay on the host.

use super::GpuDevice;
use crate::error::{GraphError, Result};
use crate::storage::GraphView;
use crate::types::{Orientation, Weight};

/// GPU buffers for one CSR/CSC shard
///
/// Manages GPU-side storage of:
/// - Row offsets (`num_vertices + 1` entries)
/// - Neighbor indices (`num_edges` entries)
#[derive(Debug)]
pub struct GpuCsrBuffers {
    /// Number of vertices in the graph
    pub num_vertices: usize,

    /// Number of edges in the graph
    pub num_edges: usize,

    /// Orientation of the uploaded neighbor lists
    pub orientation: Orientation,

    /// GPU buffer for row offsets
    pub offsets: wgpu::Buffer,

    /// GPU buffer for neighbor indices
    pub indices: wgpu::Buffer,
}

impl GpuCsrBuffers {
    /// Upload a complete (single-rank) view to the device
    ///
    /// # Errors
    ///
    /// `InvalidCall` if the view is one shard of a multi-rank partition;
    /// `Overflow` if the edge count does not fit 32-bit offsets
    pub fn from_view<W: Weight>(device: &GpuDevice, view: &GraphView<'_, W>) -> Result<Self> {
        if view.num_local_vertices() != view.num_vertices() {
            return Err(GraphError::InvalidCall(format!(
                "GPU upload needs the whole graph on one device, shard owns {} of {} vertices",
                view.num_local_vertices(),
                view.num_vertices()
            )));
        }

        let offsets: Vec<u32> = view
            .offsets()
            .iter()
            .map(|&o| {
                u32::try_from(o).map_err(|_| GraphError::Overflow {
                    count: view.num_edges(),
                    limit: u32::MAX as usize,
                })
            })
            .collect::<Result<_>>()?;

        let storage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST;
        let offsets = device.create_buffer_init("CSR offsets", bytemuck::cast_slice(&offsets), storage);

        // Zero-sized storage bindings are rejected, keep one padding slot
        let indices = if view.indices().is_empty() {
            device.create_buffer_init("CSR indices", bytemuck::cast_slice(&[0_u32]), storage)
        } else {
            device.create_buffer_init("CSR indices", bytemuck::cast_slice(view.indices()), storage)
        };

        tracing::debug!(
            vertices = view.num_vertices(),
            edges = view.num_edges(),
            "CSR shard uploaded"
        );
        Ok(Self {
            num_vertices: view.num_vertices(),
            num_edges: view.num_edges(),
            orientation: view.orientation(),
            offsets,
            indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CompressedShard, CooEdges};

    #[tokio::test]
    async fn test_upload_weighted_shard() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_upload_weighted_shard: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let coo = CooEdges::new(vec![0, 0, 1], vec![1, 2, 2], Some(vec![1.0_f64, 2.0, 3.0])).unwrap();
        let shard = CompressedShard::from_coo(&coo, 3, Orientation::Out).unwrap();
        let buffers = GpuCsrBuffers::from_view(&device, &shard.view()).unwrap();

        assert_eq!(buffers.num_vertices, 3);
        assert_eq!(buffers.num_edges, 3);

        let offsets: Vec<u32> = device.read_buffer(&buffers.offsets, 4).await.unwrap();
        assert_eq!(offsets, vec![0, 2, 3, 3]);
        let indices: Vec<u32> = device.read_buffer(&buffers.indices, 3).await.unwrap();
        assert_eq!(indices, vec![1, 2, 2]);
    }

    #[tokio::test]
    async fn test_upload_rejects_partial_shard() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_upload_rejects_partial_shard: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let coo = CooEdges::<f32>::from_pairs(&[(0, 1), (1, 2), (2, 3)]);
        let shards = CompressedShard::build_partitioned(&coo, 4, 2, Orientation::Out).unwrap();
        let err = GpuCsrBuffers::from_view(&device, &shards[0].view()).unwrap_err();
        assert!(matches!(err, GraphError::InvalidCall(_)));
    }
}
