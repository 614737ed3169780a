//! GPU BFS (Breadth-First Search) implementation
//!
//! Level-synchronous BFS using a WGSL compute shader: one dispatch per level,
//! one invocation per vertex. Based on Gunrock (Wang et al., ACM `ToPC` 2017).

use super::{GpuCsrBuffers, GpuDevice};
use crate::algorithms::{BfsResult, NO_PREDECESSOR, UNREACHABLE};
use crate::error::{GraphError, Result};
use crate::types::VertexId;

const SHADER: &str = include_str!("shaders/bfs_level.wgsl");
const WORKGROUP_SIZE: u32 = 256;

/// BFS parameters for GPU shader
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BfsParams {
    num_vertices: u32,
    current_level: u32,
    _pad0: u32,
    _pad1: u32,
}

impl BfsParams {
    const fn at_level(num_vertices: u32, current_level: u32) -> Self {
        Self {
            num_vertices,
            current_level,
            _pad0: 0,
            _pad1: 0,
        }
    }
}

/// GPU BFS result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuBfsResult {
    /// Distance from source to each vertex (`u32::MAX` for unreachable)
    pub distances: Vec<u32>,

    /// Discovering vertex, `-1` for the source and unreachable vertices
    pub predecessors: Vec<i32>,

    /// Number of vertices visited
    pub visited_count: usize,
}

impl GpuBfsResult {
    /// Get distance to a specific vertex
    #[must_use]
    pub fn distance(&self, vertex: VertexId) -> Option<u32> {
        self.distances
            .get(vertex.0 as usize)
            .copied()
            .filter(|&d| d != UNREACHABLE)
    }

    /// Check if vertex is reachable from source
    #[must_use]
    pub fn is_reachable(&self, vertex: VertexId) -> bool {
        self.distance(vertex).is_some()
    }

    /// Convert into the host-side BFS result type
    #[must_use]
    pub fn into_bfs_result(self) -> BfsResult {
        BfsResult {
            distances: self.distances,
            predecessors: self.predecessors,
        }
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Run GPU BFS from a single source vertex
///
/// Distances match the host [`bfs`](crate::bfs); when several vertices of
/// one level share a neighbor, which of them becomes its predecessor is up to
/// the device scheduler.
///
/// # Errors
///
/// `InvalidCall` if `source` is outside the vertex range;
/// `DeviceError` if result readback fails
///
/// # Example
///
/// ```ignore
/// # use shardgraph::gpu::{GpuDevice, GpuCsrBuffers, gpu_bfs};
/// # use shardgraph::{CompressedShard, CooEdges, Orientation, VertexId};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let device = GpuDevice::new().await?;
/// let coo = CooEdges::<f32>::from_pairs(&[(0, 1), (1, 2)]);
/// let shard = CompressedShard::from_coo(&coo, 3, Orientation::Out)?;
///
/// let buffers = GpuCsrBuffers::from_view(&device, &shard.view())?;
/// let result = gpu_bfs(&device, &buffers, VertexId(0)).await?;
///
/// assert_eq!(result.distance(VertexId(2)), Some(2));
/// # Ok(())
/// # }
/// ```
#[allow(clippy::too_many_lines)]
#[allow(clippy::cast_possible_truncation)] // vertex count < MAX_VERTICES
pub async fn gpu_bfs(
    device: &GpuDevice,
    buffers: &GpuCsrBuffers,
    source: VertexId,
) -> Result<GpuBfsResult> {
    let num_vertices = buffers.num_vertices;
    if source.0 as usize >= num_vertices {
        return Err(GraphError::InvalidCall(format!(
            "source {} out of range for {num_vertices} vertices",
            source.0
        )));
    }

    let shader_module = device
        .device()
        .create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("BFS Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

    let bind_group_layout =
        device
            .device()
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("BFS Bind Group Layout"),
                entries: &[
                    // @binding(0): uniform params
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    storage_entry(1, true),  // offsets
                    storage_entry(2, true),  // indices
                    storage_entry(3, false), // distances (atomic)
                    storage_entry(4, false), // predecessors
                    storage_entry(5, false), // updated flag (atomic)
                ],
            });

    let pipeline_layout = device
        .device()
        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("BFS Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

    let compute_pipeline =
        device
            .device()
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("BFS Pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader_module,
                entry_point: "bfs_level",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });

    let n32 = num_vertices as u32;
    let params_buffer = device.create_buffer_init(
        "BFS Params",
        bytemuck::bytes_of(&BfsParams::at_level(n32, 0)),
        wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    );

    let mut initial_distances = vec![UNREACHABLE; num_vertices];
    initial_distances[source.0 as usize] = 0;
    let distances_buffer = device.create_buffer_init(
        "BFS Distances",
        bytemuck::cast_slice(&initial_distances),
        wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
    );

    let initial_predecessors = vec![NO_PREDECESSOR; num_vertices];
    let predecessors_buffer = device.create_buffer_init(
        "BFS Predecessors",
        bytemuck::cast_slice(&initial_predecessors),
        wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
    );

    let updated_buffer = device.create_buffer_init(
        "BFS Updated Flag",
        bytemuck::bytes_of(&0u32),
        wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
    );

    let bind_group = device
        .device()
        .create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("BFS Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.offsets.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.indices.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: distances_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: predecessors_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: updated_buffer.as_entire_binding(),
                },
            ],
        });

    let num_workgroups = n32.div_ceil(WORKGROUP_SIZE).max(1);
    let mut levels = 0;
    for level in 0..n32 {
        device
            .queue()
            .write_buffer(&updated_buffer, 0, bytemuck::bytes_of(&0u32));
        device.queue().write_buffer(
            &params_buffer,
            0,
            bytemuck::bytes_of(&BfsParams::at_level(n32, level)),
        );

        let mut encoder = device
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("BFS Command Encoder"),
            });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("BFS Compute Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&compute_pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(num_workgroups, 1, 1);
        }
        device.queue().submit(Some(encoder.finish()));
        device.device().poll(wgpu::Maintain::Wait);

        let updated: Vec<u32> = device.read_buffer(&updated_buffer, 1).await?;
        if updated.first().copied().unwrap_or(0) == 0 {
            break;
        }
        levels = level + 1;
    }

    let distances: Vec<u32> = device.read_buffer(&distances_buffer, num_vertices).await?;
    let predecessors: Vec<i32> = device.read_buffer(&predecessors_buffer, num_vertices).await?;
    let visited_count = distances.iter().filter(|&&d| d != UNREACHABLE).count();

    tracing::info!(source = source.0, levels, visited_count, "GPU BFS finished");
    Ok(GpuBfsResult {
        distances,
        predecessors,
        visited_count,
    })
}
