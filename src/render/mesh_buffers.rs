use std::sync::Arc;

use color_eyre::eyre::Result;
use vulkano::buffer::{BufferUsage, CpuAccessibleBuffer, TypedBufferAccess};
use vulkano::memory::allocator::StandardMemoryAllocator;

use crate::engine::color;
use crate::engine::mesh::{Color, Mesh, Position};

/// GPU copies of one mesh. Index buffers are absent when the mesh has no
/// faces, since Vulkan rejects zero-sized buffers.
pub struct MeshBuffers {
    pub positions: Arc<CpuAccessibleBuffer<[Position]>>,
    pub vertex_colors: Arc<CpuAccessibleBuffer<[Color]>>,
    pub flat_colors: Arc<CpuAccessibleBuffer<[Color]>>,
    pub triangles: Option<Arc<CpuAccessibleBuffer<[u32]>>>,
    pub edges: Option<Arc<CpuAccessibleBuffer<[u32]>>>,
    vertex_count: usize,
}

fn index_buffer(
    memory_allocator: &StandardMemoryAllocator,
    indices: Vec<u32>,
) -> Result<Option<Arc<CpuAccessibleBuffer<[u32]>>>> {
    if indices.is_empty() {
        return Ok(None);
    }

    let buffer = CpuAccessibleBuffer::from_iter(
        memory_allocator,
        BufferUsage {
            index_buffer: true,
            ..BufferUsage::empty()
        },
        false,
        indices,
    )?;
    Ok(Some(buffer))
}

fn color_buffer(
    memory_allocator: &StandardMemoryAllocator,
    colors: Vec<Color>,
) -> Result<Arc<CpuAccessibleBuffer<[Color]>>> {
    let buffer = CpuAccessibleBuffer::from_iter(
        memory_allocator,
        BufferUsage {
            vertex_buffer: true,
            ..BufferUsage::empty()
        },
        false,
        colors,
    )?;
    Ok(buffer)
}

impl MeshBuffers {
    pub fn new(
        mesh: &Mesh,
        vertex_colors: &[Color],
        flat_color: Color,
        memory_allocator: &StandardMemoryAllocator,
    ) -> Result<Self> {
        let positions = CpuAccessibleBuffer::from_iter(
            memory_allocator,
            BufferUsage {
                vertex_buffer: true,
                ..BufferUsage::empty()
            },
            false,
            mesh.gpu_positions(),
        )?;

        let vertex_count = mesh.vertex_count();
        let vertex_colors = color_buffer(memory_allocator, vertex_colors.to_vec())?;
        let flat_colors =
            color_buffer(memory_allocator, color::broadcast(flat_color, vertex_count))?;
        let triangles = index_buffer(memory_allocator, mesh.triangle_indices())?;
        let edges = index_buffer(memory_allocator, mesh.edge_indices())?;

        tracing::debug!(
            vertices = vertex_count,
            triangle_indices = triangles.as_ref().map_or(0, |b| b.len()),
            edge_indices = edges.as_ref().map_or(0, |b| b.len()),
            "mesh buffers uploaded"
        );

        Ok(MeshBuffers {
            positions,
            vertex_colors,
            flat_colors,
            triangles,
            edges,
            vertex_count,
        })
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count as u32
    }

    // A fresh buffer instead of a write, so frames still in flight keep
    // reading the old color.
    pub fn set_flat_color(
        &mut self,
        flat_color: Color,
        memory_allocator: &StandardMemoryAllocator,
    ) -> Result<()> {
        self.flat_colors = color_buffer(
            memory_allocator,
            color::broadcast(flat_color, self.vertex_count),
        )?;
        Ok(())
    }
}
