use bytemuck::{Pod, Zeroable};
use nalgebra_glm as glm;

use crate::engine::obj::ObjData;
use crate::engine::topology::{self, NormalMode};

/// Vertex position as uploaded to the GPU. The field name must match the
/// `position` input of the vertex shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct Position {
    pub position: [f32; 3],
}

/// Per-vertex RGB color, matched to the `color` shader input.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct Color {
    pub color: [f32; 3],
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Color { color: [r, g, b] }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("mesh has no vertices")]
    NoVertices,

    #[error("triangle {triangle} references vertex {index} of {vertex_count}")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },
}

/// Triangle mesh with its derived topology. Immutable once built.
#[derive(Clone, Debug)]
pub struct Mesh {
    positions: Vec<glm::Vec3>,
    triangles: Vec<[u32; 3]>,
    normals: Vec<glm::Vec3>,
    edges: Vec<[u32; 2]>,
}

impl Mesh {
    pub fn new(
        positions: Vec<glm::Vec3>,
        triangles: Vec<[u32; 3]>,
        normal_mode: NormalMode,
    ) -> Result<Self, MeshError> {
        if positions.is_empty() {
            return Err(MeshError::NoVertices);
        }

        let vertex_count = positions.len();
        for (triangle, indices) in triangles.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshError::IndexOutOfRange {
                    triangle,
                    index,
                    vertex_count,
                });
            }
        }

        let normals = topology::compute_normals(&positions, &triangles, normal_mode);
        let edges = topology::triangles_to_edges(&triangles);

        Ok(Mesh {
            positions,
            triangles,
            normals,
            edges,
        })
    }

    pub fn from_obj(obj: ObjData, normal_mode: NormalMode) -> Result<Self, MeshError> {
        Mesh::new(obj.vertices, obj.triangles, normal_mode)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn normals(&self) -> &[glm::Vec3] {
        &self.normals
    }

    pub fn edges(&self) -> &[[u32; 2]] {
        &self.edges
    }

    pub fn gpu_positions(&self) -> impl ExactSizeIterator<Item = Position> + '_ {
        self.positions.iter().map(|p| Position {
            position: [p.x, p.y, p.z],
        })
    }

    /// Flat triangle index list, three entries per face.
    pub fn triangle_indices(&self) -> Vec<u32> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Flat line index list, two entries per edge (six per face).
    pub fn edge_indices(&self) -> Vec<u32> {
        self.edges.iter().flatten().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Vec<glm::Vec3> {
        vec![
            glm::vec3(0.0, 0.0, 0.0),
            glm::vec3(1.0, 0.0, 0.0),
            glm::vec3(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn builds_topology_for_single_triangle() {
        let mesh = Mesh::new(unit_triangle(), vec![[0, 1, 2]], NormalMode::LastWins).unwrap();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.edges(), &[[0, 1], [1, 2], [2, 0]]);
        for normal in mesh.normals() {
            assert!((normal - glm::vec3(0.0, 0.0, 1.0)).norm() < 1e-6);
        }
    }

    #[test]
    fn flat_index_lists_have_expected_lengths() {
        let mut positions = unit_triangle();
        positions.push(glm::vec3(1.0, 1.0, 0.0));
        let mesh = Mesh::new(positions, vec![[0, 1, 2], [1, 3, 2]], NormalMode::Averaged).unwrap();

        assert_eq!(mesh.triangle_indices(), vec![0, 1, 2, 1, 3, 2]);
        assert_eq!(mesh.edge_indices().len(), 6 * mesh.triangle_count());
        assert_eq!(mesh.gpu_positions().len(), 4);
    }

    #[test]
    fn rejects_empty_mesh() {
        let err = Mesh::new(Vec::new(), Vec::new(), NormalMode::Averaged).unwrap_err();
        assert!(matches!(err, MeshError::NoVertices));
    }

    #[test]
    fn rejects_out_of_range_index() {
        let err = Mesh::new(unit_triangle(), vec![[0, 1, 2], [0, 1, 3]], NormalMode::Averaged)
            .unwrap_err();

        match err {
            MeshError::IndexOutOfRange {
                triangle,
                index,
                vertex_count,
            } => {
                assert_eq!(triangle, 1);
                assert_eq!(index, 3);
                assert_eq!(vertex_count, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn vertices_without_faces_are_allowed() {
        let mesh = Mesh::new(unit_triangle(), Vec::new(), NormalMode::Averaged).unwrap();
        assert!(mesh.triangle_indices().is_empty());
        assert!(mesh.edge_indices().is_empty());
        assert!(mesh.normals().iter().all(|n| *n == glm::Vec3::zeros()));
    }
}
