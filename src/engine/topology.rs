use nalgebra_glm as glm;

/// How face normals are combined for vertices shared by several triangles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum NormalMode {
    /// Sum the unit normals of every adjacent face and renormalize.
    #[default]
    Averaged,
    /// Each face overwrites its vertices; the last face in file order wins.
    LastWins,
}

fn face_normal(positions: &[glm::Vec3], [a, b, c]: [u32; 3]) -> glm::Vec3 {
    let pa = positions[a as usize];
    let pb = positions[b as usize];
    let pc = positions[c as usize];
    normalize_or_zero(glm::cross(&(pb - pa), &(pc - pa)))
}

// Zero-area faces would otherwise normalize to NaN.
fn normalize_or_zero(v: glm::Vec3) -> glm::Vec3 {
    if glm::length(&v) <= f32::EPSILON {
        glm::Vec3::zeros()
    } else {
        glm::normalize(&v)
    }
}

/// Per-vertex normals. Vertices that belong to no triangle keep a zero normal.
///
/// Triangle indices must be in range for `positions`.
pub fn compute_normals(
    positions: &[glm::Vec3],
    triangles: &[[u32; 3]],
    mode: NormalMode,
) -> Vec<glm::Vec3> {
    let mut normals = vec![glm::Vec3::zeros(); positions.len()];

    for &triangle in triangles {
        let normal = face_normal(positions, triangle);
        for index in triangle {
            let slot = &mut normals[index as usize];
            match mode {
                NormalMode::LastWins => *slot = normal,
                NormalMode::Averaged => *slot += normal,
            }
        }
    }

    if mode == NormalMode::Averaged {
        for normal in &mut normals {
            *normal = normalize_or_zero(*normal);
        }
    }

    normals
}

/// Three edges per triangle in winding order. Shared edges are not merged.
pub fn triangles_to_edges(triangles: &[[u32; 3]]) -> Vec<[u32; 2]> {
    let mut edges = Vec::with_capacity(triangles.len() * 3);
    for &[a, b, c] in triangles {
        edges.push([a, b]);
        edges.push([b, c]);
        edges.push([c, a]);
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: &glm::Vec3, b: &glm::Vec3) -> bool {
        (a - b).norm() < 1e-5
    }

    // Two triangles sharing edge 0-1, folded at a right angle, plus a loose vertex.
    fn folded_quad() -> (Vec<glm::Vec3>, Vec<[u32; 3]>) {
        let positions = vec![
            glm::vec3(0.0, 0.0, 0.0),
            glm::vec3(1.0, 0.0, 0.0),
            glm::vec3(0.0, 1.0, 0.0),
            glm::vec3(0.0, 0.0, 1.0),
            glm::vec3(5.0, 5.0, 5.0),
        ];
        let triangles = vec![[0, 1, 2], [0, 3, 1]];
        (positions, triangles)
    }

    #[test]
    fn single_triangle_normal_points_along_z() {
        let positions = vec![
            glm::vec3(0.0, 0.0, 0.0),
            glm::vec3(1.0, 0.0, 0.0),
            glm::vec3(0.0, 1.0, 0.0),
        ];
        for mode in [NormalMode::LastWins, NormalMode::Averaged] {
            let normals = compute_normals(&positions, &[[0, 1, 2]], mode);
            assert_eq!(normals.len(), 3);
            assert!(normals.iter().all(|n| approx(n, &glm::vec3(0.0, 0.0, 1.0))));
        }
    }

    #[test]
    fn last_wins_overwrites_shared_vertices() {
        let (positions, triangles) = folded_quad();
        let normals = compute_normals(&positions, &triangles, NormalMode::LastWins);

        assert!(approx(&normals[0], &glm::vec3(0.0, 1.0, 0.0)));
        assert!(approx(&normals[1], &glm::vec3(0.0, 1.0, 0.0)));
        assert!(approx(&normals[2], &glm::vec3(0.0, 0.0, 1.0)));
        assert!(approx(&normals[3], &glm::vec3(0.0, 1.0, 0.0)));
    }

    #[test]
    fn averaged_blends_shared_vertices() {
        let (positions, triangles) = folded_quad();
        let normals = compute_normals(&positions, &triangles, NormalMode::Averaged);

        let blended = glm::normalize(&glm::vec3(0.0, 1.0, 1.0));
        assert!(approx(&normals[0], &blended));
        assert!(approx(&normals[1], &blended));
        assert!(approx(&normals[2], &glm::vec3(0.0, 0.0, 1.0)));
    }

    #[test]
    fn normals_are_unit_or_zero_for_unreferenced_vertices() {
        let (positions, triangles) = folded_quad();
        for mode in [NormalMode::LastWins, NormalMode::Averaged] {
            let normals = compute_normals(&positions, &triangles, mode);
            assert_eq!(normals.len(), positions.len());
            assert_eq!(normals[4], glm::Vec3::zeros());
            for normal in &normals[..4] {
                assert!((glm::length(normal) - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn degenerate_triangle_yields_zero_normal() {
        let positions = vec![
            glm::vec3(0.0, 0.0, 0.0),
            glm::vec3(1.0, 1.0, 1.0),
            glm::vec3(2.0, 2.0, 2.0),
        ];
        let normals = compute_normals(&positions, &[[0, 1, 2]], NormalMode::LastWins);
        assert!(normals.iter().all(|n| *n == glm::Vec3::zeros()));
    }

    #[test]
    fn edges_follow_winding_without_dedup() {
        let edges = triangles_to_edges(&[[0, 1, 2], [2, 1, 3]]);
        assert_eq!(
            edges,
            vec![[0, 1], [1, 2], [2, 0], [2, 1], [1, 3], [3, 2]]
        );
        assert_eq!(edges.iter().flatten().count(), 6 * 2);
    }

    #[test]
    fn no_triangles_no_edges() {
        assert!(triangles_to_edges(&[]).is_empty());
    }
}
