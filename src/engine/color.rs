use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::mesh::Color;

/// Flat color used for points and wireframe until it is first regenerated.
pub const DEFAULT_FLAT_COLOR: Color = Color::new(1.0, 0.5, 0.2);

pub struct ColorGenerator {
    rng: StdRng,
}

impl Default for ColorGenerator {
    fn default() -> Self {
        ColorGenerator::new()
    }
}

impl ColorGenerator {
    pub fn new() -> Self {
        ColorGenerator {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        ColorGenerator {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Each channel is sampled independently from [0, 1).
    pub fn random_color(&mut self) -> Color {
        Color::new(self.rng.random(), self.rng.random(), self.rng.random())
    }

    pub fn vertex_colors(&mut self, vertex_count: usize) -> Vec<Color> {
        (0..vertex_count).map(|_| self.random_color()).collect()
    }
}

/// The same color for every vertex.
pub fn broadcast(color: Color, vertex_count: usize) -> Vec<Color> {
    vec![color; vertex_count]
}
