pub mod color;
pub mod input;
pub mod mesh;
pub mod mode;
pub mod obj;
pub mod topology;
pub mod transform;

pub use color::ColorGenerator;
pub use input::{Action, InputEvent, InputManager, InputSnapshot};
pub use mesh::{Color, Mesh};
pub use mode::{DrawPass, RenderMode};
pub use topology::NormalMode;
pub use transform::ModelTransform;

/// What the renderer has to act on after a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameUpdate {
    pub quit: bool,
    pub flat_color_changed: bool,
}

/// Everything that changes between frames, apart from GPU resources.
pub struct Engine {
    pub mesh: Mesh,
    pub vertex_colors: Vec<Color>,
    pub flat_color: Color,
    pub mode: RenderMode,
    pub transform: ModelTransform,
    colors: ColorGenerator,
}

impl Engine {
    pub fn new(
        mesh: Mesh,
        mode: RenderMode,
        mut colors: ColorGenerator,
        transform: ModelTransform,
    ) -> Self {
        let vertex_colors = colors.vertex_colors(mesh.vertex_count());

        Engine {
            mesh,
            vertex_colors,
            flat_color: color::DEFAULT_FLAT_COLOR,
            mode,
            transform,
            colors,
        }
    }

    pub fn tick(&mut self, input: &InputSnapshot) -> FrameUpdate {
        if input.is_held(Action::ShutDown) {
            tracing::info!("Shutting down viewer...");
            return FrameUpdate {
                quit: true,
                ..Default::default()
            };
        }

        self.transform.tick(input);

        let mode = self.mode.next(input);
        if mode != self.mode {
            tracing::debug!(from = %self.mode, to = %mode, "render mode changed");
            self.mode = mode;
        }

        let mut update = FrameUpdate::default();
        if input.is_held(Action::RegenerateColor) && self.mode.accepts_recolor() {
            self.flat_color = self.colors.random_color();
            tracing::debug!(color = ?self.flat_color.color, "flat color regenerated");
            update.flat_color_changed = true;
        }

        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_glm as glm;

    fn engine() -> Engine {
        let mesh = Mesh::new(
            vec![
                glm::vec3(0.0, 0.0, 0.0),
                glm::vec3(1.0, 0.0, 0.0),
                glm::vec3(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
            NormalMode::Averaged,
        )
        .unwrap();

        Engine::new(
            mesh,
            RenderMode::default(),
            ColorGenerator::seeded(3),
            ModelTransform::with_model(glm::Mat4::identity(), 4.0 / 3.0),
        )
    }

    fn holding(actions: &[Action]) -> InputSnapshot {
        InputSnapshot::new(actions.iter().copied(), false)
    }

    #[test]
    fn starts_with_default_colors() {
        let engine = engine();
        assert_eq!(engine.mode, RenderMode::Wireframe);
        assert_eq!(engine.vertex_colors.len(), 3);
        assert_eq!(engine.flat_color, color::DEFAULT_FLAT_COLOR);
    }

    #[test]
    fn idle_frame_changes_nothing() {
        let mut engine = engine();
        let before = engine.transform.model_matrix_raw();

        assert_eq!(engine.tick(&InputSnapshot::default()), FrameUpdate::default());
        assert_eq!(engine.mode, RenderMode::Wireframe);
        assert_eq!(engine.transform.model_matrix_raw(), before);
    }

    #[test]
    fn escape_requests_quit() {
        let mut engine = engine();
        assert!(engine.tick(&holding(&[Action::ShutDown])).quit);
    }

    #[test]
    fn recolor_in_wireframe_mode() {
        let mut engine = engine();
        let update = engine.tick(&holding(&[Action::RegenerateColor]));

        assert!(update.flat_color_changed);
        assert_ne!(engine.flat_color, color::DEFAULT_FLAT_COLOR);
    }

    #[test]
    fn recolor_ignored_in_face_mode() {
        let mut engine = engine();
        let update = engine.tick(&holding(&[Action::SelectFaces, Action::RegenerateColor]));

        assert_eq!(engine.mode, RenderMode::Faces);
        assert!(!update.flat_color_changed);
        assert_eq!(engine.flat_color, color::DEFAULT_FLAT_COLOR);
    }

    #[test]
    fn recolor_uses_mode_selected_this_frame() {
        let mut engine = engine();
        engine.tick(&holding(&[Action::SelectPoints]));
        assert_eq!(engine.mode, RenderMode::Points);

        let update = engine.tick(&holding(&[
            Action::SelectFacesWireframe,
            Action::RegenerateColor,
        ]));
        assert_eq!(engine.mode, RenderMode::FacesWireframe);
        assert!(update.flat_color_changed);
    }

    #[test]
    fn motion_and_mode_apply_in_same_frame() {
        let mut engine = engine();
        engine.tick(&holding(&[Action::MoveRight, Action::SelectFaces]));

        assert_eq!(engine.mode, RenderMode::Faces);
        assert!((engine.transform.model()[(0, 3)] - 0.01).abs() < 1e-6);
    }
}
