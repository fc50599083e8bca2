use crate::engine::input::{Action, InputSnapshot};
use nalgebra_glm as glm;

pub const TRANSLATE_STEP: f32 = 0.01;
pub const ROTATE_STEP_DEGREES: f32 = 3.0;

const FOV_DEGREES: f32 = 45.0;
const NEAR: f32 = 0.1;
const FAR: f32 = 100.0;
const INITIAL_TILT_DEGREES: f32 = 75.0;
const CAMERA_DISTANCE: f32 = 3.0;

/// A per-frame increment applied in the model's local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Motion {
    /// Offset in units.
    Translate([f32; 3]),
    /// Rotation by [`ROTATE_STEP_DEGREES`] around this axis.
    Rotate([f32; 3]),
}

struct MotionRule {
    action: Action,
    caps_lock: bool,
    motion: Motion,
}

const fn translate(action: Action, offset: [f32; 3]) -> MotionRule {
    MotionRule {
        action,
        caps_lock: false,
        motion: Motion::Translate(offset),
    }
}

const fn rotate(action: Action, axis: [f32; 3]) -> MotionRule {
    MotionRule {
        action,
        caps_lock: true,
        motion: Motion::Rotate(axis),
    }
}

// Checked top to bottom; only the first match fires in a frame.
const MOTION_RULES: [MotionRule; 12] = [
    translate(Action::MoveLeft, [-TRANSLATE_STEP, 0.0, 0.0]),
    translate(Action::MoveRight, [TRANSLATE_STEP, 0.0, 0.0]),
    translate(Action::MoveUp, [0.0, TRANSLATE_STEP, 0.0]),
    translate(Action::MoveDown, [0.0, -TRANSLATE_STEP, 0.0]),
    translate(Action::MoveFront, [0.0, 0.0, TRANSLATE_STEP]),
    translate(Action::MoveBack, [0.0, 0.0, -TRANSLATE_STEP]),
    rotate(Action::MoveLeft, [1.0, 0.0, 0.0]),
    rotate(Action::MoveRight, [-1.0, 0.0, 0.0]),
    rotate(Action::MoveUp, [0.0, 1.0, 0.0]),
    rotate(Action::MoveDown, [0.0, -1.0, 0.0]),
    rotate(Action::MoveFront, [0.0, 0.0, 1.0]),
    rotate(Action::MoveBack, [0.0, 0.0, -1.0]),
];

/// The single motion to apply this frame, if any directional key is held.
pub fn select_motion(input: &InputSnapshot) -> Option<Motion> {
    MOTION_RULES
        .iter()
        .find(|rule| rule.caps_lock == input.caps_lock() && input.is_held(rule.action))
        .map(|rule| rule.motion)
}

/// Model matrix driven by the keyboard, with a fixed camera.
pub struct ModelTransform {
    model: glm::Mat4,
    view: glm::Mat4,
    proj: glm::Mat4,
}

impl ModelTransform {
    pub fn new(aspect_ratio: f32) -> Self {
        let model = glm::rotate(
            &glm::Mat4::identity(),
            INITIAL_TILT_DEGREES.to_radians(),
            &glm::vec3(1.0, 1.0, 1.0),
        );
        Self::with_model(model, aspect_ratio)
    }

    pub fn with_model(model: glm::Mat4, aspect_ratio: f32) -> Self {
        let view = glm::translation(&glm::vec3(0.0, 0.0, -CAMERA_DISTANCE));

        // Vulkan clip space: depth in 0..1 and Y pointing down.
        let mut proj = glm::perspective_rh_zo(aspect_ratio, FOV_DEGREES.to_radians(), NEAR, FAR);
        proj[(1, 1)] *= -1.0;

        Self { model, view, proj }
    }

    pub fn model(&self) -> &glm::Mat4 {
        &self.model
    }

    pub fn translate(&mut self, offset: &glm::Vec3) {
        self.model = glm::translate(&self.model, offset);
    }

    pub fn rotate(&mut self, angle: f32, axis: &glm::Vec3) {
        self.model = glm::rotate(&self.model, angle, axis);
    }

    pub fn apply(&mut self, motion: Motion) {
        match motion {
            Motion::Translate(offset) => self.translate(&glm::Vec3::from(offset)),
            Motion::Rotate(axis) => {
                self.rotate(ROTATE_STEP_DEGREES.to_radians(), &glm::Vec3::from(axis))
            }
        }
    }

    pub fn tick(&mut self, input: &InputSnapshot) {
        if let Some(motion) = select_motion(input) {
            self.apply(motion);
        }
    }
}

impl ModelTransform {
    pub fn model_matrix_raw(&self) -> [[f32; 4]; 4] {
        self.model.into()
    }

    pub fn view_matrix_raw(&self) -> [[f32; 4]; 4] {
        self.view.into()
    }

    pub fn projection_matrix_raw(&self) -> [[f32; 4]; 4] {
        self.proj.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ModelTransform {
        ModelTransform::with_model(glm::Mat4::identity(), 800.0 / 600.0)
    }

    fn input(actions: &[Action], caps_lock: bool) -> InputSnapshot {
        InputSnapshot::new(actions.iter().copied(), caps_lock)
    }

    fn translation_of(transform: &ModelTransform) -> glm::Vec3 {
        let model = transform.model();
        glm::vec3(model[(0, 3)], model[(1, 3)], model[(2, 3)])
    }

    fn approx_mat(a: &glm::Mat4, b: &glm::Mat4) -> bool {
        (a - b).norm() < 1e-5
    }

    #[test]
    fn each_key_translates_along_one_axis() {
        let cases = [
            (Action::MoveLeft, glm::vec3(-0.01, 0.0, 0.0)),
            (Action::MoveRight, glm::vec3(0.01, 0.0, 0.0)),
            (Action::MoveUp, glm::vec3(0.0, 0.01, 0.0)),
            (Action::MoveDown, glm::vec3(0.0, -0.01, 0.0)),
            (Action::MoveFront, glm::vec3(0.0, 0.0, 0.01)),
            (Action::MoveBack, glm::vec3(0.0, 0.0, -0.01)),
        ];

        for (action, expected) in cases {
            let mut transform = identity();
            transform.tick(&input(&[action], false));
            assert!((translation_of(&transform) - expected).norm() < 1e-6, "{action:?}");
        }
    }

    #[test]
    fn translation_accumulates_per_frame() {
        let mut transform = identity();
        let held = input(&[Action::MoveRight], false);
        for _ in 0..10 {
            transform.tick(&held);
        }
        assert!((translation_of(&transform) - glm::vec3(0.1, 0.0, 0.0)).norm() < 1e-5);
    }

    #[test]
    fn caps_lock_rotates_instead() {
        let mut transform = identity();
        transform.tick(&input(&[Action::MoveUp], true));

        let expected = glm::rotation(3.0_f32.to_radians(), &glm::vec3(0.0, 1.0, 0.0));
        assert!(approx_mat(transform.model(), &expected));
        assert_eq!(translation_of(&transform), glm::Vec3::zeros());
    }

    #[test]
    fn mirrored_keys_rotate_in_opposite_directions() {
        let mut transform = identity();
        transform.tick(&input(&[Action::MoveFront], true));
        transform.tick(&input(&[Action::MoveBack], true));
        assert!(approx_mat(transform.model(), &glm::Mat4::identity()));
    }

    #[test]
    fn only_first_rule_fires() {
        assert_eq!(
            select_motion(&input(&[Action::MoveBack, Action::MoveUp, Action::MoveLeft], false)),
            Some(Motion::Translate([-TRANSLATE_STEP, 0.0, 0.0]))
        );
        assert_eq!(
            select_motion(&input(&[Action::MoveFront, Action::MoveDown], true)),
            Some(Motion::Rotate([0.0, -1.0, 0.0]))
        );
    }

    #[test]
    fn no_directional_key_no_motion() {
        assert_eq!(select_motion(&input(&[Action::SelectFaces], false)), None);

        let mut transform = identity();
        transform.tick(&input(&[], true));
        assert!(approx_mat(transform.model(), &glm::Mat4::identity()));
    }

    #[test]
    fn camera_looks_down_negative_z() {
        let transform = identity();
        let view: glm::Mat4 = transform.view_matrix_raw().into();
        let origin = view * glm::vec4(0.0, 0.0, 0.0, 1.0);
        assert!((origin.xyz() - glm::vec3(0.0, 0.0, -3.0)).norm() < 1e-6);

        let proj: glm::Mat4 = transform.projection_matrix_raw().into();
        let clip = proj * origin;
        let depth = clip.z / clip.w;
        assert!((0.0..=1.0).contains(&depth));
    }
}
