use std::fmt;

use crate::engine::input::{Action, InputSnapshot};

#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    Points = 1,
    #[default]
    Wireframe = 2,
    Faces = 3,
    FacesWireframe = 4,
}

/// One draw call over the whole mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawPass {
    /// Every vertex as a point, flat color.
    Points,
    /// Edge index list as lines, flat color.
    Edges,
    /// Triangle index list, per-vertex colors.
    Faces,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid render mode {0}, expected 1-4")]
pub struct InvalidMode(pub u8);

/// Mode selection rules in priority order. The first held action wins, so
/// the highest-numbered mode takes precedence when several digits are held.
const MODE_RULES: [(Action, RenderMode); 4] = [
    (Action::SelectFacesWireframe, RenderMode::FacesWireframe),
    (Action::SelectFaces, RenderMode::Faces),
    (Action::SelectWireframe, RenderMode::Wireframe),
    (Action::SelectPoints, RenderMode::Points),
];

impl RenderMode {
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Mode for the next frame; unchanged while no digit key is held.
    pub fn next(self, input: &InputSnapshot) -> RenderMode {
        MODE_RULES
            .iter()
            .find(|(action, _)| input.is_held(*action))
            .map_or(self, |&(_, mode)| mode)
    }

    pub fn passes(self) -> &'static [DrawPass] {
        match self {
            RenderMode::Points => &[DrawPass::Points],
            RenderMode::Wireframe => &[DrawPass::Edges],
            RenderMode::Faces => &[DrawPass::Faces],
            RenderMode::FacesWireframe => &[DrawPass::Edges, DrawPass::Faces],
        }
    }

    /// Modes in which the recolor key is active.
    pub fn accepts_recolor(self) -> bool {
        matches!(self, RenderMode::Wireframe | RenderMode::FacesWireframe)
    }
}

impl TryFrom<u8> for RenderMode {
    type Error = InvalidMode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RenderMode::Points),
            2 => Ok(RenderMode::Wireframe),
            3 => Ok(RenderMode::Faces),
            4 => Ok(RenderMode::FacesWireframe),
            other => Err(InvalidMode(other)),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderMode::Points => "points",
            RenderMode::Wireframe => "wireframe",
            RenderMode::Faces => "faces",
            RenderMode::FacesWireframe => "faces+wireframe",
        };
        write!(f, "{} ({})", name, self.number())
    }
}
