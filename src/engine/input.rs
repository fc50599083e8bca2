use std::collections::HashSet;

use winit::event::{ElementState, VirtualKeyCode};

#[derive(Clone, Debug)]
pub enum InputEvent {
    KeyPressed(VirtualKeyCode),
    KeyReleased(VirtualKeyCode),
}

#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug)]
pub enum Action {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    MoveFront,
    MoveBack,
    SelectPoints,
    SelectWireframe,
    SelectFaces,
    SelectFacesWireframe,
    RegenerateColor,
    ShutDown,
}

impl Action {
    pub fn from_key_code(keycode: VirtualKeyCode) -> Option<Self> {
        match keycode {
            VirtualKeyCode::L => Some(Action::MoveLeft),
            VirtualKeyCode::R => Some(Action::MoveRight),
            VirtualKeyCode::U => Some(Action::MoveUp),
            VirtualKeyCode::D => Some(Action::MoveDown),
            VirtualKeyCode::F => Some(Action::MoveFront),
            VirtualKeyCode::B => Some(Action::MoveBack),
            VirtualKeyCode::Key1 | VirtualKeyCode::Numpad1 => Some(Action::SelectPoints),
            VirtualKeyCode::Key2 | VirtualKeyCode::Numpad2 => Some(Action::SelectWireframe),
            VirtualKeyCode::Key3 | VirtualKeyCode::Numpad3 => Some(Action::SelectFaces),
            VirtualKeyCode::Key4 | VirtualKeyCode::Numpad4 => Some(Action::SelectFacesWireframe),
            VirtualKeyCode::C => Some(Action::RegenerateColor),
            VirtualKeyCode::Escape => Some(Action::ShutDown),

            _ => None,
        }
    }
}

impl InputEvent {
    pub fn from_event_state(state: ElementState, keycode: VirtualKeyCode) -> Self {
        match state {
            ElementState::Pressed => InputEvent::KeyPressed(keycode),
            ElementState::Released => InputEvent::KeyReleased(keycode),
        }
    }
}

/// Held actions and the caps-lock flag as seen at the start of a frame.
#[derive(Clone, Debug, Default)]
pub struct InputSnapshot {
    actions: HashSet<Action>,
    caps_lock: bool,
}

impl InputSnapshot {
    #[cfg(test)]
    pub fn new(actions: impl IntoIterator<Item = Action>, caps_lock: bool) -> Self {
        InputSnapshot {
            actions: actions.into_iter().collect(),
            caps_lock,
        }
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    pub fn caps_lock(&self) -> bool {
        self.caps_lock
    }
}

/// Collects window key events between frames.
///
/// winit does not report lock-key state, so caps lock is toggled on every
/// fresh Caps Lock press and assumed off at startup.
#[derive(Default)]
pub struct InputManager {
    actions: HashSet<Action>,
    caps_lock: bool,
    caps_lock_down: bool,
}

impl InputManager {
    pub fn new() -> Self {
        InputManager::default()
    }

    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            actions: self.actions.clone(),
            caps_lock: self.caps_lock,
        }
    }

    /// Forgets held keys, whose release events go to another window once
    /// focus is lost. The caps-lock flag is kept.
    pub fn release_all(&mut self) {
        self.actions.clear();
        self.caps_lock_down = false;
    }

    pub fn on_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyReleased(VirtualKeyCode::Capital) => {
                self.caps_lock_down = false;
            }

            InputEvent::KeyPressed(VirtualKeyCode::Capital) => {
                // Auto-repeat must not flip the lock back and forth.
                if !self.caps_lock_down {
                    self.caps_lock = !self.caps_lock;
                    tracing::debug!(caps_lock = self.caps_lock, "caps lock toggled");
                }
                self.caps_lock_down = true;
            }

            InputEvent::KeyReleased(keycode) => {
                if let Some(action) = Action::from_key_code(keycode) {
                    self.actions.remove(&action);
                }
            }

            InputEvent::KeyPressed(keycode) => {
                if let Some(action) = Action::from_key_code(keycode) {
                    self.actions.insert(action);
                }
            }
        }
    }
}
