use std::collections::HashSet;

use winit::{
    event::{DeviceEvent, ElementState, KeyEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use super::fps_camera::FpsCamera;

/// Gameplay actions a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Forward,
    Backward,
    Left,
    Right,
    Sprint,
    Jump,
    Use,
    Reload,
}

/// Physical key assigned to each [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub forward: KeyCode,
    pub backward: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub sprint: KeyCode,
    pub jump: KeyCode,
    pub use_item: KeyCode,
    pub reload: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyH,
            backward: KeyCode::KeyB,
            left: KeyCode::KeyV,
            right: KeyCode::KeyN,
            sprint: KeyCode::KeyG,
            jump: KeyCode::Space,
            use_item: KeyCode::KeyU,
            reload: KeyCode::KeyI,
        }
    }
}

impl KeyBindings {
    pub fn key_for(&self, action: Action) -> KeyCode {
        match action {
            Action::Forward => self.forward,
            Action::Backward => self.backward,
            Action::Left => self.left,
            Action::Right => self.right,
            Action::Sprint => self.sprint,
            Action::Jump => self.jump,
            Action::Use => self.use_item,
            Action::Reload => self.reload,
        }
    }
}

/// Snapshot of which keys are currently held.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    pressed: HashSet<KeyCode>,
    bindings: KeyBindings,
}

impl KeyboardState {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            pressed: HashSet::new(),
            bindings,
        }
    }

    pub fn set(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => self.press(key),
            ElementState::Released => self.release(key),
        }
    }

    pub fn press(&mut self, key: KeyCode) {
        self.pressed.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.pressed.remove(&key);
    }

    /// Forgets every held key, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.pressed.clear();
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    pub fn is_down(&self, action: Action) -> bool {
        self.is_key_down(self.bindings.key_for(action))
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }
}

/// Feeds window and device input into the keyboard snapshot and the camera.
#[derive(Debug, Default)]
pub struct CameraController {
    pub keyboard: KeyboardState,
}

impl CameraController {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            keyboard: KeyboardState::new(bindings),
        }
    }

    /// Records a key transition. Auto-repeat events carry no new state.
    pub fn process_key(&mut self, event: &KeyEvent) {
        if event.repeat {
            return;
        }
        if let PhysicalKey::Code(code) = event.physical_key {
            self.keyboard.set(code, event.state);
        }
    }

    /// Applies raw mouse motion to the camera orientation.
    pub fn process_device_event(&self, event: &DeviceEvent, camera: &mut FpsCamera) {
        if let DeviceEvent::MouseMotion { delta } = event {
            camera.rotate(delta.0 as f32, delta.1 as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.key_for(Action::Forward), KeyCode::KeyH);
        assert_eq!(bindings.key_for(Action::Backward), KeyCode::KeyB);
        assert_eq!(bindings.key_for(Action::Left), KeyCode::KeyV);
        assert_eq!(bindings.key_for(Action::Right), KeyCode::KeyN);
        assert_eq!(bindings.key_for(Action::Sprint), KeyCode::KeyG);
        assert_eq!(bindings.key_for(Action::Jump), KeyCode::Space);
        assert_eq!(bindings.key_for(Action::Use), KeyCode::KeyU);
        assert_eq!(bindings.key_for(Action::Reload), KeyCode::KeyI);
    }

    #[test]
    fn test_keyboard_state_tracks_actions() {
        let mut keys = KeyboardState::default();
        assert!(!keys.is_down(Action::Jump));

        keys.set(KeyCode::Space, ElementState::Pressed);
        assert!(keys.is_down(Action::Jump));

        keys.set(KeyCode::Space, ElementState::Released);
        assert!(!keys.is_down(Action::Jump));
    }

    #[test]
    fn test_custom_bindings() {
        let bindings = KeyBindings {
            forward: KeyCode::KeyW,
            ..Default::default()
        };
        let mut keys = KeyboardState::new(bindings);
        keys.press(KeyCode::KeyH);
        assert!(!keys.is_down(Action::Forward));
        keys.press(KeyCode::KeyW);
        assert!(keys.is_down(Action::Forward));
        keys.clear();
        assert!(!keys.is_down(Action::Forward));
    }
}
