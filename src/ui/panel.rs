//! Debug panel shown while the game is paused.

use crate::gfx::camera::FpsCamera;

/// Snapshot of the values the debug panel shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugStats {
    pub fps: f32,
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
    pub paused: bool,
}

impl DebugStats {
    pub fn capture(camera: &FpsCamera, fps: f32, paused: bool) -> Self {
        let position = camera.position();
        Self {
            fps,
            position: [position.x, position.y, position.z],
            yaw: camera.yaw(),
            pitch: camera.pitch(),
            on_ground: camera.on_ground(),
            paused,
        }
    }

    pub fn lines(&self) -> [String; 4] {
        let [x, y, z] = self.position;
        [
            format!("FPS: {:.0}", self.fps),
            format!("Position: ({x:.2}, {y:.2}, {z:.2})"),
            format!("Yaw: {:.1}  Pitch: {:.1}", self.yaw, self.pitch),
            format!(
                "Grounded: {}  {}",
                self.on_ground,
                if self.paused { "[paused]" } else { "" }
            ),
        ]
    }
}

pub fn debug_panel(ui: &imgui::Ui, stats: &DebugStats) {
    ui.window("Debug")
        .size([320.0, 130.0], imgui::Condition::FirstUseEver)
        .position([10.0, 10.0], imgui::Condition::FirstUseEver)
        .build(|| {
            for line in stats.lines() {
                ui.text(line);
            }
        });
}
