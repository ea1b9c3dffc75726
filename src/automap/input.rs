//! Automap Input Handling
//!
//! Turns keyboard state into automap key events. Pan and zoom are held
//! keys, so both the press and the release are reported.

use macroquad::prelude::*;

/// What a key does on the automap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutomapCommand {
    PanRight,
    PanLeft,
    PanUp,
    PanDown,
    ZoomOut,
    ZoomIn,
    /// Open or close the map
    Toggle,
    /// Zoom all the way out, or back to where we were
    MaxZoom,
    Follow,
    Grid,
    Mark,
    ClearMarks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomapEvent {
    KeyDown(AutomapCommand),
    KeyUp(AutomapCommand),
}

/// Key bindings
#[derive(Debug, Clone)]
pub struct AutomapKeys {
    pub bindings: Vec<(KeyCode, AutomapCommand)>,
}

impl Default for AutomapKeys {
    fn default() -> Self {
        use AutomapCommand::*;
        Self {
            bindings: vec![
                (KeyCode::Right, PanRight),
                (KeyCode::Left, PanLeft),
                (KeyCode::Up, PanUp),
                (KeyCode::Down, PanDown),
                (KeyCode::Minus, ZoomOut),
                (KeyCode::Equal, ZoomIn),
                (KeyCode::Tab, Toggle),
                (KeyCode::Key0, MaxZoom),
                (KeyCode::F, Follow),
                (KeyCode::G, Grid),
                (KeyCode::M, Mark),
                (KeyCode::C, ClearMarks),
            ],
        }
    }
}

impl AutomapKeys {
    pub fn command_for(&self, key: KeyCode) -> Option<AutomapCommand> {
        self.bindings
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, cmd)| *cmd)
    }
}

/// Collect this frame's automap key events
pub fn poll_events(keys: &AutomapKeys) -> Vec<AutomapEvent> {
    let mut events = Vec::new();
    for &(key, cmd) in &keys.bindings {
        if is_key_pressed(key) {
            events.push(AutomapEvent::KeyDown(cmd));
        }
        if is_key_released(key) {
            events.push(AutomapEvent::KeyUp(cmd));
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings_unique() {
        let keys = AutomapKeys::default();
        for (i, (key, _)) in keys.bindings.iter().enumerate() {
            assert!(keys.bindings[i + 1..].iter().all(|(k, _)| k != key));
        }
        assert_eq!(keys.command_for(KeyCode::Tab), Some(AutomapCommand::Toggle));
        assert_eq!(keys.command_for(KeyCode::Q), None);
    }
}
