use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::camera::CameraMovement;

/// Logical actions the demo reacts to, independent of the physical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    StartOrbit,
    StopOrbit,
    Quit,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::MoveForward,
        Action::MoveBackward,
        Action::MoveLeft,
        Action::MoveRight,
        Action::MoveUp,
        Action::MoveDown,
        Action::StartOrbit,
        Action::StopOrbit,
        Action::Quit,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        let action = match name.to_ascii_lowercase().as_str() {
            "forward" => Self::MoveForward,
            "backward" | "back" => Self::MoveBackward,
            "left" => Self::MoveLeft,
            "right" => Self::MoveRight,
            "up" => Self::MoveUp,
            "down" => Self::MoveDown,
            "start-orbit" => Self::StartOrbit,
            "stop-orbit" => Self::StopOrbit,
            "quit" | "exit" => Self::Quit,
            _ => return None,
        };
        Some(action)
    }

    pub fn movement(self) -> Option<CameraMovement> {
        Some(match self {
            Self::MoveForward => CameraMovement::Forward,
            Self::MoveBackward => CameraMovement::Backward,
            Self::MoveLeft => CameraMovement::Left,
            Self::MoveRight => CameraMovement::Right,
            Self::MoveUp => CameraMovement::Up,
            Self::MoveDown => CameraMovement::Down,
            Self::StartOrbit | Self::StopOrbit | Self::Quit => return None,
        })
    }
}

/// Window input translated into the demo's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Pressed(Action),
    Released(Action),
    /// Absolute cursor position in window pixels.
    CursorMoved { x: f64, y: f64 },
    /// Raw pointer motion in device units, y growing downward. Not bounded by
    /// the window, so it keeps turning the camera while the cursor is grabbed.
    MouseDelta { x: f64, y: f64 },
    /// Cursor came back into the window; the next sample reseeds.
    CursorEntered,
    /// Window lost keyboard focus; release events may never arrive.
    FocusLost,
    /// Vertical scroll, positive when scrolling forward.
    Scroll { y: f32 },
}

/// FIFO of events collected between frames.
#[derive(Debug, Default)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    /// Yields queued events in arrival order, leaving the queue empty.
    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Set of actions whose keys are currently held down.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    held: HashSet<Action>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_down(&mut self, action: Action) {
        self.held.insert(action);
    }

    pub fn set_up(&mut self, action: Action) {
        self.held.remove(&action);
    }

    pub fn is_down(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    /// Held actions in a fixed order so frame updates are deterministic.
    pub fn held(&self) -> impl Iterator<Item = Action> + '_ {
        Action::ALL.into_iter().filter(|action| self.held.contains(action))
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }
}

/// Turns absolute cursor positions into per-sample offsets.
///
/// The first sample after creation or [`CursorTracker::reset`] only seeds the
/// last position and yields no offset.
#[derive(Debug, Default, Clone)]
pub struct CursorTracker {
    last: Option<(f64, f64)>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `(x_offset, y_offset)` with y reversed so moving up is positive.
    pub fn offset(&mut self, x: f64, y: f64) -> (f32, f32) {
        let (last_x, last_y) = self.last.replace((x, y)).unwrap_or((x, y));
        ((x - last_x) as f32, (last_y - y) as f32)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Camera offsets for a raw motion delta, y reversed like [`CursorTracker::offset`].
pub fn motion_offset(x: f64, y: f64) -> (f32, f32) {
    (x as f32, -y as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_cursor_sample_yields_no_offset() {
        let mut tracker = CursorTracker::new();
        assert_eq!(tracker.offset(1234.0, -987.0), (0.0, 0.0));
        assert_eq!(tracker.offset(1244.0, -990.0), (10.0, 3.0));
    }

    #[test]
    fn reset_reseeds_on_next_sample() {
        let mut tracker = CursorTracker::new();
        tracker.offset(0.0, 0.0);
        tracker.reset();
        assert_eq!(tracker.offset(500.0, 500.0), (0.0, 0.0));
    }

    #[test]
    fn motion_delta_reverses_y() {
        assert_eq!(motion_offset(12.0, 5.0), (12.0, -5.0));
        assert_eq!(motion_offset(-3.0, -4.0), (-3.0, 4.0));
    }

    #[test]
    fn clear_releases_every_held_action() {
        let mut state = InputState::new();
        state.set_down(Action::MoveForward);
        state.set_down(Action::StopOrbit);
        state.clear();
        assert_eq!(state.held().count(), 0);
    }

    #[test]
    fn queue_drains_in_arrival_order() {
        let mut queue = InputQueue::new();
        queue.push(InputEvent::Pressed(Action::MoveLeft));
        queue.push(InputEvent::Scroll { y: 1.0 });
        queue.push(InputEvent::Released(Action::MoveLeft));
        let drained: Vec<_> = queue.drain().collect();
        assert_eq!(
            drained,
            vec![
                InputEvent::Pressed(Action::MoveLeft),
                InputEvent::Scroll { y: 1.0 },
                InputEvent::Released(Action::MoveLeft),
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn held_actions_are_ordered_and_deduplicated() {
        let mut state = InputState::new();
        state.set_down(Action::Quit);
        state.set_down(Action::MoveForward);
        state.set_down(Action::MoveForward);
        assert_eq!(state.held().collect::<Vec<_>>(), vec![Action::MoveForward, Action::Quit]);
        state.set_up(Action::MoveForward);
        assert!(!state.is_down(Action::MoveForward));
    }

    #[test]
    fn parses_action_names() {
        assert_eq!(Action::from_name("Forward"), Some(Action::MoveForward));
        assert_eq!(Action::from_name("stop-orbit"), Some(Action::StopOrbit));
        assert_eq!(Action::from_name("jump"), None);
        assert_eq!(Action::MoveDown.movement(), Some(CameraMovement::Down));
        assert_eq!(Action::Quit.movement(), None);
    }
}
