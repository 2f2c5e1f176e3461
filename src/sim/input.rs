//! Player input as seen by the simulation
//!
//! The host maps its keys into this struct before each tick; the player
//! entity reads it from the level during its own tick.

use glam::Vec2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fire: bool,
}

impl InputState {
    /// Movement direction, not normalized (diagonals are faster)
    pub fn axis(&self) -> Vec2 {
        let x = self.right as i32 - self.left as i32;
        let y = self.down as i32 - self.up as i32;
        Vec2::new(x as f32, y as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis() {
        assert_eq!(InputState::default().axis(), Vec2::ZERO);
        let input = InputState {
            up: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(input.axis(), Vec2::new(1.0, -1.0));
        let both = InputState {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(both.axis().x, 0.0);
    }
}
