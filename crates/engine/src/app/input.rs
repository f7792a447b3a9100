use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameInput {
    Up,
    Down,
    Left,
    Right,
    Jump,
    Shoot,
    Start,
    Select,
}

const INPUT_COUNT: usize = 8;

/// A discrete press or release, delivered on the input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub input: GameInput,
    pub pressed: bool,
}

impl InputEvent {
    pub const fn pressed(input: GameInput) -> Self {
        Self {
            input,
            pressed: true,
        }
    }

    pub const fn released(input: GameInput) -> Self {
        Self {
            input,
            pressed: false,
        }
    }

    pub fn is_press_of(&self, input: GameInput) -> bool {
        self.pressed && self.input == input
    }
}

/// Level-triggered view of the buttons, sampled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldInputs {
    down: [bool; INPUT_COUNT],
}

impl HeldInputs {
    pub fn set(&mut self, input: GameInput, is_down: bool) {
        self.down[input.index()] = is_down;
    }

    pub fn is_down(&self, input: GameInput) -> bool {
        self.down[input.index()]
    }

    pub fn apply(&mut self, event: InputEvent) {
        self.set(event.input, event.pressed);
    }

    pub fn with_down(mut self, input: GameInput) -> Self {
        self.set(input, true);
        self
    }
}

impl GameInput {
    const fn index(self) -> usize {
        match self {
            GameInput::Up => 0,
            GameInput::Down => 1,
            GameInput::Left => 2,
            GameInput::Right => 3,
            GameInput::Jump => 4,
            GameInput::Shoot => 5,
            GameInput::Start => 6,
            GameInput::Select => 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_inputs_track_press_and_release() {
        let mut held = HeldInputs::default();
        held.apply(InputEvent::pressed(GameInput::Right));
        held.apply(InputEvent::pressed(GameInput::Jump));
        assert!(held.is_down(GameInput::Right));
        assert!(held.is_down(GameInput::Jump));

        held.apply(InputEvent::released(GameInput::Right));
        assert!(!held.is_down(GameInput::Right));
        assert!(held.is_down(GameInput::Jump));
    }

    #[test]
    fn press_filter_ignores_releases() {
        assert!(InputEvent::pressed(GameInput::Start).is_press_of(GameInput::Start));
        assert!(!InputEvent::released(GameInput::Start).is_press_of(GameInput::Start));
        assert!(!InputEvent::pressed(GameInput::Select).is_press_of(GameInput::Start));
    }
}
