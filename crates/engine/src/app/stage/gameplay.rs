use crate::app::input::HeldInputs;
use crate::app::services::{EntitySignal, GameFlags, PlayerEntity};

/// The player's think loop, independent of which screen is current.
pub struct GamePlay {
    player: Box<dyn PlayerEntity>,
    running: bool,
    attached: bool,
    ended: bool,
}

impl GamePlay {
    pub fn new(player: Box<dyn PlayerEntity>) -> Self {
        Self {
            player,
            running: false,
            attached: true,
            ended: false,
        }
    }

    pub fn player(&self) -> &dyn PlayerEntity {
        self.player.as_ref()
    }

    pub fn player_mut(&mut self) -> &mut dyn PlayerEntity {
        self.player.as_mut()
    }

    pub fn start_handler(&mut self) {
        self.running = true;
        self.attached = true;
        self.ended = false;
    }

    pub fn stop_handler(&mut self) {
        self.running = false;
    }

    /// Suspends thinking while another handler (the pause screen) owns the frame.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    /// Stops thinking until the next `start_handler`.
    pub fn end_play(&mut self) {
        self.ended = true;
    }

    pub fn is_thinking(&self) -> bool {
        self.running && self.attached && !self.ended
    }

    pub fn think(&mut self, held: &HeldInputs, flags: &GameFlags) -> Vec<EntitySignal> {
        if !self.is_thinking() || flags.is_paused() {
            return Vec::new();
        }
        self.player.think(held)
    }
}
