use std::rc::Rc;

use engine::{EntitySignal, GameInput, HeldInputs, PlayerEntity, StateMessage, Vec2};
use tracing::debug;

use super::world::DamageInbox;

const MAX_HEALTH: f32 = 28.0;
const RUN_SPEED_PX: f32 = 1.375;
const JUMP_VELOCITY_PX: f32 = -4.875;
const GRAVITY_PX: f32 = 0.25;
const MAX_FALL_SPEED_PX: f32 = 7.0;
const BEAM_SPEED_PX: f32 = 8.0;
/// Ticks the teleport sparkle plays before the avatar reports it finished.
const TELEPORT_BLINK_TICKS: u32 = 12;

/// Minimal platforming player: runs, jumps onto the floor it was last placed
/// on, beams in and out, and takes contact damage from the world.
pub(crate) struct DemoAvatar {
    position: Vec2,
    floor_y: f32,
    velocity_y: f32,
    screen: String,
    visible: bool,
    can_move: bool,
    paused: bool,
    input_paused: bool,
    beaming: bool,
    blink_ticks: Option<u32>,
    health: f32,
    stopped: bool,
    weapon: Option<String>,
    damage: DamageInbox,
}

impl DemoAvatar {
    pub(crate) fn new(damage: DamageInbox) -> Self {
        Self {
            position: Vec2::default(),
            floor_y: 0.0,
            velocity_y: 0.0,
            screen: String::new(),
            visible: true,
            can_move: true,
            paused: false,
            input_paused: false,
            beaming: false,
            blink_ticks: None,
            health: MAX_HEALTH,
            stopped: false,
            weapon: None,
            damage,
        }
    }

    fn run_and_jump(&mut self, held: &HeldInputs) {
        if held.is_down(GameInput::Left) {
            self.position.x -= RUN_SPEED_PX;
        }
        if held.is_down(GameInput::Right) {
            self.position.x += RUN_SPEED_PX;
        }
        let grounded = self.position.y >= self.floor_y;
        if grounded && held.is_down(GameInput::Jump) {
            self.velocity_y = JUMP_VELOCITY_PX;
        }
    }

    fn fall(&mut self) {
        self.velocity_y = (self.velocity_y + GRAVITY_PX).min(MAX_FALL_SPEED_PX);
        self.position.y += self.velocity_y;
        if self.position.y >= self.floor_y {
            self.position.y = self.floor_y;
            self.velocity_y = 0.0;
        }
    }
}

impl PlayerEntity for DemoAvatar {
    fn reset(&mut self) {
        *self = Self::new(Rc::clone(&self.damage));
        self.damage.set(0.0);
    }

    fn start(&mut self, screen: &str) {
        self.screen = screen.to_string();
        self.stopped = false;
    }

    fn stop(&mut self) {
        self.beaming = false;
        self.blink_ticks = None;
        self.velocity_y = 0.0;
    }

    fn set_screen(&mut self, screen: &str) {
        self.screen = screen.to_string();
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.velocity_y = 0.0;
        if !self.beaming {
            self.floor_y = position.y;
        }
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_can_move(&mut self, can_move: bool) {
        self.can_move = can_move;
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn set_input_paused(&mut self, paused: bool) {
        self.input_paused = paused;
    }

    fn input_paused(&self) -> bool {
        self.input_paused
    }

    fn send_state(&mut self, message: StateMessage) {
        match message {
            StateMessage::Teleport => self.beaming = true,
            StateMessage::TeleportEnd => {
                self.beaming = false;
                self.floor_y = self.position.y;
            }
            StateMessage::TeleportBlink => self.blink_ticks = Some(TELEPORT_BLINK_TICKS),
        }
    }

    fn set_weapon(&mut self, weapon: &str) {
        debug!(weapon, "weapon_equipped");
        self.weapon = Some(weapon.to_string());
    }

    fn health(&self) -> f32 {
        self.health
    }

    fn max_health(&self) -> f32 {
        MAX_HEALTH
    }

    fn think(&mut self, held: &HeldInputs) -> Vec<EntitySignal> {
        if self.paused {
            return Vec::new();
        }
        let mut signals = Vec::new();

        let damage = self.damage.replace(0.0);
        if damage > 0.0 && !self.stopped {
            self.health = (self.health - damage).max(0.0);
            debug!(damage, health = self.health, "avatar_damaged");
        }
        if self.health <= 0.0 && !self.stopped {
            self.stopped = true;
            signals.push(EntitySignal::Stopped);
            return signals;
        }

        if self.beaming {
            self.position.y += BEAM_SPEED_PX;
            return signals;
        }

        if let Some(ticks) = self.blink_ticks {
            if ticks == 0 {
                self.blink_ticks = None;
                signals.push(EntitySignal::StateChanged("TeleportBlink".to_string()));
            } else {
                self.blink_ticks = Some(ticks - 1);
            }
            return signals;
        }

        if self.can_move && !self.input_paused && !self.stopped {
            self.run_and_jump(held);
        }
        self.fall();
        signals
    }
}
