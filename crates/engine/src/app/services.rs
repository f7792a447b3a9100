//! Capabilities injected into every handler call.

use crate::content::{EntityPlacement, MusicTrack};

use super::bus::EventBus;
use super::fade::FadeTransition;
use super::geometry::{Vec2, ViewportSize};
use super::handler::HandlerKey;
use super::input::HeldInputs;

pub trait AudioBackend {
    fn play_music(&mut self, track: &MusicTrack);
    fn stop_music(&mut self, track: &MusicTrack);
    fn play_nsf(&mut self, track: u32);
    fn stop_nsf(&mut self);
    fn play_sound(&mut self, name: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldSignal {
    BossDefeated,
}

/// Non-player entities living on screens.
pub trait EntityWorld {
    fn spawn(&mut self, screen: &str, placement: &EntityPlacement) -> EntityHandle;
    fn remove(&mut self, handle: EntityHandle);
    /// Removes every entity, including ones no screen is tracking.
    fn stop_all(&mut self);
    fn update(&mut self, screen: &str, player: Vec2) -> Vec<WorldSignal>;
    /// `None` once the entity is gone.
    fn position(&self, handle: EntityHandle) -> Option<Vec2>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateMessage {
    Teleport,
    TeleportEnd,
    TeleportBlink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitySignal {
    /// The player ran out of health or fell out of the map.
    Stopped,
    StateChanged(String),
}

pub trait PlayerEntity {
    fn reset(&mut self);
    fn start(&mut self, screen: &str);
    fn stop(&mut self);
    fn set_screen(&mut self, screen: &str);

    fn position(&self) -> Vec2;
    fn set_position(&mut self, position: Vec2);

    fn set_visible(&mut self, visible: bool);
    fn is_visible(&self) -> bool;
    fn set_can_move(&mut self, can_move: bool);
    /// Freezes the whole entity, physics included.
    fn set_paused(&mut self, paused: bool);
    fn set_input_paused(&mut self, paused: bool);
    fn input_paused(&self) -> bool;

    fn send_state(&mut self, message: StateMessage);
    fn set_weapon(&mut self, weapon: &str);

    fn health(&self) -> f32;
    fn max_health(&self) -> f32;

    fn think(&mut self, held: &HeldInputs) -> Vec<EntitySignal>;
}

/// Draw target handed to render callbacks. `opacity` is the fade tint.
pub trait SpriteBatch {
    fn draw_tile(&mut self, tile: u16, cell: u32, x: i32, y: i32, size: u32, opacity: f32);
    fn draw_sprite(&mut self, name: &str, x: i32, y: i32, opacity: f32);
    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: [u8; 4], opacity: f32);
    fn draw_text(&mut self, text: &str, x: i32, y: i32, opacity: f32);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameFlags {
    paused: bool,
}

impl GameFlags {
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

pub struct Services {
    pub audio: Box<dyn AudioBackend>,
    pub entities: Box<dyn EntityWorld>,
    pub bus: EventBus<HandlerKey>,
    pub fade: FadeTransition,
    pub flags: GameFlags,
    pub held: HeldInputs,
    pub viewport: ViewportSize,
}

impl Services {
    pub fn new(
        audio: Box<dyn AudioBackend>,
        entities: Box<dyn EntityWorld>,
        viewport: ViewportSize,
    ) -> Self {
        Self {
            audio,
            entities,
            bus: EventBus::default(),
            fade: FadeTransition::default(),
            flags: GameFlags::default(),
            held: HeldInputs::default(),
            viewport,
        }
    }
}
