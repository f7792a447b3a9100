//! Frame counts and tuning values shared by the map lifecycle.
//!
//! Everything here is measured in logic ticks (60 per second at the default
//! `LoopConfig::target_tps`) or in screen pixels.

pub const READY_BLINK_CYCLES: u32 = 8;
pub const READY_BLINK_CYCLE_FRAMES: u32 = 8;
pub const READY_BLINK_FRAMES: u32 = READY_BLINK_CYCLES * READY_BLINK_CYCLE_FRAMES;

/// Ticks between the player's death and the start of the reset fade.
pub const MAP_DEAD_FRAMES: u32 = 180;

/// Length of each half (out, then in) of a fade transition.
pub const FADE_FRAMES: u32 = 16;

pub const SCROLL_FRAMES: u32 = 64;
/// Distance the player is carried into the arriving screen during a scroll.
pub const PLAYER_SCROLL_TRAVEL_PX: i32 = 24;

pub const PLAYER_START_LIVES: i32 = 2;

pub const METER_TICK_COUNT: f32 = 28.0;
pub const METER_TICK_INTERVAL_FRAMES: u32 = 3;

pub const DEFAULT_PIXELS_ACROSS: u32 = 256;
pub const DEFAULT_PIXELS_DOWN: u32 = 224;
pub const DEFAULT_TILE_SIZE: u32 = 16;
/// Pixel extent of one meter tick along the meter's axis.
pub const METER_TICK_PX: i32 = 2;
/// Vertical meters fill upward from this far below their position.
pub const METER_VERTICAL_BASE_PX: i32 = 54;
pub const METER_TICK_SOUND: &str = "health_tick";
