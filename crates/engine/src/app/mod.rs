mod bus;
pub mod consts;
mod fade;
mod game;
mod geometry;
mod handler;
mod health_meter;
mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod services;
mod stage;
mod stage_select;
#[cfg(test)]
pub(crate) mod test_support;

pub use bus::{Channel, EventBus};
pub use fade::{FadeCue, FadeEvent, FadeTransition};
pub use game::{Game, GameError, PlayerFactory};
pub use geometry::{PointI, RectF, Vec2, ViewportSize};
pub use handler::{GameHandler, HandlerCommand, HandlerKey, HandlerTransfer, TransferKind};
pub use health_meter::{HealthMeter, MeterState};
pub use input::{GameInput, HeldInputs, InputEvent};
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::FrameStatsSnapshot;
pub use rendering::{FrameBatch, Renderer, SpriteStyle, EMPTY_TILE};
pub use services::{
    AudioBackend, EntityHandle, EntitySignal, EntityWorld, GameFlags, PlayerEntity, Services,
    SpriteBatch, StateMessage, WorldSignal,
};
pub use stage::{
    camera_for, GamePlay, JoinHandler, MapError, MapHandler, MapState, PauseEvent, PauseMode,
    PauseScreen, PlayPhase, ReadyBlink, ScreenEvent, ScreenHandler, ScrollDirection,
    TeleportPhase, TileAnimator,
};
pub use stage_select::StageSelect;
