mod gameplay;
mod join_handler;
mod map_handler;
mod pause_screen;
mod screen_handler;
mod tiles;

pub use gameplay::GamePlay;
pub use join_handler::{JoinHandler, ScrollDirection};
pub use map_handler::{
    MapError, MapHandler, MapState, PauseMode, PlayPhase, ReadyBlink, TeleportPhase,
};
pub use pause_screen::{PauseEvent, PauseScreen};
pub use screen_handler::{camera_for, ScreenEvent, ScreenHandler};
pub use tiles::TileAnimator;
