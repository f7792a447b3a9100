mod error;
mod map;
mod map_loader;
mod project;
mod xml;

pub use error::{ContentError, ContentErrorCode, SourceLocation};
pub use map::{
    EntityPlacement, Join, JoinDirection, JoinKind, Map, MusicTrack, Screen, TeleportInfo,
    TileDef, TileFrame, Tilemap, TilemapError, Tileset,
};
pub use map_loader::{load_map, parse_map};
pub use project::{
    load_project, parse_project, HealthMeterDef, MeterOrientation, PauseScreenDef, ProjectDef,
    StageDef,
};
