use std::collections::BTreeMap;

use thiserror::Error;

use crate::app::{PointI, RectF};

/// Music for a map or screen: an optional intro followed by a loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MusicTrack {
    pub intro: Option<String>,
    pub looped: Option<String>,
}

impl MusicTrack {
    pub fn is_empty(&self) -> bool {
        self.intro.is_none() && self.looped.is_none()
    }
}

/// Row-major grid of tile ids for one screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    width: u32,
    height: u32,
    tiles: Vec<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TilemapError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
}

impl Tilemap {
    pub fn new(width: u32, height: u32, tiles: Vec<u16>) -> Result<Self, TilemapError> {
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TilemapError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    pub fn filled(width: u32, height: u32, tile: u16) -> Self {
        Self {
            width,
            height,
            tiles: vec![tile; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileFrame {
    /// Cell index on the tileset sheet.
    pub cell: u32,
    /// Ticks this frame stays up; zero means the tile never animates past it.
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileDef {
    pub id: u16,
    pub name: String,
    pub frames: Vec<TileFrame>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tileset {
    pub tile_size: u32,
    pub sheet: Option<String>,
    pub tiles: BTreeMap<u16, TileDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeleportInfo {
    pub source: RectF,
    pub target_screen: String,
    pub target: PointI,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPlacement {
    pub name: String,
    pub position: PointI,
    pub boss: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub name: String,
    pub tiles: Tilemap,
    pub teleports: Vec<TeleportInfo>,
    pub entities: Vec<EntityPlacement>,
    pub music: Option<MusicTrack>,
    pub nsf_track: Option<u32>,
}

impl Screen {
    pub fn pixel_size(&self, tile_size: u32) -> (i32, i32) {
        (
            (self.tiles.width() * tile_size) as i32,
            (self.tiles.height() * tile_size) as i32,
        )
    }

    pub fn has_boss(&self) -> bool {
        self.entities.iter().any(|placement| placement.boss)
    }
}

/// `Vertical` joins sit between side-by-side screens (`screen_one` on the left)
/// and scroll horizontally; `Horizontal` joins sit between stacked screens
/// (`screen_one` on top) and scroll vertically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Vertical,
    Horizontal,
}

/// Which way a join may be crossed. Forward is from `screen_one` to `screen_two`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinDirection {
    Both,
    ForwardOnly,
    BackwardOnly,
}

impl JoinDirection {
    pub fn allows_forward(self) -> bool {
        matches!(self, JoinDirection::Both | JoinDirection::ForwardOnly)
    }

    pub fn allows_backward(self) -> bool {
        matches!(self, JoinDirection::Both | JoinDirection::BackwardOnly)
    }
}

/// Offsets and size are in tiles along the shared edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub screen_one: String,
    pub screen_two: String,
    pub offset_one: i32,
    pub offset_two: i32,
    pub size: i32,
    pub direction: JoinDirection,
}

impl Join {
    pub fn touches(&self, screen: &str) -> bool {
        self.screen_one == screen || self.screen_two == screen
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    pub name: String,
    pub screens: BTreeMap<String, Screen>,
    /// Empty means the first screen by name.
    pub start_screen: String,
    pub start: PointI,
    pub continue_points: BTreeMap<String, PointI>,
    pub tileset: Tileset,
    pub music: Option<MusicTrack>,
    pub nsf_track: Option<u32>,
    pub joins: Vec<Join>,
}

impl Map {
    pub fn screen(&self, name: &str) -> Option<&Screen> {
        self.screens.get(name)
    }

    pub fn start_screen_name(&self) -> &str {
        if self.start_screen.is_empty() {
            self.screens
                .keys()
                .next()
                .map(String::as_str)
                .unwrap_or_default()
        } else {
            &self.start_screen
        }
    }

    pub fn joins_for<'a>(&'a self, screen: &'a str) -> impl Iterator<Item = &'a Join> + 'a {
        self.joins.iter().filter(move |join| join.touches(screen))
    }

    pub fn continue_point(&self, screen: &str) -> Option<PointI> {
        self.continue_points.get(screen).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen(name: &str) -> Screen {
        Screen {
            name: name.to_string(),
            tiles: Tilemap::filled(16, 14, 0),
            teleports: Vec::new(),
            entities: Vec::new(),
            music: None,
            nsf_track: None,
        }
    }

    #[test]
    fn tilemap_rejects_wrong_tile_count() {
        let error = Tilemap::new(2, 2, vec![0, 1, 2]).expect_err("mismatch");
        assert_eq!(
            error,
            TilemapError::TileCountMismatch {
                expected: 4,
                actual: 3
            }
        );
        let tilemap = Tilemap::new(2, 2, vec![0, 1, 2, 3]).expect("tilemap");
        assert_eq!(tilemap.tile_at(1, 1), Some(3));
        assert_eq!(tilemap.tile_at(2, 0), None);
    }

    #[test]
    fn empty_start_screen_falls_back_to_first_screen() {
        let mut screens = BTreeMap::new();
        screens.insert("b".to_string(), screen("b"));
        screens.insert("a".to_string(), screen("a"));
        let map = Map {
            name: "test".to_string(),
            screens,
            start_screen: String::new(),
            start: PointI::ZERO,
            continue_points: BTreeMap::new(),
            tileset: Tileset {
                tile_size: 16,
                sheet: None,
                tiles: BTreeMap::new(),
            },
            music: None,
            nsf_track: None,
            joins: Vec::new(),
        };
        assert_eq!(map.start_screen_name(), "a");
        assert_eq!(map.screen("a").map(|s| s.pixel_size(16)), Some((256, 224)));
    }

    #[test]
    fn join_direction_permissions() {
        assert!(JoinDirection::Both.allows_forward() && JoinDirection::Both.allows_backward());
        assert!(!JoinDirection::ForwardOnly.allows_backward());
        assert!(!JoinDirection::BackwardOnly.allows_forward());
    }
}
