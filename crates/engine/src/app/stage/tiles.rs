use std::collections::BTreeMap;

use crate::content::{TileFrame, Tileset};

#[derive(Debug, Clone)]
struct TileAnimation {
    frames: Vec<TileFrame>,
    current: usize,
    elapsed: u32,
}

/// Shared animation clock for every tile in a map's tileset.
///
/// Advanced once per tick by the map, whichever screen is current, so screens
/// re-entered later show the same phase as if they had been on screen.
#[derive(Debug, Clone, Default)]
pub struct TileAnimator {
    tiles: BTreeMap<u16, TileAnimation>,
    ticks: u64,
}

impl TileAnimator {
    pub fn new(tileset: &Tileset) -> Self {
        let tiles = tileset
            .tiles
            .iter()
            .filter(|(_, def)| !def.frames.is_empty())
            .map(|(id, def)| {
                (
                    *id,
                    TileAnimation {
                        frames: def.frames.clone(),
                        current: 0,
                        elapsed: 0,
                    },
                )
            })
            .collect();
        Self { tiles, ticks: 0 }
    }

    pub fn advance(&mut self) {
        self.ticks += 1;
        for animation in self.tiles.values_mut() {
            if animation.frames.len() < 2 {
                continue;
            }
            let duration = animation.frames[animation.current].duration;
            if duration == 0 {
                continue;
            }
            animation.elapsed += 1;
            if animation.elapsed >= duration {
                animation.elapsed = 0;
                animation.current = (animation.current + 1) % animation.frames.len();
            }
        }
    }

    /// Sheet cell to draw for `tile` this tick. Unknown tiles map to their id.
    pub fn cell_of(&self, tile: u16) -> u32 {
        self.tiles
            .get(&tile)
            .map(|animation| animation.frames[animation.current].cell)
            .unwrap_or(tile as u32)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
