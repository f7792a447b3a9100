//! Software drawing into an RGBA frame buffer.

use std::collections::HashMap;

use crate::app::services::SpriteBatch;

use super::font::for_each_text_pixel;

const TEXT_COLOR: [u8; 4] = [240, 240, 240, 255];
const TILE_EDGE_SHADE: f32 = 0.7;
const TILE_PALETTE: [[u8; 4]; 6] = [
    [0, 112, 236, 255],
    [188, 188, 188, 255],
    [136, 20, 0, 255],
    [0, 148, 0, 255],
    [228, 92, 16, 255],
    [100, 100, 116, 255],
];
/// Tile id drawn as empty sky.
pub const EMPTY_TILE: u16 = 0;

/// Placeholder look for a named sprite until real images are wired in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteStyle {
    pub width: u32,
    pub height: u32,
    pub color: [u8; 4],
}

impl Default for SpriteStyle {
    fn default() -> Self {
        Self {
            width: 16,
            height: 16,
            color: [220, 220, 240, 255],
        }
    }
}

/// Borrowed view of one frame, handed to handlers as their `SpriteBatch`.
pub struct FrameBatch<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
    sprite_styles: &'a HashMap<String, SpriteStyle>,
}

impl<'a> FrameBatch<'a> {
    pub fn new(
        frame: &'a mut [u8],
        width: u32,
        height: u32,
        sprite_styles: &'a HashMap<String, SpriteStyle>,
    ) -> Self {
        Self {
            frame,
            width,
            height,
            sprite_styles,
        }
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    fn fill(&mut self, x: i32, y: i32, width: u32, height: u32, color: [u8; 4]) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(width as i32).min(self.width as i32);
        let y1 = y.saturating_add(height as i32).min(self.height as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                write_pixel_rgba_clipped(self.frame, self.width as usize, px, py, color);
            }
        }
    }
}

impl SpriteBatch for FrameBatch<'_> {
    fn draw_tile(&mut self, tile: u16, cell: u32, x: i32, y: i32, size: u32, opacity: f32) {
        if tile == EMPTY_TILE || size == 0 {
            return;
        }
        let base = TILE_PALETTE[cell as usize % TILE_PALETTE.len()];
        self.fill(x, y, size, size, shade(base, opacity * TILE_EDGE_SHADE));
        self.fill(x, y, size - 1, size - 1, shade(base, opacity));
    }

    fn draw_sprite(&mut self, name: &str, x: i32, y: i32, opacity: f32) {
        let style = self.sprite_styles.get(name).copied().unwrap_or_default();
        self.fill(x, y, style.width, style.height, shade(style.color, opacity));
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: [u8; 4], opacity: f32) {
        self.fill(x, y, width, height, shade(color, opacity));
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32, opacity: f32) {
        let color = shade(TEXT_COLOR, opacity);
        let width = self.width as usize;
        let frame = &mut *self.frame;
        for_each_text_pixel(text, x, y, |px, py| {
            write_pixel_rgba_clipped(frame, width, px, py, color);
        });
    }
}

/// Darkens toward black; the fade tint is applied per draw.
fn shade(color: [u8; 4], opacity: f32) -> [u8; 4] {
    let factor = opacity.clamp(0.0, 1.0);
    let scale = |channel: u8| (channel as f32 * factor).round() as u8;
    [scale(color[0]), scale(color[1]), scale(color[2]), color[3]]
}

pub(super) fn write_pixel_rgba_clipped(
    frame: &mut [u8],
    width: usize,
    x: i32,
    y: i32,
    color: [u8; 4],
) {
    if x < 0 || y < 0 || x as usize >= width {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}
