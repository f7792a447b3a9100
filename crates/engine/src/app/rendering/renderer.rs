use std::collections::HashMap;
use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::{Game, ViewportSize};

use super::frame::{FrameBatch, SpriteStyle};

const CLEAR_COLOR: [u8; 4] = [0, 0, 0, 255];

/// Presents the game at its native viewport resolution, scaled to the window.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: ViewportSize,
    surface_size: (u32, u32),
    sprite_styles: HashMap<String, SpriteStyle>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, viewport: ViewportSize) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), viewport, size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport,
            surface_size: (size.width, size.height),
            sprite_styles: HashMap::new(),
        })
    }

    pub fn set_sprite_style(&mut self, name: impl Into<String>, style: SpriteStyle) {
        self.sprite_styles.insert(name.into(), style);
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), self.viewport, width, height)?;
        self.surface_size = (width, height);
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        viewport: ViewportSize,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(viewport.pixels_across, viewport.pixels_down, surface)
    }

    pub fn render_game(&mut self, game: &Game) -> Result<(), Error> {
        if self.surface_size.0 == 0 || self.surface_size.1 == 0 {
            return Ok(());
        }
        let frame = self.pixels.frame_mut();
        let mut batch = FrameBatch::new(
            frame,
            self.viewport.pixels_across,
            self.viewport.pixels_down,
            &self.sprite_styles,
        );
        batch.clear(CLEAR_COLOR);
        game.render(&mut batch);
        self.pixels.render()
    }
}
