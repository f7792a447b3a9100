mod font;
mod frame;
mod renderer;

pub use frame::{FrameBatch, SpriteStyle, EMPTY_TILE};
pub use renderer::Renderer;
