//! Window and loop tuning read from `assets/engine.json`.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::{LoopConfig, SpriteStyle, ViewportSize};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct EngineSettings {
    pub(crate) window_title: String,
    /// Window size as a multiple of the project's viewport.
    pub(crate) window_scale: u32,
    pub(crate) target_tps: u32,
    pub(crate) max_ticks_per_frame: u32,
    pub(crate) max_render_fps: Option<u32>,
    pub(crate) sprites: BTreeMap<String, SpriteSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SpriteSettings {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) color: [u8; 4],
}

impl Default for EngineSettings {
    fn default() -> Self {
        let loop_defaults = LoopConfig::default();
        Self {
            window_title: loop_defaults.window_title,
            window_scale: 3,
            target_tps: loop_defaults.target_tps,
            max_ticks_per_frame: loop_defaults.max_ticks_per_frame,
            max_render_fps: loop_defaults.max_render_fps,
            sprites: BTreeMap::new(),
        }
    }
}

impl EngineSettings {
    pub(crate) fn loop_config(&self, viewport: ViewportSize) -> LoopConfig {
        let scale = self.window_scale.max(1);
        let sprite_styles = self
            .sprites
            .iter()
            .map(|(name, sprite)| {
                (
                    name.clone(),
                    SpriteStyle {
                        width: sprite.width,
                        height: sprite.height,
                        color: sprite.color,
                    },
                )
            })
            .collect();
        LoopConfig {
            window_title: self.window_title.clone(),
            window_width: viewport.pixels_across.saturating_mul(scale),
            window_height: viewport.pixels_down.saturating_mul(scale),
            target_tps: self.target_tps,
            max_ticks_per_frame: self.max_ticks_per_frame,
            max_render_fps: self.max_render_fps,
            sprite_styles,
            ..LoopConfig::default()
        }
    }
}

/// A missing file means defaults; an unreadable or malformed one is an error.
pub(crate) fn load_settings(path: &Path) -> Result<EngineSettings, SettingsError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "settings_defaulted");
            return Ok(EngineSettings::default());
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_settings_json(&raw).map_err(|message| SettingsError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

fn parse_settings_json(raw: &str) -> Result<EngineSettings, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, EngineSettings>(&mut deserializer) {
        Ok(settings) => Ok(settings),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse settings json: {source}"))
            } else {
                Err(format!("parse settings json at {path}: {source}"))
            }
        }
    }
}
