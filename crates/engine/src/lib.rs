use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;

pub use app::{
    run_app, AppError, AudioBackend, Channel, EntityHandle, EntitySignal, EntityWorld, Game,
    GameError, GameInput, HandlerKey, HeldInputs, InputEvent, LoopConfig, PlayerEntity,
    PlayerFactory, PointI, RectF, Services, SpriteStyle, StateMessage, Vec2, ViewportSize,
    WorldSignal, SLOW_FRAME_ENV_VAR,
};
pub use content::{
    load_map, load_project, ContentError, ContentErrorCode, EntityPlacement, Map, MusicTrack,
    ProjectDef, SourceLocation, StageDef,
};

pub const ROOT_ENV_VAR: &str = "MMGE_ROOT";
const ASSETS_DIR: &str = "assets";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("MMGE_ROOT={path} has no assets/ directory")]
    InvalidEnvRoot { path: PathBuf },
    #[error("no assets/ directory above {searched:?}; set MMGE_ROOT to the game root")]
    RootNotFound { searched: Vec<PathBuf> },
}

/// Finds the game root: `MMGE_ROOT` when set, else the nearest directory with
/// an `assets/` folder above the working directory or the executable.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let assets_dir = root.join(ASSETS_DIR);
    Ok(AppPaths { root, assets_dir })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let path = normalize_path(Path::new(&value));
            if is_game_root(&path) {
                Ok(path)
            } else {
                Err(StartupError::InvalidEnvRoot { path })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let mut searched = Vec::new();
            if let Ok(cwd) = env::current_dir() {
                searched.push(cwd);
            }
            searched.extend(exe.parent().map(Path::to_path_buf));
            find_game_root(&searched).ok_or(StartupError::RootNotFound { searched })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_game_root(starts: &[PathBuf]) -> Option<PathBuf> {
    starts
        .iter()
        .flat_map(|start| start.ancestors())
        .find(|candidate| is_game_root(candidate))
        .map(normalize_path)
}

fn is_game_root(path: &Path) -> bool {
    path.join(ASSETS_DIR).is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_root_needs_an_assets_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(!is_game_root(dir.path()));

        fs::create_dir(dir.path().join(ASSETS_DIR)).expect("assets");
        assert!(is_game_root(dir.path()));
    }

    #[test]
    fn game_root_search_walks_up_from_each_start() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested");
        let elsewhere = tempfile::tempdir().expect("tempdir");
        assert_eq!(find_game_root(&[elsewhere.path().to_path_buf(), nested.clone()]), None);

        fs::create_dir(dir.path().join(ASSETS_DIR)).expect("assets");
        assert_eq!(
            find_game_root(&[elsewhere.path().to_path_buf(), nested]),
            Some(normalize_path(dir.path()))
        );
    }
}
