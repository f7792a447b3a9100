use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use engine::{
    load_map, load_project, resolve_app_paths, ContentError, Game, LoopConfig, Map, PlayerEntity,
    ProjectDef, Services, StartupError,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::audio::LoggingAudio;
use super::avatar::DemoAvatar;
use super::settings::{load_settings, SettingsError};
use super::world::{DamageInbox, DemoWorld};

const PROJECT_ENV_VAR: &str = "MMGE_PROJECT";
const DEFAULT_PROJECT_FILE: &str = "project.xml";
const SETTINGS_FILE: &str = "engine.json";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) game: Game,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load content: {0}")]
    Content(#[from] ContentError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Mega Man Engine Startup ===");

    let paths = resolve_app_paths()?;
    let project_file = env::var(PROJECT_ENV_VAR).unwrap_or_else(|_| DEFAULT_PROJECT_FILE.to_string());
    info!(
        root = %paths.root.display(),
        assets_dir = %paths.assets_dir.display(),
        project_file = project_file.as_str(),
        "startup"
    );

    let settings = load_settings(&paths.assets_dir.join(SETTINGS_FILE))?;
    let (project, maps) = load_content(&paths.assets_dir.join(project_file))?;
    let config = settings.loop_config(project.size);
    let game = assemble_game(project, maps);

    Ok(AppWiring { config, game })
}

/// Loads the project and every stage map it lists.
fn load_content(project_path: &Path) -> Result<(ProjectDef, BTreeMap<String, Map>), ContentError> {
    let project = load_project(project_path)?;
    let mut maps = BTreeMap::new();
    for stage in &project.stages {
        let map = load_map(&stage.map)?;
        info!(
            stage = stage.name.as_str(),
            map = map.name.as_str(),
            screen_count = map.screens.len(),
            "stage_map_loaded"
        );
        maps.insert(stage.name.clone(), map);
    }
    Ok((project, maps))
}

fn assemble_game(project: ProjectDef, maps: BTreeMap<String, Map>) -> Game {
    let damage = DamageInbox::default();
    let services = Services::new(
        Box::new(LoggingAudio::default()),
        Box::new(DemoWorld::new(DamageInbox::clone(&damage))),
        project.size,
    );
    let new_player = Box::new(move || {
        Box::new(DemoAvatar::new(DamageInbox::clone(&damage))) as Box<dyn PlayerEntity>
    });
    Game::new(project, maps, services, new_player)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
