use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::content::{Map, ProjectDef};

use super::bus::Channel;
use super::handler::{GameHandler, HandlerCommand, HandlerKey, HandlerTransfer, TransferKind};
use super::health_meter::HealthMeter;
use super::input::InputEvent;
use super::services::{PlayerEntity, Services, SpriteBatch};
use super::stage::{MapError, MapHandler, PauseScreen};
use super::stage_select::StageSelect;

/// Builds a fresh player for each map that is entered.
pub type PlayerFactory = Box<dyn FnMut() -> Box<dyn PlayerEntity>>;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("stage '{0}' is not listed in the project")]
    UnknownStage(String),
    #[error("stage '{0}' has no loaded map")]
    MapNotLoaded(String),
    #[error(transparent)]
    Map(#[from] MapError),
}

struct Handlers {
    stage_select: StageSelect,
    map: Option<MapHandler>,
    meter: Option<HealthMeter>,
}

impl Handlers {
    fn get_mut(&mut self, key: HandlerKey) -> Option<&mut dyn GameHandler> {
        match key {
            HandlerKey::StageSelect => Some(&mut self.stage_select),
            HandlerKey::Map => self.map.as_mut().map(|map| map as &mut dyn GameHandler),
            HandlerKey::HealthMeter => {
                self.meter.as_mut().map(|meter| meter as &mut dyn GameHandler)
            }
        }
    }

    fn get(&self, key: HandlerKey) -> Option<&dyn GameHandler> {
        match key {
            HandlerKey::StageSelect => Some(&self.stage_select),
            HandlerKey::Map => self.map.as_ref().map(|map| map as &dyn GameHandler),
            HandlerKey::HealthMeter => self.meter.as_ref().map(|meter| meter as &dyn GameHandler),
        }
    }
}

/// Owns every handler and drives them from the bus: tick, then the fade, then
/// render; input as it arrives.
pub struct Game {
    project: ProjectDef,
    maps: BTreeMap<String, Map>,
    services: Services,
    handlers: Handlers,
    current_stage: Option<String>,
    synced_health: Option<f32>,
    new_player: PlayerFactory,
}

impl Game {
    /// `maps` is keyed by stage name.
    pub fn new(
        project: ProjectDef,
        maps: BTreeMap<String, Map>,
        services: Services,
        new_player: PlayerFactory,
    ) -> Self {
        let stage_select = StageSelect::new(&project.stages);
        Self {
            project,
            maps,
            services,
            handlers: Handlers {
                stage_select,
                map: None,
                meter: None,
            },
            current_stage: None,
            synced_health: None,
            new_player,
        }
    }

    pub fn start(&mut self) {
        self.handlers.stage_select.start_handler(&mut self.services);
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn project(&self) -> &ProjectDef {
        &self.project
    }

    pub fn stage_select(&self) -> &StageSelect {
        &self.handlers.stage_select
    }

    pub fn map(&self) -> Option<&MapHandler> {
        self.handlers.map.as_ref()
    }

    pub fn meter(&self) -> Option<&HealthMeter> {
        self.handlers.meter.as_ref()
    }

    pub fn current_stage(&self) -> Option<&str> {
        self.current_stage.as_deref()
    }

    pub fn tick(&mut self) {
        self.sync_meter();

        for key in self.services.bus.snapshot(Channel::Tick) {
            if !self.services.bus.is_subscribed(Channel::Tick, key) {
                continue;
            }
            let Some(handler) = self.handlers.get_mut(key) else {
                continue;
            };
            let command = handler.game_tick(&mut self.services);
            self.apply_command(command);
        }

        if let Some((owner, event)) = self.services.fade.tick() {
            if let Some(handler) = self.handlers.get_mut(owner) {
                let command = handler.fade_event(event, &mut self.services);
                self.apply_command(command);
            }
        }
    }

    pub fn input(&mut self, event: InputEvent) {
        self.services.held.apply(event);
        for key in self.services.bus.snapshot(Channel::Input) {
            if !self.services.bus.is_subscribed(Channel::Input, key) {
                continue;
            }
            let Some(handler) = self.handlers.get_mut(key) else {
                continue;
            };
            let command = handler.game_input(event, &mut self.services);
            self.apply_command(command);
        }
    }

    pub fn render(&self, batch: &mut dyn SpriteBatch) {
        for key in self.services.bus.snapshot(Channel::Render) {
            if let Some(handler) = self.handlers.get(key) {
                handler.game_render(batch, &self.services);
            }
        }
    }

    /// Stops every handler still on the bus and drops their pending fades.
    pub fn stop_handlers(&mut self) {
        for key in self.services.bus.registered() {
            if let Some(handler) = self.handlers.get_mut(key) {
                handler.stop_handler(&mut self.services);
            }
            self.services.fade.cancel_owner(key);
        }
        info!("handlers_stopped");
    }

    /// Restarts the current map from its continue point.
    pub fn reset_map(&mut self) -> Result<(), GameError> {
        let Some(map) = self.handlers.map.as_mut() else {
            return Ok(());
        };
        map.stop_handler(&mut self.services);
        self.services.fade.cancel_owner(HandlerKey::Map);
        map.start_handler(&mut self.services)?;
        if let Some(meter) = self.handlers.meter.as_mut() {
            meter.reset();
        }
        self.synced_health = None;
        Ok(())
    }

    pub fn enter_stage(&mut self, name: &str) -> Result<(), GameError> {
        let stage = self
            .project
            .stage(name)
            .ok_or_else(|| GameError::UnknownStage(name.to_string()))?;
        let map = self
            .maps
            .get(name)
            .ok_or_else(|| GameError::MapNotLoaded(name.to_string()))?;

        let mut handler = MapHandler::new(map.clone(), (self.new_player)())
            .with_pause_screen(self.project.pause_screen.as_ref().map(PauseScreen::new))
            .with_win_handler(stage.win.clone())
            .with_lose_handler(stage.lose.clone());

        self.handlers.stage_select.stop_handler(&mut self.services);
        if let Err(error) = handler.start_handler(&mut self.services) {
            self.handlers.stage_select.start_handler(&mut self.services);
            return Err(error.into());
        }

        let meter = self.project.health_meter.clone().map(|def| {
            let mut meter = HealthMeter::new(def);
            meter.set_max_value(handler.player().max_health());
            meter.reset();
            meter.start_handler(&mut self.services);
            meter
        });

        info!(stage = name, map = handler.name(), "stage_entered");
        self.handlers.map = Some(handler);
        self.handlers.meter = meter;
        self.current_stage = Some(name.to_string());
        self.synced_health = None;
        Ok(())
    }

    fn apply_command(&mut self, command: HandlerCommand) {
        match command {
            HandlerCommand::None => {}
            HandlerCommand::SelectStage(index) => {
                let Some(name) = self
                    .handlers
                    .stage_select
                    .stage_name(index)
                    .map(str::to_string)
                else {
                    warn!(index, "stage_index_out_of_range");
                    return;
                };
                if let Err(error) = self.enter_stage(&name) {
                    error!(stage = %name, error = %error, "stage_enter_failed");
                }
            }
            HandlerCommand::End(transfer) => self.end_map(transfer),
        }
    }

    fn end_map(&mut self, transfer: Option<HandlerTransfer>) {
        let stage = self.current_stage.take();
        if let Some(mut map) = self.handlers.map.take() {
            map.stop_handler(&mut self.services);
            if map.is_cleared() {
                if let Some(stage) = &stage {
                    self.handlers.stage_select.mark_cleared(stage);
                }
            }
        }
        if let Some(mut meter) = self.handlers.meter.take() {
            meter.stop_handler(&mut self.services);
        }
        // A map entered next must not receive the old map's waiting fades.
        self.services.fade.cancel_queued(HandlerKey::Map);
        self.services.flags.unpause();

        info!(
            stage = stage.as_deref().unwrap_or_default(),
            transfer = ?transfer.as_ref().map(|t| t.kind),
            "map_ended"
        );

        if let Some(HandlerTransfer {
            kind: TransferKind::Stage,
            name: Some(next),
        }) = &transfer
        {
            match self.enter_stage(next) {
                Ok(()) => return,
                Err(error) => error!(stage = %next, error = %error, "stage_enter_failed"),
            }
        }
        if let Some(stage) = &stage {
            self.handlers.stage_select.focus(stage);
        }
        self.handlers.stage_select.start_handler(&mut self.services);
    }

    /// Feeds the player's health into the meter whenever it changes.
    fn sync_meter(&mut self) {
        let (Some(map), Some(meter)) = (&self.handlers.map, &mut self.handlers.meter) else {
            return;
        };
        let health = map.player().health();
        if self.synced_health != Some(health) {
            meter.set_value(health);
            self.synced_health = Some(health);
        }
    }
}
