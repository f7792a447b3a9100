use serde::{Deserialize, Serialize};

use super::fade::FadeEvent;
use super::input::InputEvent;
use super::services::{Services, SpriteBatch};

/// Identifies each top-level handler on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKey {
    StageSelect,
    Map,
    HealthMeter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
    StageSelect,
    Stage,
    Credits,
}

/// Where control goes after a map ends. Owned by whoever configured the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerTransfer {
    pub kind: TransferKind,
    pub name: Option<String>,
}

impl HandlerTransfer {
    pub fn stage_select() -> Self {
        Self {
            kind: TransferKind::StageSelect,
            name: None,
        }
    }

    pub fn stage(name: impl Into<String>) -> Self {
        Self {
            kind: TransferKind::Stage,
            name: Some(name.into()),
        }
    }

    /// Accepts `stageselect`, `credits` or `stage:<name>`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("stageselect") {
            return Some(Self::stage_select());
        }
        if raw.eq_ignore_ascii_case("credits") {
            return Some(Self {
                kind: TransferKind::Credits,
                name: None,
            });
        }
        let (prefix, name) = raw.split_once(':')?;
        if prefix.eq_ignore_ascii_case("stage") && !name.trim().is_empty() {
            return Some(Self::stage(name.trim()));
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HandlerCommand {
    #[default]
    None,
    /// The handler is finished. `None` means nobody was configured to take over.
    End(Option<HandlerTransfer>),
    SelectStage(usize),
}

/// A participant in the per-frame tick/render/input pump.
///
/// Handlers subscribe themselves on `services.bus` when started and must leave
/// it when stopped. `stop_handler` may be called more than once.
pub trait GameHandler {
    fn game_tick(&mut self, services: &mut Services) -> HandlerCommand;

    fn game_render(&self, batch: &mut dyn SpriteBatch, services: &Services);

    fn game_input(&mut self, _event: InputEvent, _services: &mut Services) -> HandlerCommand {
        HandlerCommand::None
    }

    fn fade_event(&mut self, _event: FadeEvent, _services: &mut Services) -> HandlerCommand {
        HandlerCommand::None
    }

    fn stop_handler(&mut self, services: &mut Services);
}
