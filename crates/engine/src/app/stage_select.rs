use tracing::info;

use crate::content::StageDef;

use super::bus::Channel;
use super::handler::{GameHandler, HandlerCommand, HandlerKey};
use super::input::{GameInput, InputEvent};
use super::services::{Services, SpriteBatch};

const TITLE: &str = "STAGE SELECT";
const MENU_X: i32 = 64;
const MENU_Y: i32 = 72;
const MENU_LINE_HEIGHT: i32 = 12;
const BACKDROP_COLOR: [u8; 4] = [0x10, 0x18, 0x40, 0xff];

/// First handler after boot: a vertical list of stages with a cursor.
#[derive(Debug, Clone)]
pub struct StageSelect {
    stages: Vec<String>,
    cleared: Vec<bool>,
    cursor: usize,
    running: bool,
}

impl StageSelect {
    pub fn new(stages: &[StageDef]) -> Self {
        Self {
            stages: stages.iter().map(|stage| stage.name.clone()).collect(),
            cleared: vec![false; stages.len()],
            cursor: 0,
            running: false,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stage_name(&self, index: usize) -> Option<&str> {
        self.stages.get(index).map(String::as_str)
    }

    pub fn is_cleared(&self, name: &str) -> bool {
        self.index_of(name)
            .and_then(|index| self.cleared.get(index).copied())
            .unwrap_or(false)
    }

    pub fn mark_cleared(&mut self, name: &str) {
        if let Some(index) = self.index_of(name) {
            self.cleared[index] = true;
        }
    }

    /// Puts the cursor on `name`, if it is listed.
    pub fn focus(&mut self, name: &str) {
        if let Some(index) = self.index_of(name) {
            self.cursor = index;
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|stage| stage == name)
    }

    pub fn start_handler(&mut self, services: &mut Services) {
        services.bus.subscribe(Channel::Render, HandlerKey::StageSelect);
        services.bus.subscribe(Channel::Input, HandlerKey::StageSelect);
        self.running = true;
        info!(stages = self.stages.len(), "stage_select_started");
    }
}

impl GameHandler for StageSelect {
    fn game_tick(&mut self, _services: &mut Services) -> HandlerCommand {
        HandlerCommand::None
    }

    fn game_render(&self, batch: &mut dyn SpriteBatch, services: &Services) {
        let opacity = services.fade.opacity();
        batch.fill_rect(
            0,
            0,
            services.viewport.pixels_across,
            services.viewport.pixels_down,
            BACKDROP_COLOR,
            opacity,
        );
        batch.draw_text(TITLE, MENU_X, MENU_Y - 2 * MENU_LINE_HEIGHT, opacity);
        for (index, name) in self.stages.iter().enumerate() {
            let marker = if index == self.cursor { '>' } else { ' ' };
            let cleared = if self.cleared[index] { " *" } else { "" };
            let line = format!("{marker} {}{cleared}", name.to_ascii_uppercase());
            batch.draw_text(
                &line,
                MENU_X,
                MENU_Y + index as i32 * MENU_LINE_HEIGHT,
                opacity,
            );
        }
    }

    fn game_input(&mut self, event: InputEvent, _services: &mut Services) -> HandlerCommand {
        let count = self.stages.len();
        if !self.running || !event.pressed || count == 0 {
            return HandlerCommand::None;
        }
        match event.input {
            GameInput::Up | GameInput::Left => {
                self.cursor = (self.cursor + count - 1) % count;
                HandlerCommand::None
            }
            GameInput::Down | GameInput::Right | GameInput::Select => {
                self.cursor = (self.cursor + 1) % count;
                HandlerCommand::None
            }
            GameInput::Start | GameInput::Jump => HandlerCommand::SelectStage(self.cursor),
            GameInput::Shoot => HandlerCommand::None,
        }
    }

    fn stop_handler(&mut self, services: &mut Services) {
        services.bus.unsubscribe_all(HandlerKey::StageSelect);
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::app::test_support::{Harness, RecordingBatch};

    fn stages() -> Vec<StageDef> {
        ["Intro", "Tower", "Sewer"]
            .into_iter()
            .map(|name| StageDef {
                name: name.to_string(),
                map: PathBuf::from(format!("{name}.xml")),
                win: None,
                lose: None,
            })
            .collect()
    }

    #[test]
    fn input_is_ignored_until_started() {
        let mut harness = Harness::new();
        let mut select = StageSelect::new(&stages());
        let command = select.game_input(InputEvent::pressed(GameInput::Start), &mut harness.services);
        assert_eq!(command, HandlerCommand::None);
    }

    #[test]
    fn cursor_wraps_and_start_selects() {
        let mut harness = Harness::new();
        let mut select = StageSelect::new(&stages());
        select.start_handler(&mut harness.services);

        select.game_input(InputEvent::pressed(GameInput::Up), &mut harness.services);
        assert_eq!(select.cursor(), 2);
        select.game_input(InputEvent::released(GameInput::Down), &mut harness.services);
        assert_eq!(select.cursor(), 2);
        select.game_input(InputEvent::pressed(GameInput::Down), &mut harness.services);
        assert_eq!(select.cursor(), 0);

        let command = select.game_input(InputEvent::pressed(GameInput::Start), &mut harness.services);
        assert_eq!(command, HandlerCommand::SelectStage(0));
    }

    #[test]
    fn cleared_stages_are_marked_in_the_menu() {
        let mut harness = Harness::new();
        let mut select = StageSelect::new(&stages());
        select.start_handler(&mut harness.services);
        select.mark_cleared("Tower");
        select.focus("Tower");
        assert!(select.is_cleared("Tower"));
        assert!(!select.is_cleared("Intro"));

        let mut batch = RecordingBatch::default();
        select.game_render(&mut batch, &harness.services);
        assert_eq!(
            batch.texts(),
            vec![TITLE, "  INTRO", "> TOWER *", "  SEWER"]
        );
    }

    #[test]
    fn stop_handler_leaves_the_bus() {
        let mut harness = Harness::new();
        let mut select = StageSelect::new(&stages());
        select.start_handler(&mut harness.services);
        assert!(harness
            .services
            .bus
            .is_subscribed(Channel::Input, HandlerKey::StageSelect));
        select.stop_handler(&mut harness.services);
        assert!(harness.services.bus.registered().is_empty());
        assert!(!select.is_running());
    }
}
