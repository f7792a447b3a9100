use tracing::debug;

use crate::app::geometry::ViewportSize;
use crate::app::input::{GameInput, InputEvent};
use crate::app::services::{PlayerEntity, Services, SpriteBatch};
use crate::content::PauseScreenDef;

const PANEL_COLOR: [u8; 4] = [12, 18, 60, 255];
const MENU_X: i32 = 48;
const MENU_Y: i32 = 40;
const MENU_LINE_HEIGHT: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseEvent {
    Unpaused,
}

/// Weapon select menu shown while the map is paused.
#[derive(Debug, Clone)]
pub struct PauseScreen {
    weapons: Vec<String>,
    sound: Option<String>,
    cursor: usize,
    running: bool,
}

impl PauseScreen {
    pub fn new(def: &PauseScreenDef) -> Self {
        Self {
            weapons: def.weapons.clone(),
            sound: def.sound.clone(),
            cursor: 0,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected_weapon(&self) -> Option<&str> {
        self.weapons.get(self.cursor).map(String::as_str)
    }

    pub fn start_handler(&mut self) {
        self.running = true;
    }

    pub fn stop_handler(&mut self) {
        self.running = false;
    }

    pub fn sound(&self, services: &mut Services) {
        if let Some(sound) = &self.sound {
            services.audio.play_sound(sound);
        }
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Option<PauseEvent> {
        if !self.running || !event.pressed {
            return None;
        }
        let count = self.weapons.len();
        match event.input {
            GameInput::Up if count > 0 => {
                self.cursor = (self.cursor + count - 1) % count;
                None
            }
            GameInput::Down if count > 0 => {
                self.cursor = (self.cursor + 1) % count;
                None
            }
            GameInput::Start => Some(PauseEvent::Unpaused),
            _ => None,
        }
    }

    pub fn apply_weapon(&self, player: &mut dyn PlayerEntity) {
        if let Some(weapon) = self.selected_weapon() {
            debug!(weapon, "weapon_selected");
            player.set_weapon(weapon);
        }
    }

    pub fn draw(&self, batch: &mut dyn SpriteBatch, viewport: ViewportSize, opacity: f32) {
        batch.fill_rect(
            0,
            0,
            viewport.pixels_across,
            viewport.pixels_down,
            PANEL_COLOR,
            opacity,
        );
        batch.draw_text("WEAPONS", MENU_X, MENU_Y - MENU_LINE_HEIGHT, opacity);
        for (index, weapon) in self.weapons.iter().enumerate() {
            let marker = if index == self.cursor { ">" } else { " " };
            let line = format!("{marker} {}", weapon.to_ascii_uppercase());
            batch.draw_text(
                &line,
                MENU_X,
                MENU_Y + index as i32 * MENU_LINE_HEIGHT,
                opacity,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::{fake_player, AudioCall, Harness, RecordingBatch};

    fn pause_screen() -> PauseScreen {
        PauseScreen::new(&PauseScreenDef {
            sound: Some("pause".to_string()),
            weapons: vec!["Buster".to_string(), "Fire".to_string(), "Ice".to_string()],
        })
    }

    #[test]
    fn cursor_wraps_and_start_unpauses() {
        let mut screen = pause_screen();
        assert_eq!(
            screen.handle_input(InputEvent::pressed(GameInput::Start)),
            None
        );

        screen.start_handler();
        screen.handle_input(InputEvent::pressed(GameInput::Up));
        assert_eq!(screen.selected_weapon(), Some("Ice"));
        screen.handle_input(InputEvent::pressed(GameInput::Down));
        screen.handle_input(InputEvent::released(GameInput::Down));
        screen.handle_input(InputEvent::pressed(GameInput::Down));
        assert_eq!(screen.selected_weapon(), Some("Fire"));
        assert_eq!(
            screen.handle_input(InputEvent::pressed(GameInput::Start)),
            Some(PauseEvent::Unpaused)
        );
    }

    #[test]
    fn apply_weapon_and_sound_reach_collaborators() {
        let mut harness = Harness::new();
        let (mut player, state) = fake_player();
        let mut screen = pause_screen();
        screen.start_handler();
        screen.handle_input(InputEvent::pressed(GameInput::Down));

        screen.apply_weapon(player.as_mut());
        screen.sound(&mut harness.services);

        assert_eq!(state.borrow().weapon.as_deref(), Some("Fire"));
        assert_eq!(
            harness.audio_calls(),
            vec![AudioCall::Sound("pause".to_string())]
        );
    }

    #[test]
    fn draw_marks_cursor_row() {
        let screen = pause_screen();
        let mut batch = RecordingBatch::default();
        screen.draw(&mut batch, ViewportSize::default(), 1.0);
        assert_eq!(
            batch.texts(),
            vec!["WEAPONS", "> BUSTER", "  FIRE", "  ICE"]
        );
    }
}
