//! Recording collaborators shared by handler tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::content::{
    EntityPlacement, Join, JoinDirection, JoinKind, Map, MusicTrack, Screen, TeleportInfo,
    TileDef, TileFrame, Tilemap, Tileset,
};

use super::geometry::{PointI, RectF, Vec2, ViewportSize};
use super::input::HeldInputs;
use super::services::{
    AudioBackend, EntityHandle, EntitySignal, EntityWorld, PlayerEntity, Services, SpriteBatch,
    StateMessage, WorldSignal,
};

pub type Shared<T> = Rc<RefCell<T>>;

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCall {
    PlayMusic(MusicTrack),
    StopMusic(MusicTrack),
    PlayNsf(u32),
    StopNsf,
    Sound(String),
}

pub struct RecordingAudio {
    pub log: Shared<Vec<AudioCall>>,
}

impl AudioBackend for RecordingAudio {
    fn play_music(&mut self, track: &MusicTrack) {
        self.log.borrow_mut().push(AudioCall::PlayMusic(track.clone()));
    }

    fn stop_music(&mut self, track: &MusicTrack) {
        self.log.borrow_mut().push(AudioCall::StopMusic(track.clone()));
    }

    fn play_nsf(&mut self, track: u32) {
        self.log.borrow_mut().push(AudioCall::PlayNsf(track));
    }

    fn stop_nsf(&mut self) {
        self.log.borrow_mut().push(AudioCall::StopNsf);
    }

    fn play_sound(&mut self, name: &str) {
        self.log.borrow_mut().push(AudioCall::Sound(name.to_string()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldCall {
    Spawn { screen: String, name: String },
    Remove(EntityHandle),
    StopAll,
}

#[derive(Debug, Default)]
pub struct WorldState {
    pub calls: Vec<WorldCall>,
    pub live: BTreeMap<EntityHandle, Vec2>,
    pub next_handle: u32,
    pub pending_signals: Vec<WorldSignal>,
}

pub struct RecordingWorld {
    pub state: Shared<WorldState>,
}

impl EntityWorld for RecordingWorld {
    fn spawn(&mut self, screen: &str, placement: &EntityPlacement) -> EntityHandle {
        let mut state = self.state.borrow_mut();
        state.next_handle += 1;
        let handle = EntityHandle(state.next_handle);
        state.live.insert(handle, placement.position.to_vec2());
        state.calls.push(WorldCall::Spawn {
            screen: screen.to_string(),
            name: placement.name.clone(),
        });
        handle
    }

    fn remove(&mut self, handle: EntityHandle) {
        let mut state = self.state.borrow_mut();
        state.live.remove(&handle);
        state.calls.push(WorldCall::Remove(handle));
    }

    fn stop_all(&mut self) {
        let mut state = self.state.borrow_mut();
        state.live.clear();
        state.calls.push(WorldCall::StopAll);
    }

    fn update(&mut self, _screen: &str, _player: Vec2) -> Vec<WorldSignal> {
        std::mem::take(&mut self.state.borrow_mut().pending_signals)
    }

    fn position(&self, handle: EntityHandle) -> Option<Vec2> {
        self.state.borrow().live.get(&handle).copied()
    }
}

#[derive(Debug)]
pub struct PlayerState {
    pub position: Vec2,
    pub visible: bool,
    pub can_move: bool,
    pub paused: bool,
    pub input_paused: bool,
    pub messages: Vec<StateMessage>,
    pub started_on: Vec<String>,
    pub screen: String,
    pub resets: u32,
    pub stops: u32,
    pub weapon: Option<String>,
    pub health: f32,
    pub max_health: f32,
    pub descending: bool,
    pub fall_speed: f32,
    pub pending: Vec<EntitySignal>,
    pub thinks: u32,
    /// Thinks between `TeleportBlink` and the answering state change.
    pub blink_delay: u32,
    pub blink_countdown: Option<u32>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            visible: true,
            can_move: true,
            paused: false,
            input_paused: false,
            messages: Vec::new(),
            started_on: Vec::new(),
            screen: String::new(),
            resets: 0,
            stops: 0,
            weapon: None,
            health: 28.0,
            max_health: 28.0,
            descending: false,
            fall_speed: 8.0,
            pending: Vec::new(),
            thinks: 0,
            blink_delay: 2,
            blink_countdown: None,
        }
    }
}

/// Falls `fall_speed` px per think after `Teleport`; answers `TeleportBlink`
/// with a state change `blink_delay` thinks later.
pub struct FakePlayer {
    pub state: Shared<PlayerState>,
}

impl PlayerEntity for FakePlayer {
    fn reset(&mut self) {
        let mut state = self.state.borrow_mut();
        state.resets += 1;
        state.descending = false;
        state.pending.clear();
        state.blink_countdown = None;
        state.paused = false;
        state.can_move = true;
    }

    fn start(&mut self, screen: &str) {
        let mut state = self.state.borrow_mut();
        state.started_on.push(screen.to_string());
        state.screen = screen.to_string();
    }

    fn stop(&mut self) {
        self.state.borrow_mut().stops += 1;
    }

    fn set_screen(&mut self, screen: &str) {
        self.state.borrow_mut().screen = screen.to_string();
    }

    fn position(&self) -> Vec2 {
        self.state.borrow().position
    }

    fn set_position(&mut self, position: Vec2) {
        self.state.borrow_mut().position = position;
    }

    fn set_visible(&mut self, visible: bool) {
        self.state.borrow_mut().visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.state.borrow().visible
    }

    fn set_can_move(&mut self, can_move: bool) {
        self.state.borrow_mut().can_move = can_move;
    }

    fn set_paused(&mut self, paused: bool) {
        self.state.borrow_mut().paused = paused;
    }

    fn set_input_paused(&mut self, paused: bool) {
        self.state.borrow_mut().input_paused = paused;
    }

    fn input_paused(&self) -> bool {
        self.state.borrow().input_paused
    }

    fn send_state(&mut self, message: StateMessage) {
        let mut state = self.state.borrow_mut();
        let delay = state.blink_delay;
        state.messages.push(message);
        match message {
            StateMessage::Teleport => state.descending = true,
            StateMessage::TeleportEnd => state.descending = false,
            StateMessage::TeleportBlink => state.blink_countdown = Some(delay),
        }
    }

    fn set_weapon(&mut self, weapon: &str) {
        self.state.borrow_mut().weapon = Some(weapon.to_string());
    }

    fn health(&self) -> f32 {
        self.state.borrow().health
    }

    fn max_health(&self) -> f32 {
        self.state.borrow().max_health
    }

    fn think(&mut self, _held: &HeldInputs) -> Vec<EntitySignal> {
        let mut state = self.state.borrow_mut();
        state.thinks += 1;
        if state.paused {
            return Vec::new();
        }
        if state.descending {
            let fall = state.fall_speed;
            state.position.y += fall;
        }
        match state.blink_countdown {
            Some(0) => {
                state.blink_countdown = None;
                state
                    .pending
                    .push(EntitySignal::StateChanged("TeleportBlink".to_string()));
            }
            Some(remaining) => state.blink_countdown = Some(remaining - 1),
            None => {}
        }
        std::mem::take(&mut state.pending)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Tile { tile: u16, cell: u32, x: i32, y: i32 },
    Sprite { name: String, x: i32, y: i32 },
    Rect { x: i32, y: i32, width: u32, height: u32 },
    Text { text: String, x: i32, y: i32 },
}

#[derive(Debug, Default)]
pub struct RecordingBatch {
    pub calls: Vec<DrawCall>,
    pub opacities: Vec<f32>,
}

impl RecordingBatch {
    pub fn texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn sprites(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Sprite { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tile_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Tile { .. }))
            .count()
    }
}

impl SpriteBatch for RecordingBatch {
    fn draw_tile(&mut self, tile: u16, cell: u32, x: i32, y: i32, _size: u32, opacity: f32) {
        self.calls.push(DrawCall::Tile { tile, cell, x, y });
        self.opacities.push(opacity);
    }

    fn draw_sprite(&mut self, name: &str, x: i32, y: i32, opacity: f32) {
        self.calls.push(DrawCall::Sprite {
            name: name.to_string(),
            x,
            y,
        });
        self.opacities.push(opacity);
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, _color: [u8; 4], opacity: f32) {
        self.calls.push(DrawCall::Rect {
            x,
            y,
            width,
            height,
        });
        self.opacities.push(opacity);
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32, opacity: f32) {
        self.calls.push(DrawCall::Text {
            text: text.to_string(),
            x,
            y,
        });
        self.opacities.push(opacity);
    }
}

pub struct Harness {
    pub services: Services,
    pub audio: Shared<Vec<AudioCall>>,
    pub world: Shared<WorldState>,
}

impl Harness {
    pub fn new() -> Self {
        let audio = Rc::new(RefCell::new(Vec::new()));
        let world = Rc::new(RefCell::new(WorldState::default()));
        let services = Services::new(
            Box::new(RecordingAudio { log: audio.clone() }),
            Box::new(RecordingWorld {
                state: world.clone(),
            }),
            ViewportSize::default(),
        );
        Self {
            services,
            audio,
            world,
        }
    }

    pub fn audio_calls(&self) -> Vec<AudioCall> {
        self.audio.borrow().clone()
    }
}

pub fn fake_player() -> (Box<dyn PlayerEntity>, Shared<PlayerState>) {
    let state = Rc::new(RefCell::new(PlayerState::default()));
    (
        Box::new(FakePlayer {
            state: state.clone(),
        }),
        state,
    )
}

pub fn stage_music() -> MusicTrack {
    MusicTrack {
        intro: Some("music/intro.ogg".to_string()),
        looped: Some("music/stage.ogg".to_string()),
    }
}

pub fn boss_music() -> MusicTrack {
    MusicTrack {
        intro: None,
        looped: Some("music/boss.ogg".to_string()),
    }
}

fn screen(name: &str) -> Screen {
    Screen {
        name: name.to_string(),
        tiles: Tilemap::filled(16, 14, 0),
        teleports: Vec::new(),
        entities: Vec::new(),
        music: None,
        nsf_track: None,
    }
}

/// Three 256x224 screens: `start` joins `east` to the right, `east` teleports
/// into `tower`. `start` also holds a same-screen teleport pad. `east` is a
/// checkpoint.
pub fn sample_map() -> Map {
    let mut start = screen("start");
    start.entities.push(EntityPlacement {
        name: "metool".to_string(),
        position: PointI::new(128, 176),
        boss: false,
    });
    start.teleports.push(TeleportInfo {
        source: RectF::new(160.0, 96.0, 16.0, 16.0),
        target_screen: "start".to_string(),
        target: PointI::new(40, 160),
    });

    let mut east = screen("east");
    east.teleports.push(TeleportInfo {
        source: RectF::new(96.0, 96.0, 16.0, 16.0),
        target_screen: "tower".to_string(),
        target: PointI::new(128, 160),
    });

    let mut tower = screen("tower");
    tower.music = Some(boss_music());
    tower.entities.push(EntityPlacement {
        name: "guardian".to_string(),
        position: PointI::new(200, 160),
        boss: true,
    });

    let mut tiles = BTreeMap::new();
    tiles.insert(
        0,
        TileDef {
            id: 0,
            name: "sky".to_string(),
            frames: vec![TileFrame {
                cell: 0,
                duration: 0,
            }],
        },
    );
    tiles.insert(
        1,
        TileDef {
            id: 1,
            name: "water".to_string(),
            frames: vec![
                TileFrame {
                    cell: 4,
                    duration: 8,
                },
                TileFrame {
                    cell: 5,
                    duration: 8,
                },
            ],
        },
    );

    let mut screens = BTreeMap::new();
    for screen in [start, east, tower] {
        screens.insert(screen.name.clone(), screen);
    }
    let mut continue_points = BTreeMap::new();
    continue_points.insert("east".to_string(), PointI::new(32, 160));

    Map {
        name: "Sample".to_string(),
        screens,
        start_screen: "start".to_string(),
        start: PointI::new(64, 160),
        continue_points,
        tileset: Tileset {
            tile_size: 16,
            sheet: None,
            tiles,
        },
        music: Some(stage_music()),
        nsf_track: None,
        joins: vec![Join {
            kind: JoinKind::Vertical,
            screen_one: "start".to_string(),
            screen_two: "east".to_string(),
            offset_one: 0,
            offset_two: 0,
            size: 14,
            direction: JoinDirection::Both,
        }],
    }
}
