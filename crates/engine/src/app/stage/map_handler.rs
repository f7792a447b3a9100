use std::collections::BTreeMap;
use std::mem;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::app::bus::Channel;
use crate::app::consts::{
    MAP_DEAD_FRAMES, PLAYER_START_LIVES, READY_BLINK_CYCLE_FRAMES, READY_BLINK_FRAMES,
};
use crate::app::fade::{FadeCue, FadeEvent};
use crate::app::geometry::{PointI, Vec2};
use crate::app::handler::{GameHandler, HandlerCommand, HandlerKey, HandlerTransfer};
use crate::app::input::{GameInput, InputEvent};
use crate::app::services::{
    EntitySignal, PlayerEntity, Services, SpriteBatch, StateMessage,
};
use crate::content::{Map, MusicTrack, TeleportInfo};

use super::gameplay::GamePlay;
use super::join_handler::JoinHandler;
use super::pause_screen::{PauseEvent, PauseScreen};
use super::screen_handler::{camera_for, ScreenEvent, ScreenHandler};
use super::tiles::TileAnimator;

const PLAYER_SPRITE: &str = "player";
const READY_TEXT: &str = "READY";
const PAUSE_TEXT: &str = "PAUSE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("map '{map}' has no screen named '{screen}' to start on")]
    MissingStartScreen { map: String, screen: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyBlink {
    frame: u32,
}

impl ReadyBlink {
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// On for the first half of each cycle.
    pub fn overlay_visible(&self) -> bool {
        self.frame % READY_BLINK_CYCLE_FRAMES < READY_BLINK_CYCLE_FRAMES / 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayPhase {
    /// The player drops from the top of the screen to the start point.
    BeamingIn,
    Active,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TeleportPhase {
    AwaitingStateChange(TeleportInfo),
    Fading(TeleportInfo),
    FadingIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseMode {
    /// No pause screen: the whole game is frozen where it stands.
    InPlace,
    Opening,
    Open,
    Closing,
    Resuming,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapState {
    Idle,
    Starting(ReadyBlink),
    Playing(PlayPhase),
    Scrolling(Box<JoinHandler>),
    Teleporting(TeleportPhase),
    Dead { frames: u32 },
    DeathFade,
    Paused(PauseMode),
    Ended,
}

/// Runs one map: start blink, screen scrolling, teleports, pause, death and
/// the hand-off to whatever comes after the map.
pub struct MapHandler {
    map: Map,
    screens: BTreeMap<String, ScreenHandler>,
    current_screen: String,
    gameplay: GamePlay,
    pause_screen: Option<PauseScreen>,
    tiles: TileAnimator,
    state: MapState,
    lives: i32,
    start_screen: String,
    start: PointI,
    teleporting: bool,
    /// Death signalled while a teleport fade was running.
    death_pending: bool,
    attached: bool,
    win_handler: Option<HandlerTransfer>,
    lose_handler: Option<HandlerTransfer>,
    resets: u32,
    scrolls_completed: u32,
    cleared: bool,
}

impl MapHandler {
    pub fn new(map: Map, player: Box<dyn PlayerEntity>) -> Self {
        let tile_size = map.tileset.tile_size;
        let screens = map
            .screens
            .iter()
            .map(|(name, screen)| {
                let joins = map.joins_for(name).cloned().collect();
                (
                    name.clone(),
                    ScreenHandler::new(screen.clone(), joins, tile_size),
                )
            })
            .collect();
        let start_screen = map.start_screen_name().to_string();
        Self {
            tiles: TileAnimator::new(&map.tileset),
            screens,
            current_screen: start_screen.clone(),
            start: map.start,
            start_screen,
            map,
            gameplay: GamePlay::new(player),
            pause_screen: None,
            state: MapState::Idle,
            lives: PLAYER_START_LIVES,
            teleporting: false,
            death_pending: false,
            attached: false,
            win_handler: None,
            lose_handler: None,
            resets: 0,
            scrolls_completed: 0,
            cleared: false,
        }
    }

    pub fn with_pause_screen(mut self, pause_screen: Option<PauseScreen>) -> Self {
        self.pause_screen = pause_screen;
        self
    }

    pub fn with_win_handler(mut self, transfer: Option<HandlerTransfer>) -> Self {
        self.win_handler = transfer;
        self
    }

    pub fn with_lose_handler(mut self, transfer: Option<HandlerTransfer>) -> Self {
        self.lose_handler = transfer;
        self
    }

    pub fn name(&self) -> &str {
        &self.map.name
    }

    pub fn state(&self) -> &MapState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, MapState::Playing(_))
    }

    pub fn current_screen(&self) -> &str {
        &self.current_screen
    }

    pub fn screen(&self, name: &str) -> Option<&ScreenHandler> {
        self.screens.get(name)
    }

    pub fn lives(&self) -> i32 {
        self.lives
    }

    pub fn set_lives(&mut self, lives: i32) {
        self.lives = lives;
    }

    pub fn player(&self) -> &dyn PlayerEntity {
        self.gameplay.player()
    }

    /// Screen and point the next start (or restart) uses.
    pub fn continue_point(&self) -> (&str, PointI) {
        (&self.start_screen, self.start)
    }

    pub fn is_teleporting(&self) -> bool {
        self.teleporting
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Whether this run beat the map's boss.
    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    pub fn scrolls_completed(&self) -> u32 {
        self.scrolls_completed
    }

    #[cfg(test)]
    fn tile_ticks(&self) -> u64 {
        self.tiles.ticks()
    }

    pub fn start_handler(&mut self, services: &mut Services) -> Result<(), MapError> {
        if !self.screens.contains_key(&self.start_screen) {
            return Err(MapError::MissingStartScreen {
                map: self.map.name.clone(),
                screen: self.start_screen.clone(),
            });
        }

        self.gameplay.player_mut().reset();
        self.current_screen = self.start_screen.clone();
        self.teleporting = false;
        self.death_pending = false;
        if let Some(screen) = self.screens.get_mut(&self.current_screen) {
            screen.start(services);
        }
        if let Some(track) = self.effective_music(&self.current_screen) {
            services.audio.play_music(&track);
        }
        if let Some(track) = self.effective_nsf(&self.current_screen) {
            services.audio.play_nsf(track);
        }

        let player = self.gameplay.player_mut();
        player.set_input_paused(true);
        player.set_visible(false);

        for channel in [Channel::Tick, Channel::Render, Channel::Input] {
            services.bus.subscribe(channel, HandlerKey::Map);
        }
        self.attached = true;
        self.state = MapState::Starting(ReadyBlink { frame: 0 });
        info!(
            map = %self.map.name,
            screen = %self.current_screen,
            lives = self.lives,
            "map_started"
        );
        Ok(())
    }

    fn effective_music(&self, screen: &str) -> Option<MusicTrack> {
        self.screens
            .get(screen)
            .and_then(ScreenHandler::music)
            .or(self.map.music.as_ref())
            .filter(|track| !track.is_empty())
            .cloned()
    }

    fn effective_nsf(&self, screen: &str) -> Option<u32> {
        self.screens
            .get(screen)
            .and_then(ScreenHandler::nsf_track)
            .or(self.map.nsf_track)
            .filter(|track| *track > 0)
    }

    fn stop_all_music(&self, services: &mut Services) {
        if let Some(track) = &self.map.music {
            services.audio.stop_music(track);
        }
        if let Some(track) = self
            .screens
            .get(&self.current_screen)
            .and_then(ScreenHandler::music)
        {
            if Some(track) != self.map.music.as_ref() {
                services.audio.stop_music(track);
            }
        }
        services.audio.stop_nsf();
    }

    fn tick_blink(&mut self, mut blink: ReadyBlink) -> MapState {
        blink.frame += 1;
        if blink.frame < READY_BLINK_FRAMES {
            return MapState::Starting(blink);
        }
        self.begin_play()
    }

    fn begin_play(&mut self) -> MapState {
        self.gameplay.start_handler();
        let start_x = self.start.x as f32;
        let player = self.gameplay.player_mut();
        player.start(&self.current_screen);
        player.set_visible(true);
        player.set_position(Vec2::new(start_x, 0.0));
        player.send_state(StateMessage::Teleport);
        debug!(screen = %self.current_screen, "ready_blink_done");
        MapState::Playing(PlayPhase::BeamingIn)
    }

    fn tick_beaming_in(&mut self) -> MapState {
        let target = self.start.to_vec2();
        let player = self.gameplay.player_mut();
        if player.position().y < target.y {
            return MapState::Playing(PlayPhase::BeamingIn);
        }
        player.set_position(target);
        player.send_state(StateMessage::TeleportEnd);
        player.set_input_paused(false);
        info!(screen = %self.current_screen, "play_started");
        MapState::Playing(PlayPhase::Active)
    }

    fn update_current_screen(&mut self, services: &mut Services) -> Vec<ScreenEvent> {
        let position = self.gameplay.player().position();
        self.screens
            .get_mut(&self.current_screen)
            .map(|screen| screen.update(position, services))
            .unwrap_or_default()
    }

    fn tick_active(&mut self, services: &mut Services, command: &mut HandlerCommand) -> MapState {
        let mut next = MapState::Playing(PlayPhase::Active);
        for event in self.update_current_screen(services) {
            let idle = next == MapState::Playing(PlayPhase::Active);
            match event {
                ScreenEvent::JoinTriggered(join) if idle => {
                    next = self.begin_scroll(join);
                }
                ScreenEvent::Teleport(info) if idle => {
                    if let Some(state) = self.begin_teleport(info) {
                        next = state;
                    }
                }
                ScreenEvent::BossDefeated => *command = self.boss_defeated(),
                _ => {}
            }
        }
        next
    }

    fn tick_teleport_wait(
        &mut self,
        info: TeleportInfo,
        services: &mut Services,
        command: &mut HandlerCommand,
    ) -> MapState {
        for event in self.update_current_screen(services) {
            match event {
                // Only logged: the guard is already up.
                ScreenEvent::Teleport(other) => {
                    self.begin_teleport(other);
                }
                ScreenEvent::BossDefeated => *command = self.boss_defeated(),
                ScreenEvent::JoinTriggered(_) => {}
            }
        }
        MapState::Teleporting(TeleportPhase::AwaitingStateChange(info))
    }

    fn begin_scroll(&mut self, mut join: JoinHandler) -> MapState {
        let Some(next_size) = self
            .screens
            .get(join.to_screen())
            .map(ScreenHandler::pixel_size)
        else {
            warn!(
                map = %self.map.name,
                screen = join.to_screen(),
                "scroll_target_missing"
            );
            return MapState::Playing(PlayPhase::Active);
        };
        let Some(current) = self.screens.get_mut(&self.current_screen) else {
            return MapState::Playing(PlayPhase::Active);
        };

        let player = self.gameplay.player_mut();
        player.set_paused(true);
        join.begin_scroll(current.pixel_size(), next_size, player.position());
        current.stop();
        info!(
            from = join.from_screen(),
            to = join.to_screen(),
            direction = ?join.direction(),
            "scroll_begin"
        );
        MapState::Scrolling(Box::new(join))
    }

    fn tick_scroll(&mut self, mut join: Box<JoinHandler>, services: &mut Services) -> MapState {
        let player = self.gameplay.player_mut();
        let mut position = player.position();
        let done = join.update(&mut position);
        player.set_position(position);
        if !done {
            return MapState::Scrolling(join);
        }
        self.scroll_done(&join, services)
    }

    fn scroll_done(&mut self, join: &JoinHandler, services: &mut Services) -> MapState {
        let player = self.gameplay.player_mut();
        player.set_paused(false);
        let arrived = join.translate_to_next(player.position());
        player.set_position(arrived);

        let next = join.to_screen().to_string();
        self.change_screen(&next, services);
        self.scrolls_completed += 1;
        if let Some(point) = self.map.continue_point(&next) {
            self.start_screen = next.clone();
            self.start = point;
            info!(screen = %next, x = point.x, y = point.y, "continue_point_reached");
        }
        info!(screen = %next, "scroll_done");
        MapState::Playing(PlayPhase::Active)
    }

    fn change_screen(&mut self, next: &str, services: &mut Services) {
        let previous = mem::replace(&mut self.current_screen, next.to_string());
        if let Some(old) = self.screens.get_mut(&previous) {
            old.clean(services);
        }

        let old_music = self.effective_music(&previous);
        let new_music = self.effective_music(next);
        if old_music != new_music {
            if let Some(track) = &old_music {
                services.audio.stop_music(track);
            }
            if let Some(track) = &new_music {
                services.audio.play_music(track);
            }
        }
        let old_nsf = self.effective_nsf(&previous);
        let new_nsf = self.effective_nsf(next);
        if old_nsf != new_nsf {
            services.audio.stop_nsf();
            if let Some(track) = new_nsf {
                services.audio.play_nsf(track);
            }
        }

        if let Some(screen) = self.screens.get_mut(next) {
            screen.start(services);
        }
        self.gameplay.player_mut().set_screen(next);
        debug!(from = %previous, to = %next, "screen_changed");
    }

    fn begin_teleport(&mut self, info: TeleportInfo) -> Option<MapState> {
        if self.teleporting {
            debug!(to = %info.target_screen, "teleport_ignored");
            return None;
        }
        if !self.screens.contains_key(&info.target_screen) {
            warn!(
                map = %self.map.name,
                screen = %info.target_screen,
                "teleport_target_missing"
            );
            return None;
        }
        self.teleporting = true;
        let player = self.gameplay.player_mut();
        player.set_can_move(false);
        player.send_state(StateMessage::TeleportBlink);
        info!(
            from = %self.current_screen,
            to = %info.target_screen,
            "teleport_begin"
        );
        Some(MapState::Teleporting(TeleportPhase::AwaitingStateChange(
            info,
        )))
    }

    fn continue_teleport(&mut self, info: TeleportInfo, services: &mut Services) -> MapState {
        if info.target_screen == self.current_screen {
            let player = self.gameplay.player_mut();
            player.set_position(info.target.to_vec2());
            return self.finish_teleport();
        }
        self.gameplay.player_mut().set_visible(false);
        services.fade.start(HandlerKey::Map, FadeCue::Teleport);
        MapState::Teleporting(TeleportPhase::Fading(info))
    }

    fn teleport_swap(&mut self, info: TeleportInfo, services: &mut Services) -> MapState {
        if let Some(screen) = self.screens.get_mut(&self.current_screen) {
            screen.stop();
        }
        self.change_screen(&info.target_screen, services);
        self.gameplay
            .player_mut()
            .set_position(info.target.to_vec2());
        MapState::Teleporting(TeleportPhase::FadingIn)
    }

    fn finish_teleport(&mut self) -> MapState {
        let player = self.gameplay.player_mut();
        player.set_visible(true);
        player.send_state(StateMessage::TeleportEnd);
        player.set_can_move(true);
        self.teleporting = false;
        info!(screen = %self.current_screen, "teleport_end");
        MapState::Playing(PlayPhase::Active)
    }

    fn handle_player_signal(&mut self, signal: EntitySignal, services: &mut Services) {
        match signal {
            EntitySignal::Stopped => self.player_died(services),
            EntitySignal::StateChanged(_) => {
                if let MapState::Teleporting(TeleportPhase::AwaitingStateChange(info)) =
                    &self.state
                {
                    let info = info.clone();
                    self.state = self.continue_teleport(info, services);
                }
            }
        }
    }

    fn player_died(&mut self, services: &mut Services) {
        if matches!(
            self.state,
            MapState::Teleporting(TeleportPhase::Fading(_) | TeleportPhase::FadingIn)
        ) {
            // The screen swap under the fade has to finish first.
            self.death_pending = true;
            debug!(map = %self.map.name, "death_deferred");
            return;
        }
        let alive = matches!(
            self.state,
            MapState::Playing(_) | MapState::Teleporting(TeleportPhase::AwaitingStateChange(_))
        );
        if !alive {
            return;
        }
        self.stop_all_music(services);
        self.gameplay.stop_handler();
        self.teleporting = false;
        self.lives -= 1;
        self.state = MapState::Dead { frames: 0 };
        info!(map = %self.map.name, lives = self.lives, "player_died");
    }

    fn tick_dead(&mut self, frames: u32, services: &mut Services) -> MapState {
        let frames = frames + 1;
        if frames < MAP_DEAD_FRAMES {
            return MapState::Dead { frames };
        }
        services.fade.start(HandlerKey::Map, FadeCue::Death);
        MapState::DeathFade
    }

    fn reset(&mut self, services: &mut Services) -> HandlerCommand {
        self.resets += 1;
        self.stop_handler(services);
        services.entities.stop_all();

        if self.lives < 0 {
            self.lives = PLAYER_START_LIVES;
            self.start_screen = self.map.start_screen_name().to_string();
            self.start = self.map.start;
            self.state = MapState::Ended;
            info!(map = %self.map.name, outcome = "lose", "map_end");
            return HandlerCommand::End(self.lose_handler.clone());
        }

        info!(
            map = %self.map.name,
            screen = %self.start_screen,
            lives = self.lives,
            "map_reset"
        );
        match self.start_handler(services) {
            Ok(()) => HandlerCommand::None,
            Err(error) => {
                error!(error = %error, "map_restart_failed");
                self.state = MapState::Ended;
                HandlerCommand::End(None)
            }
        }
    }

    fn boss_defeated(&mut self) -> HandlerCommand {
        self.gameplay.end_play();
        self.cleared = true;
        info!(
            map = %self.map.name,
            has_win_handler = self.win_handler.is_some(),
            "boss_defeated"
        );
        match &self.win_handler {
            Some(transfer) => {
                info!(map = %self.map.name, outcome = "win", "map_end");
                HandlerCommand::End(Some(transfer.clone()))
            }
            None => HandlerCommand::None,
        }
    }

    fn pause(&mut self, services: &mut Services) {
        services.flags.pause();
        match &self.pause_screen {
            None => {
                self.state = MapState::Paused(PauseMode::InPlace);
                info!(map = %self.map.name, "paused");
            }
            Some(pause_screen) => {
                pause_screen.sound(services);
                services.fade.start(HandlerKey::Map, FadeCue::OpenPause);
                self.state = MapState::Paused(PauseMode::Opening);
            }
        }
    }

    fn open_pause_screen(&mut self) {
        self.gameplay.detach();
        if let Some(pause_screen) = &mut self.pause_screen {
            pause_screen.start_handler();
        }
        self.state = MapState::Paused(PauseMode::Open);
        info!(map = %self.map.name, "pause_opened");
    }

    fn close_pause_screen(&mut self) {
        self.gameplay.attach();
        if let Some(pause_screen) = &mut self.pause_screen {
            pause_screen.apply_weapon(self.gameplay.player_mut());
            pause_screen.stop_handler();
        }
        self.state = MapState::Paused(PauseMode::Resuming);
        info!(map = %self.map.name, "pause_closed");
    }

    fn draw_player(
        &self,
        batch: &mut dyn SpriteBatch,
        camera: PointI,
        draw_offset: PointI,
        opacity: f32,
    ) {
        let player = self.gameplay.player();
        if !player.is_visible() {
            return;
        }
        let position = player.position();
        batch.draw_sprite(
            PLAYER_SPRITE,
            position.x as i32 - camera.x + draw_offset.x,
            position.y as i32 - camera.y + draw_offset.y,
            opacity,
        );
    }

    fn draw_current(&self, batch: &mut dyn SpriteBatch, focus: Vec2, services: &Services, opacity: f32) {
        let Some(screen) = self.screens.get(&self.current_screen) else {
            return;
        };
        let camera = camera_for(focus, screen.pixel_size(), services.viewport);
        screen.draw_at(batch, camera, PointI::ZERO, &self.tiles, services, opacity);
        self.draw_player(batch, camera, PointI::ZERO, opacity);
    }

    fn draw_centered_text(&self, batch: &mut dyn SpriteBatch, text: &str, services: &Services, opacity: f32) {
        let x = services.viewport.pixels_across as i32 / 2 - text.len() as i32 * 2;
        let y = services.viewport.pixels_down as i32 / 2 - 4;
        batch.draw_text(text, x, y, opacity);
    }
}

impl GameHandler for MapHandler {
    fn game_tick(&mut self, services: &mut Services) -> HandlerCommand {
        if matches!(self.state, MapState::Idle | MapState::Ended) {
            return HandlerCommand::None;
        }

        let mut command = HandlerCommand::None;
        let state = mem::replace(&mut self.state, MapState::Idle);
        self.state = match state {
            MapState::Starting(blink) => self.tick_blink(blink),
            MapState::Playing(PlayPhase::BeamingIn) => self.tick_beaming_in(),
            MapState::Playing(PlayPhase::Active) => self.tick_active(services, &mut command),
            MapState::Scrolling(join) => self.tick_scroll(join, services),
            MapState::Teleporting(TeleportPhase::AwaitingStateChange(info)) => {
                self.tick_teleport_wait(info, services, &mut command)
            }
            MapState::Dead { frames } => self.tick_dead(frames, services),
            other => other,
        };

        let signals = self.gameplay.think(&services.held, &services.flags);
        for signal in signals {
            self.handle_player_signal(signal, services);
        }

        if matches!(command, HandlerCommand::End(_)) {
            self.state = MapState::Ended;
        }
        if self.state != MapState::Paused(PauseMode::Open) {
            self.tiles.advance();
        }
        command
    }

    fn game_render(&self, batch: &mut dyn SpriteBatch, services: &Services) {
        let opacity = services.fade.opacity();
        let player = self.gameplay.player().position();
        match &self.state {
            MapState::Idle | MapState::Ended => {}
            MapState::Starting(blink) => {
                self.draw_current(batch, self.start.to_vec2(), services, opacity);
                if blink.overlay_visible() {
                    self.draw_centered_text(batch, READY_TEXT, services, opacity);
                }
            }
            MapState::Scrolling(join) => {
                if let Some(current) = self.screens.get(&self.current_screen) {
                    current.draw_at(
                        batch,
                        join.current_camera(),
                        join.current_draw_offset(),
                        &self.tiles,
                        services,
                        opacity,
                    );
                }
                if let Some(next) = self.screens.get(join.to_screen()) {
                    next.draw_at(
                        batch,
                        join.next_screen_position(),
                        join.next_offset(),
                        &self.tiles,
                        services,
                        opacity,
                    );
                }
                self.draw_player(
                    batch,
                    join.current_camera(),
                    join.current_draw_offset(),
                    opacity,
                );
            }
            MapState::Paused(PauseMode::Open | PauseMode::Closing) => {
                if let Some(pause_screen) = &self.pause_screen {
                    pause_screen.draw(batch, services.viewport, opacity);
                }
            }
            MapState::Paused(PauseMode::InPlace) => {
                self.draw_current(batch, player, services, opacity);
                self.draw_centered_text(batch, PAUSE_TEXT, services, opacity);
            }
            _ => self.draw_current(batch, player, services, opacity),
        }
    }

    fn game_input(&mut self, event: InputEvent, services: &mut Services) -> HandlerCommand {
        match self.state {
            MapState::Playing(PlayPhase::Active)
                if event.is_press_of(GameInput::Start)
                    && !self.gameplay.player().input_paused() =>
            {
                self.pause(services);
            }
            MapState::Paused(PauseMode::InPlace) if event.is_press_of(GameInput::Start) => {
                services.flags.unpause();
                self.state = MapState::Playing(PlayPhase::Active);
                info!(map = %self.map.name, "unpaused");
            }
            MapState::Paused(PauseMode::Open) => {
                let unpaused = self
                    .pause_screen
                    .as_mut()
                    .and_then(|pause_screen| pause_screen.handle_input(event));
                if unpaused == Some(PauseEvent::Unpaused) {
                    if let Some(pause_screen) = &self.pause_screen {
                        pause_screen.sound(services);
                    }
                    services.fade.start(HandlerKey::Map, FadeCue::ClosePause);
                    self.state = MapState::Paused(PauseMode::Closing);
                }
            }
            _ => {}
        }
        HandlerCommand::None
    }

    fn fade_event(&mut self, event: FadeEvent, services: &mut Services) -> HandlerCommand {
        match (event, &self.state) {
            (FadeEvent::OutComplete(FadeCue::Death), MapState::DeathFade) => {
                return self.reset(services);
            }
            (
                FadeEvent::OutComplete(FadeCue::Teleport),
                MapState::Teleporting(TeleportPhase::Fading(info)),
            ) => {
                let info = info.clone();
                self.state = self.teleport_swap(info, services);
            }
            (
                FadeEvent::InComplete(FadeCue::Teleport),
                MapState::Teleporting(TeleportPhase::FadingIn),
            ) => {
                self.state = self.finish_teleport();
                if mem::take(&mut self.death_pending) {
                    self.player_died(services);
                }
            }
            (FadeEvent::OutComplete(FadeCue::OpenPause), MapState::Paused(PauseMode::Opening)) => {
                self.open_pause_screen();
            }
            (FadeEvent::OutComplete(FadeCue::ClosePause), MapState::Paused(PauseMode::Closing)) => {
                self.close_pause_screen();
            }
            (FadeEvent::InComplete(FadeCue::ClosePause), MapState::Paused(PauseMode::Resuming)) => {
                services.flags.unpause();
                self.state = MapState::Playing(PlayPhase::Active);
            }
            _ => {}
        }
        HandlerCommand::None
    }

    fn stop_handler(&mut self, services: &mut Services) {
        if !self.attached {
            return;
        }
        self.attached = false;
        services.bus.unsubscribe_all(HandlerKey::Map);

        if let Some(screen) = self.screens.get_mut(&self.current_screen) {
            screen.stop();
            screen.clean(services);
        }
        self.stop_all_music(services);
        if let Some(pause_screen) = &mut self.pause_screen {
            pause_screen.stop_handler();
        }
        if matches!(self.state, MapState::Paused(_)) {
            services.flags.unpause();
        }
        self.gameplay.stop_handler();
        self.gameplay.player_mut().stop();
        self.teleporting = false;
        self.death_pending = false;
        if self.state != MapState::Ended {
            self.state = MapState::Idle;
        }
        info!(map = %self.map.name, "map_stopped");
    }
}
