use tracing::debug;

use crate::app::geometry::{PointI, Vec2, ViewportSize};
use crate::app::services::{EntityHandle, Services, SpriteBatch, WorldSignal};
use crate::content::{EntityPlacement, Join, JoinKind, MusicTrack, Screen, TeleportInfo};

use super::join_handler::{JoinHandler, ScrollDirection};
use super::tiles::TileAnimator;

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenEvent {
    JoinTriggered(JoinHandler),
    Teleport(TeleportInfo),
    BossDefeated,
}

/// Top-left corner of the view following `focus`, clamped to the screen.
pub fn camera_for(focus: Vec2, screen_size: (i32, i32), viewport: ViewportSize) -> PointI {
    let view_w = viewport.pixels_across as i32;
    let view_h = viewport.pixels_down as i32;
    let x = (focus.x as i32 - view_w / 2).clamp(0, (screen_size.0 - view_w).max(0));
    let y = (focus.y as i32 - view_h / 2).clamp(0, (screen_size.1 - view_h).max(0));
    PointI::new(x, y)
}

/// Runtime wrapper around one screen. Built once per map and reused every
/// time the player comes back.
#[derive(Debug)]
pub struct ScreenHandler {
    screen: Screen,
    joins: Vec<Join>,
    tile_size: u32,
    running: bool,
    spawned: Vec<(EntityHandle, EntityPlacement)>,
    clean_calls: u32,
}

impl ScreenHandler {
    pub fn new(screen: Screen, joins: Vec<Join>, tile_size: u32) -> Self {
        Self {
            screen,
            joins,
            tile_size,
            running: false,
            spawned: Vec::new(),
            clean_calls: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.screen.name
    }

    pub fn pixel_size(&self) -> (i32, i32) {
        self.screen.pixel_size(self.tile_size)
    }

    pub fn music(&self) -> Option<&MusicTrack> {
        self.screen.music.as_ref()
    }

    pub fn nsf_track(&self) -> Option<u32> {
        self.screen.nsf_track
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn clean_calls(&self) -> u32 {
        self.clean_calls
    }

    pub fn start(&mut self, services: &mut Services) {
        if self.running {
            return;
        }
        if self.spawned.is_empty() {
            for placement in &self.screen.entities {
                let handle = services.entities.spawn(&self.screen.name, placement);
                self.spawned.push((handle, placement.clone()));
            }
        }
        self.running = true;
        debug!(
            screen = %self.screen.name,
            entity_count = self.spawned.len(),
            "screen_started"
        );
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn clean(&mut self, services: &mut Services) {
        self.clean_calls += 1;
        self.stop();
        for (handle, _) in self.spawned.drain(..) {
            services.entities.remove(handle);
        }
    }

    pub fn update(&mut self, player: Vec2, services: &mut Services) -> Vec<ScreenEvent> {
        let mut events = Vec::new();
        if !self.running {
            return events;
        }

        for signal in services.entities.update(&self.screen.name, player) {
            match signal {
                WorldSignal::BossDefeated => events.push(ScreenEvent::BossDefeated),
            }
        }

        let crossing = self
            .joins
            .iter()
            .find_map(|join| self.crossing(join, player).map(|dir| (join, dir)));
        if let Some((join, direction)) = crossing {
            events.push(ScreenEvent::JoinTriggered(JoinHandler::new(
                join.clone(),
                direction,
                self.tile_size,
                services.viewport,
            )));
        } else if let Some(teleport) = self
            .screen
            .teleports
            .iter()
            .find(|teleport| teleport.source.contains(player))
        {
            events.push(ScreenEvent::Teleport(teleport.clone()));
        }
        events
    }

    fn crossing(&self, join: &Join, player: Vec2) -> Option<ScrollDirection> {
        let (width, height) = self.pixel_size();
        let tile = self.tile_size as f32;
        let covers = |along: f32, offset: i32| {
            along >= offset as f32 * tile && along < (offset + join.size) as f32 * tile
        };
        let name = self.screen.name.as_str();

        match join.kind {
            JoinKind::Vertical => {
                if join.screen_one == name
                    && player.x >= width as f32
                    && covers(player.y, join.offset_one)
                    && join.direction.allows_forward()
                {
                    Some(ScrollDirection::Right)
                } else if join.screen_two == name
                    && player.x < 0.0
                    && covers(player.y, join.offset_two)
                    && join.direction.allows_backward()
                {
                    Some(ScrollDirection::Left)
                } else {
                    None
                }
            }
            JoinKind::Horizontal => {
                if join.screen_one == name
                    && player.y >= height as f32
                    && covers(player.x, join.offset_one)
                    && join.direction.allows_forward()
                {
                    Some(ScrollDirection::Down)
                } else if join.screen_two == name
                    && player.y < 0.0
                    && covers(player.x, join.offset_two)
                    && join.direction.allows_backward()
                {
                    Some(ScrollDirection::Up)
                } else {
                    None
                }
            }
        }
    }

    pub fn draw(
        &self,
        batch: &mut dyn SpriteBatch,
        player: Vec2,
        draw_offset: PointI,
        tiles: &TileAnimator,
        services: &Services,
        opacity: f32,
    ) {
        let camera = camera_for(player, self.pixel_size(), services.viewport);
        self.draw_at(batch, camera, draw_offset, tiles, services, opacity);
    }

    /// Draws with a fixed camera; used while scrolling.
    pub fn draw_at(
        &self,
        batch: &mut dyn SpriteBatch,
        camera: PointI,
        draw_offset: PointI,
        tiles: &TileAnimator,
        services: &Services,
        opacity: f32,
    ) {
        let size = self.tile_size as i32;
        let view_w = services.viewport.pixels_across as i32;
        let view_h = services.viewport.pixels_down as i32;
        let origin_x = draw_offset.x - camera.x;
        let origin_y = draw_offset.y - camera.y;

        for ty in 0..self.screen.tiles.height() {
            let y = origin_y + ty as i32 * size;
            if y + size <= 0 || y >= view_h {
                continue;
            }
            for tx in 0..self.screen.tiles.width() {
                let x = origin_x + tx as i32 * size;
                if x + size <= 0 || x >= view_w {
                    continue;
                }
                let Some(tile) = self.screen.tiles.tile_at(tx, ty) else {
                    continue;
                };
                batch.draw_tile(tile, tiles.cell_of(tile), x, y, self.tile_size, opacity);
            }
        }

        for (handle, placement) in &self.spawned {
            if let Some(position) = services.entities.position(*handle) {
                batch.draw_sprite(
                    &placement.name,
                    origin_x + position.x as i32,
                    origin_y + position.y as i32,
                    opacity,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::services::WorldSignal;
    use crate::app::test_support::{sample_map, Harness, RecordingBatch, WorldCall};

    fn handler(name: &str) -> ScreenHandler {
        let map = sample_map();
        let screen = map.screen(name).cloned().expect("screen");
        let joins = map.joins_for(name).cloned().collect();
        ScreenHandler::new(screen, joins, map.tileset.tile_size)
    }

    #[test]
    fn start_is_idempotent_and_clean_removes_spawned_entities() {
        let mut harness = Harness::new();
        let mut screen = handler("start");

        screen.start(&mut harness.services);
        screen.start(&mut harness.services);
        assert!(screen.is_running());
        let spawns = harness
            .world
            .borrow()
            .calls
            .iter()
            .filter(|call| matches!(call, WorldCall::Spawn { .. }))
            .count();
        assert_eq!(spawns, 1);

        screen.clean(&mut harness.services);
        screen.clean(&mut harness.services);
        assert!(!screen.is_running());
        assert!(harness.world.borrow().live.is_empty());
        let removes = harness
            .world
            .borrow()
            .calls
            .iter()
            .filter(|call| matches!(call, WorldCall::Remove(_)))
            .count();
        assert_eq!(removes, 1);
        assert_eq!(screen.clean_calls(), 2);
    }

    #[test]
    fn stop_is_safe_on_stopped_screen_and_silences_updates() {
        let mut harness = Harness::new();
        let mut screen = handler("start");
        screen.stop();
        screen.stop();
        assert!(screen
            .update(Vec2::new(300.0, 100.0), &mut harness.services)
            .is_empty());
    }

    #[test]
    fn crossing_right_edge_triggers_forward_join() {
        let mut harness = Harness::new();
        let mut screen = handler("start");
        screen.start(&mut harness.services);

        assert!(screen
            .update(Vec2::new(255.0, 100.0), &mut harness.services)
            .is_empty());
        let events = screen.update(Vec2::new(256.0, 100.0), &mut harness.services);
        match events.as_slice() {
            [ScreenEvent::JoinTriggered(join)] => {
                assert_eq!(join.direction(), ScrollDirection::Right);
                assert_eq!(join.to_screen(), "east");
            }
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn crossing_left_edge_of_screen_two_triggers_backward_join() {
        let mut harness = Harness::new();
        let mut screen = handler("east");
        screen.start(&mut harness.services);

        let events = screen.update(Vec2::new(-1.0, 50.0), &mut harness.services);
        assert!(matches!(
            events.as_slice(),
            [ScreenEvent::JoinTriggered(join)] if join.direction() == ScrollDirection::Left
        ));
        // Nothing joins on the right side of `east`.
        assert!(screen
            .update(Vec2::new(300.0, 50.0), &mut harness.services)
            .is_empty());
    }

    #[test]
    fn teleport_zone_and_boss_signal_are_reported() {
        let mut harness = Harness::new();
        let mut screen = handler("start");
        screen.start(&mut harness.services);
        harness
            .world
            .borrow_mut()
            .pending_signals
            .push(WorldSignal::BossDefeated);

        let events = screen.update(Vec2::new(165.0, 100.0), &mut harness.services);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ScreenEvent::BossDefeated);
        assert!(matches!(&events[1], ScreenEvent::Teleport(info) if info.target_screen == "start"));
    }

    #[test]
    fn draw_culls_to_viewport_and_includes_live_entities() {
        let mut harness = Harness::new();
        let mut screen = handler("start");
        screen.start(&mut harness.services);
        let tiles = TileAnimator::new(&sample_map().tileset);

        let mut batch = RecordingBatch::default();
        screen.draw(
            &mut batch,
            Vec2::new(64.0, 160.0),
            PointI::ZERO,
            &tiles,
            &harness.services,
            1.0,
        );
        assert_eq!(batch.tile_count(), 16 * 14);
        assert_eq!(batch.sprites(), vec!["metool"]);

        let mut shifted = RecordingBatch::default();
        screen.draw_at(
            &mut shifted,
            PointI::ZERO,
            PointI::new(-128, 0),
            &tiles,
            &harness.services,
            1.0,
        );
        assert_eq!(shifted.tile_count(), 8 * 14);
    }

    #[test]
    fn camera_is_clamped_to_screen() {
        let viewport = ViewportSize::default();
        assert_eq!(
            camera_for(Vec2::new(10.0, 10.0), (512, 224), viewport),
            PointI::ZERO
        );
        assert_eq!(
            camera_for(Vec2::new(500.0, 10.0), (512, 224), viewport),
            PointI::new(256, 0)
        );
        assert_eq!(
            camera_for(Vec2::new(300.0, 10.0), (512, 224), viewport),
            PointI::new(172, 0)
        );
    }
}
