use crate::app::consts::{PLAYER_SCROLL_TRAVEL_PX, SCROLL_FRAMES};
use crate::app::geometry::{PointI, Vec2, ViewportSize};
use crate::content::Join;

use super::screen_handler::camera_for;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Left,
    Right,
    Up,
    Down,
}

impl ScrollDirection {
    fn unit(self) -> PointI {
        match self {
            ScrollDirection::Left => PointI::new(-1, 0),
            ScrollDirection::Right => PointI::new(1, 0),
            ScrollDirection::Up => PointI::new(0, -1),
            ScrollDirection::Down => PointI::new(0, 1),
        }
    }

    /// Right and down run from `screen_one` to `screen_two`.
    pub fn is_forward(self) -> bool {
        matches!(self, ScrollDirection::Right | ScrollDirection::Down)
    }

    fn is_horizontal(self) -> bool {
        matches!(self, ScrollDirection::Left | ScrollDirection::Right)
    }
}

/// One scripted scroll across a join. Lives from the trigger until the
/// frame that reports completion.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinHandler {
    join: Join,
    direction: ScrollDirection,
    tile_size: i32,
    viewport: ViewportSize,
    distance: i32,
    frame: u32,
    offset: i32,
    travelled: i32,
    current_size: (i32, i32),
    next_size: (i32, i32),
    current_camera: PointI,
    next_camera: PointI,
    done: bool,
}

impl JoinHandler {
    pub fn new(join: Join, direction: ScrollDirection, tile_size: u32, viewport: ViewportSize) -> Self {
        Self {
            join,
            direction,
            tile_size: tile_size as i32,
            viewport,
            distance: 0,
            frame: 0,
            offset: 0,
            travelled: 0,
            current_size: (0, 0),
            next_size: (0, 0),
            current_camera: PointI::ZERO,
            next_camera: PointI::ZERO,
            done: false,
        }
    }

    pub fn direction(&self) -> ScrollDirection {
        self.direction
    }

    pub fn from_screen(&self) -> &str {
        if self.direction.is_forward() {
            &self.join.screen_one
        } else {
            &self.join.screen_two
        }
    }

    pub fn to_screen(&self) -> &str {
        if self.direction.is_forward() {
            &self.join.screen_two
        } else {
            &self.join.screen_one
        }
    }

    /// Pixel shift along the shared edge when moving into the next screen.
    fn edge_shift(&self) -> i32 {
        let forward = (self.join.offset_two - self.join.offset_one) * self.tile_size;
        if self.direction.is_forward() {
            forward
        } else {
            -forward
        }
    }

    pub fn begin_scroll(&mut self, current_size: (i32, i32), next_size: (i32, i32), player: Vec2) {
        let (view_w, view_h) = (
            self.viewport.pixels_across as i32,
            self.viewport.pixels_down as i32,
        );
        self.current_size = current_size;
        self.next_size = next_size;
        self.current_camera = camera_for(player, current_size, self.viewport);
        self.distance = if self.direction.is_horizontal() {
            view_w
        } else {
            view_h
        };

        let shift = self.edge_shift();
        let clamp_x = |x: i32| x.clamp(0, (next_size.0 - view_w).max(0));
        let clamp_y = |y: i32| y.clamp(0, (next_size.1 - view_h).max(0));
        self.next_camera = match self.direction {
            ScrollDirection::Right => PointI::new(0, clamp_y(self.current_camera.y + shift)),
            ScrollDirection::Left => PointI::new(
                (next_size.0 - view_w).max(0),
                clamp_y(self.current_camera.y + shift),
            ),
            ScrollDirection::Down => PointI::new(clamp_x(self.current_camera.x + shift), 0),
            ScrollDirection::Up => PointI::new(
                clamp_x(self.current_camera.x + shift),
                (next_size.1 - view_h).max(0),
            ),
        };
        self.frame = 0;
        self.offset = 0;
        self.travelled = 0;
        self.done = false;
    }

    /// Advances one frame and nudges the player. Returns true only on the
    /// frame the full distance is covered.
    pub fn update(&mut self, player: &mut Vec2) -> bool {
        if self.done {
            return false;
        }
        self.frame += 1;
        self.offset = self.distance * self.frame as i32 / SCROLL_FRAMES as i32;

        let total_travel = PLAYER_SCROLL_TRAVEL_PX * self.frame as i32 / SCROLL_FRAMES as i32;
        let step = total_travel - self.travelled;
        self.travelled = total_travel;
        let unit = self.direction.unit();
        player.x += (unit.x * step) as f32;
        player.y += (unit.y * step) as f32;

        if self.frame >= SCROLL_FRAMES {
            self.done = true;
            return true;
        }
        false
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn current_camera(&self) -> PointI {
        self.current_camera
    }

    pub fn current_draw_offset(&self) -> PointI {
        let unit = self.direction.unit();
        PointI::new(-unit.x * self.offset, -unit.y * self.offset)
    }

    /// Camera of the arriving screen, in its own coordinates.
    pub fn next_screen_position(&self) -> PointI {
        self.next_camera
    }

    pub fn next_offset(&self) -> PointI {
        let unit = self.direction.unit();
        let remaining = self.distance - self.offset;
        PointI::new(unit.x * remaining, unit.y * remaining)
    }

    /// Maps a position on the departing screen into the arriving screen.
    pub fn translate_to_next(&self, position: Vec2) -> Vec2 {
        let shift = self.edge_shift() as f32;
        match self.direction {
            ScrollDirection::Right => {
                Vec2::new(position.x - self.current_size.0 as f32, position.y + shift)
            }
            ScrollDirection::Left => {
                Vec2::new(position.x + self.next_size.0 as f32, position.y + shift)
            }
            ScrollDirection::Down => {
                Vec2::new(position.x + shift, position.y - self.current_size.1 as f32)
            }
            ScrollDirection::Up => {
                Vec2::new(position.x + shift, position.y + self.next_size.1 as f32)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{JoinDirection, JoinKind};

    fn vertical_join(offset_one: i32, offset_two: i32) -> Join {
        Join {
            kind: JoinKind::Vertical,
            screen_one: "west".to_string(),
            screen_two: "east".to_string(),
            offset_one,
            offset_two,
            size: 14,
            direction: JoinDirection::Both,
        }
    }

    #[test]
    fn scroll_finishes_exactly_once_after_scroll_frames() {
        let mut join = JoinHandler::new(
            vertical_join(0, 0),
            ScrollDirection::Right,
            16,
            ViewportSize::default(),
        );
        let mut player = Vec2::new(256.0, 160.0);
        join.begin_scroll((256, 224), (256, 224), player);

        let mut completions = Vec::new();
        let mut last_offset = 0;
        for frame in 1..=SCROLL_FRAMES + 10 {
            if join.update(&mut player) {
                completions.push(frame);
            }
            assert!(join.offset() >= last_offset);
            last_offset = join.offset();
        }

        assert_eq!(completions, vec![SCROLL_FRAMES]);
        assert!(join.is_done());
        assert_eq!(join.offset(), 256);
        assert_eq!(join.next_offset(), PointI::ZERO);
        assert_eq!(player.x, 256.0 + PLAYER_SCROLL_TRAVEL_PX as f32);
        assert_eq!(player.y, 160.0);
    }

    #[test]
    fn offsets_are_deterministic_per_frame() {
        let mut join = JoinHandler::new(
            vertical_join(0, 0),
            ScrollDirection::Down,
            16,
            ViewportSize::default(),
        );
        let mut player = Vec2::new(100.0, 224.0);
        join.begin_scroll((256, 224), (256, 224), player);
        for _ in 0..16 {
            join.update(&mut player);
        }
        assert!(!join.is_done());
        assert_eq!(join.offset(), 224 * 16 / 64);
        assert_eq!(join.current_draw_offset(), PointI::new(0, -56));
        assert_eq!(join.next_offset(), PointI::new(0, 224 - 56));
    }

    #[test]
    fn backward_scroll_runs_from_screen_two() {
        let mut join = JoinHandler::new(
            vertical_join(2, 0),
            ScrollDirection::Left,
            16,
            ViewportSize::default(),
        );
        assert_eq!(join.from_screen(), "east");
        assert_eq!(join.to_screen(), "west");

        join.begin_scroll((256, 224), (512, 256), Vec2::new(-1.0, 100.0));
        assert_eq!(join.next_screen_position(), PointI::new(256, 32));
        let arrived = join.translate_to_next(Vec2::new(-20.0, 100.0));
        assert_eq!(arrived, Vec2::new(492.0, 132.0));
    }

    #[test]
    fn forward_translation_subtracts_departing_width() {
        let mut join = JoinHandler::new(
            vertical_join(0, 0),
            ScrollDirection::Right,
            16,
            ViewportSize::default(),
        );
        join.begin_scroll((512, 224), (256, 224), Vec2::new(511.0, 150.0));
        assert_eq!(join.current_camera(), PointI::new(256, 0));
        assert_eq!(
            join.translate_to_next(Vec2::new(536.0, 150.0)),
            Vec2::new(24.0, 150.0)
        );
    }
}
