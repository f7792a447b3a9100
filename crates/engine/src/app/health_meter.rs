use tracing::debug;

use crate::content::{HealthMeterDef, MeterOrientation};

use super::bus::Channel;
use super::consts::{
    METER_TICK_COUNT, METER_TICK_INTERVAL_FRAMES, METER_TICK_PX, METER_TICK_SOUND,
    METER_VERTICAL_BASE_PX,
};
use super::handler::{GameHandler, HandlerCommand, HandlerKey};
use super::services::{Services, SpriteBatch};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeterState {
    Idle,
    AnimatingUp { target: f32, frames: u32 },
}

/// HUD bar showing a value as whole ticks. Increases while running fill in one
/// tick at a time with a sound; decreases apply at once.
#[derive(Debug, Clone)]
pub struct HealthMeter {
    def: HealthMeterDef,
    value: f32,
    max_value: f32,
    tick_size: f32,
    state: MeterState,
    running: bool,
}

impl HealthMeter {
    pub fn new(def: HealthMeterDef) -> Self {
        Self {
            def,
            value: 0.0,
            max_value: 0.0,
            tick_size: 0.0,
            state: MeterState::Idle,
            running: false,
        }
    }

    /// What the bar shows, which lags the real value while animating.
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    pub fn tick_size(&self) -> f32 {
        self.tick_size
    }

    pub fn state(&self) -> MeterState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_max_value(&mut self, max_value: f32) {
        self.max_value = max_value;
        self.tick_size = max_value / METER_TICK_COUNT;
    }

    pub fn set_value(&mut self, value: f32) {
        if self.running && value > self.value {
            self.state = MeterState::AnimatingUp {
                target: value,
                frames: 0,
            };
            return;
        }
        self.value = value.max(0.0);
        self.state = MeterState::Idle;
    }

    pub fn reset(&mut self) {
        self.value = self.max_value;
        self.state = MeterState::Idle;
    }

    pub fn start_handler(&mut self, services: &mut Services) {
        services.bus.subscribe(Channel::Tick, HandlerKey::HealthMeter);
        services.bus.subscribe(Channel::Render, HandlerKey::HealthMeter);
        self.running = true;
    }

    /// Whole ticks currently lit.
    pub fn filled_ticks(&self) -> u32 {
        if self.tick_size <= 0.0 {
            return 0;
        }
        (self.value / self.tick_size).round().max(0.0) as u32
    }

    pub fn draw(&self, batch: &mut dyn SpriteBatch, opacity: f32) {
        let origin_x = self.def.position.x as i32;
        let origin_y = self.def.position.y as i32;
        if let Some(background) = &self.def.background {
            batch.draw_sprite(background, origin_x, origin_y, opacity);
        }

        let offset = self.def.tick_offset;
        for tick in 0..self.filled_ticks() as i32 {
            let (x, y) = match self.def.orientation {
                // The tick offset only shifts vertical meters.
                MeterOrientation::Horizontal => (origin_x + tick * METER_TICK_PX, origin_y),
                MeterOrientation::Vertical => (
                    origin_x + offset.x,
                    origin_y + METER_VERTICAL_BASE_PX + offset.y - tick * METER_TICK_PX,
                ),
            };
            batch.draw_sprite(&self.def.image, x, y, opacity);
        }
    }
}

impl GameHandler for HealthMeter {
    fn game_tick(&mut self, services: &mut Services) -> HandlerCommand {
        let MeterState::AnimatingUp { target, frames } = self.state else {
            return HandlerCommand::None;
        };

        let mut frames = frames + 1;
        if frames >= METER_TICK_INTERVAL_FRAMES {
            frames = 0;
            self.value = (self.value + self.tick_size).min(self.max_value);
            services.audio.play_sound(METER_TICK_SOUND);
        }

        self.state = if self.value >= target || self.value >= self.max_value {
            debug!(value = self.value, "meter_filled");
            MeterState::Idle
        } else {
            MeterState::AnimatingUp { target, frames }
        };
        HandlerCommand::None
    }

    fn game_render(&self, batch: &mut dyn SpriteBatch, services: &Services) {
        self.draw(batch, services.fade.opacity());
    }

    fn stop_handler(&mut self, services: &mut Services) {
        services.bus.unsubscribe_all(HandlerKey::HealthMeter);
        self.state = MeterState::Idle;
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::geometry::{PointI, Vec2};
    use crate::app::test_support::{AudioCall, DrawCall, Harness, RecordingBatch};

    fn def(orientation: MeterOrientation) -> HealthMeterDef {
        HealthMeterDef {
            position: Vec2::new(24.0, 16.0),
            image: "tick".to_string(),
            background: None,
            orientation,
            tick_offset: PointI::new(1, 2),
        }
    }

    fn meter() -> HealthMeter {
        let mut meter = HealthMeter::new(def(MeterOrientation::Vertical));
        meter.set_max_value(28.0);
        meter
    }

    fn tick_sounds(harness: &Harness) -> usize {
        harness
            .audio_calls()
            .iter()
            .filter(|call| **call == AudioCall::Sound(METER_TICK_SOUND.to_string()))
            .count()
    }

    #[test]
    fn tick_size_is_max_over_twenty_eight() {
        let mut meter = HealthMeter::new(def(MeterOrientation::Vertical));
        meter.set_max_value(56.0);
        assert_eq!(meter.tick_size(), 2.0);
    }

    #[test]
    fn set_value_applies_immediately_when_not_running_and_clamps_at_zero() {
        let mut meter = meter();
        meter.set_value(20.0);
        assert_eq!(meter.value(), 20.0);
        meter.set_value(-5.0);
        assert_eq!(meter.value(), 0.0);
        assert_eq!(meter.state(), MeterState::Idle);
    }

    #[test]
    fn increase_while_running_fills_one_tick_every_three_frames() {
        let mut harness = Harness::new();
        let mut meter = meter();
        meter.set_value(10.0);
        meter.start_handler(&mut harness.services);

        meter.set_value(13.0);
        assert_eq!(meter.value(), 10.0);
        assert!(matches!(meter.state(), MeterState::AnimatingUp { .. }));

        for _ in 0..2 {
            meter.game_tick(&mut harness.services);
        }
        assert_eq!(meter.value(), 10.0);
        meter.game_tick(&mut harness.services);
        assert_eq!(meter.value(), 11.0);
        assert_eq!(tick_sounds(&harness), 1);

        for _ in 0..6 {
            meter.game_tick(&mut harness.services);
        }
        assert_eq!(meter.value(), 13.0);
        assert_eq!(meter.state(), MeterState::Idle);
        assert_eq!(tick_sounds(&harness), 3);

        for _ in 0..9 {
            meter.game_tick(&mut harness.services);
        }
        assert_eq!(meter.value(), 13.0);
        assert_eq!(tick_sounds(&harness), 3);
    }

    #[test]
    fn animation_is_capped_at_max() {
        let mut harness = Harness::new();
        let mut meter = meter();
        meter.set_value(27.5);
        meter.start_handler(&mut harness.services);
        meter.set_value(40.0);
        for _ in 0..3 {
            meter.game_tick(&mut harness.services);
        }
        assert_eq!(meter.value(), 28.0);
        assert_eq!(meter.state(), MeterState::Idle);
    }

    #[test]
    fn decrease_cancels_running_animation() {
        let mut harness = Harness::new();
        let mut meter = meter();
        meter.set_value(10.0);
        meter.start_handler(&mut harness.services);
        meter.set_value(20.0);
        meter.set_value(4.0);
        assert_eq!(meter.value(), 4.0);
        assert_eq!(meter.state(), MeterState::Idle);
    }

    #[test]
    fn reset_refills_to_max() {
        let mut meter = meter();
        meter.set_value(3.0);
        meter.reset();
        assert_eq!(meter.value(), 28.0);
        assert_eq!(meter.filled_ticks(), 28);
    }

    #[test]
    fn vertical_meter_fills_upward_from_base() {
        let mut meter = meter();
        meter.set_value(3.0);
        let mut batch = RecordingBatch::default();
        meter.draw(&mut batch, 1.0);
        let positions: Vec<(i32, i32)> = batch
            .calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Sprite { x, y, .. } => Some((*x, *y)),
                _ => None,
            })
            .collect();
        assert_eq!(positions, vec![(25, 72), (25, 70), (25, 68)]);
    }

    #[test]
    fn horizontal_meter_draws_ticks_left_to_right_without_tick_offset() {
        let mut meter = HealthMeter::new(HealthMeterDef {
            background: Some("meter".to_string()),
            ..def(MeterOrientation::Horizontal)
        });
        meter.set_max_value(28.0);
        meter.set_value(2.4);
        let mut batch = RecordingBatch::default();
        meter.draw(&mut batch, 1.0);
        assert_eq!(
            batch.calls,
            vec![
                DrawCall::Sprite {
                    name: "meter".to_string(),
                    x: 24,
                    y: 16
                },
                DrawCall::Sprite {
                    name: "tick".to_string(),
                    x: 24,
                    y: 16
                },
                DrawCall::Sprite {
                    name: "tick".to_string(),
                    x: 26,
                    y: 16
                },
            ]
        );
    }

    #[test]
    fn stop_handler_unsubscribes_and_applies_values_directly() {
        let mut harness = Harness::new();
        let mut meter = meter();
        meter.start_handler(&mut harness.services);
        assert!(harness
            .services
            .bus
            .is_subscribed(Channel::Render, HandlerKey::HealthMeter));

        meter.stop_handler(&mut harness.services);
        assert!(!meter.is_running());
        assert!(!harness
            .services
            .bus
            .is_subscribed(Channel::Tick, HandlerKey::HealthMeter));
        meter.set_value(12.0);
        assert_eq!(meter.value(), 12.0);
    }
}
