use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::game::Game;
use super::input::{GameInput, InputEvent};
use super::metrics::FrameStats;
use super::rendering::{Renderer, SpriteStyle};

pub const SLOW_FRAME_ENV_VAR: &str = "MMGE_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
    /// Placeholder boxes for named sprites.
    pub sprite_styles: HashMap<String, SpriteStyle>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Mega Man Engine".to_string(),
            window_width: 768,
            window_height: 672,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
            sprite_styles: HashMap::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the window and drives `game` at a fixed tick rate until the window
/// closes or Escape is pressed.
pub fn run_app(config: LoopConfig, mut game: Game) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let window_for_loop = Arc::clone(&window);
    let viewport = game.services().viewport;
    let mut renderer = Renderer::new(window, viewport).map_err(AppError::CreateRenderer)?;
    for (name, style) in &config.sprite_styles {
        renderer.set_sprite_style(name.clone(), *style);
    }

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let mut input_collector = InputCollector::default();

    game.start();
    info!(
        project = game.project().name.as_str(),
        stage_count = game.project().stages.len(),
        viewport_width = viewport.pixels_across,
        viewport_height = viewport.pixels_down,
        "game_started"
    );
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut frame_stats = FrameStats::new(metrics_log_interval, Instant::now());

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window_for_loop.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        info!(reason = "window_close", "shutdown_requested");
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = window_for_loop.inner_size();
                        if let Err(error) = renderer.resize(size.width, size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        input_collector.handle_keyboard_input(&event);
                        if input_collector.quit_requested {
                            info!(reason = "escape_key", "shutdown_requested");
                            window_target.exit();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        if slow_frame_delay > Duration::ZERO {
                            // Debug perturbation only; this is not the FPS cap.
                            thread::sleep(slow_frame_delay);
                        }

                        let now = Instant::now();
                        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                        last_frame_instant = now;

                        accumulator =
                            accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));
                        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                        for _ in 0..step_plan.ticks_to_run {
                            for input in input_collector.take_events() {
                                game.input(input);
                            }
                            game.tick();
                        }
                        accumulator = step_plan.remaining_accumulator;
                        frame_stats.record_ticks(step_plan.ticks_to_run);

                        if step_plan.dropped_backlog > Duration::ZERO {
                            frame_stats.record_clamp();
                            warn!(
                                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                                max_ticks_per_frame, "sim_clamp_triggered"
                            );
                        }

                        let elapsed_since_last_present =
                            Instant::now().saturating_duration_since(last_present_instant);
                        let cap_sleep =
                            compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                        if cap_sleep > Duration::ZERO {
                            thread::sleep(cap_sleep);
                        }

                        if let Err(error) = renderer.render_game(&game) {
                            warn!(error = %error, "renderer_draw_failed");
                            window_target.exit();
                        }
                        last_present_instant = Instant::now();
                        frame_stats.record_frame(raw_frame_dt);

                        if let Some(snapshot) = frame_stats.maybe_snapshot(now) {
                            info!(
                                fps = snapshot.fps,
                                tps = snapshot.tps,
                                frame_time_ms = snapshot.frame_time_ms,
                                worst_frame_ms = snapshot.worst_frame_ms,
                                clamped_frames = snapshot.clamped_frames,
                                stage = game.current_stage().unwrap_or("-"),
                                "loop_metrics"
                            );
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                window_for_loop.request_redraw();
            }
            Event::LoopExiting => {
                game.stop_handlers();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Turns key transitions into game input events. Held keys do not repeat.
#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    down: HashMap<GameInput, bool>,
    pending: Vec<InputEvent>,
}

impl InputCollector {
    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        self.handle_physical_key(key_event.physical_key, key_event.state);
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, state: ElementState) {
        if key == PhysicalKey::Code(KeyCode::Escape) {
            if state == ElementState::Pressed {
                self.quit_requested = true;
            }
            return;
        }
        let Some(input) = game_input_for_key(key) else {
            return;
        };
        let is_pressed = state == ElementState::Pressed;
        let was_down = self.down.insert(input, is_pressed).unwrap_or(false);
        if was_down != is_pressed {
            self.pending.push(InputEvent {
                input,
                pressed: is_pressed,
            });
        }
    }

    fn take_events(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.pending)
    }
}

fn game_input_for_key(key: PhysicalKey) -> Option<GameInput> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    let input = match code {
        KeyCode::ArrowUp | KeyCode::KeyW => GameInput::Up,
        KeyCode::ArrowDown | KeyCode::KeyS => GameInput::Down,
        KeyCode::ArrowLeft | KeyCode::KeyA => GameInput::Left,
        KeyCode::ArrowRight | KeyCode::KeyD => GameInput::Right,
        KeyCode::KeyZ | KeyCode::Space => GameInput::Jump,
        KeyCode::KeyX => GameInput::Shoot,
        KeyCode::Enter => GameInput::Start,
        KeyCode::ShiftRight | KeyCode::Tab => GameInput::Select,
        _ => return None,
    };
    Some(input)
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let result = plan_sim_steps(Duration::from_millis(50), Duration::from_millis(16), 5);
        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(2));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let result = plan_sim_steps(Duration::from_millis(120), Duration::from_millis(16), 3);
        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn render_cap_of_zero_means_uncapped() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(target_frame_duration(None), None);
        assert_eq!(
            compute_cap_sleep(Duration::from_millis(4), Some(Duration::from_millis(10))),
            Duration::from_millis(6)
        );
        assert_eq!(format_render_cap(None), "off");
    }

    #[test]
    fn arrows_and_wasd_map_to_directions() {
        assert_eq!(
            game_input_for_key(PhysicalKey::Code(KeyCode::KeyW)),
            Some(GameInput::Up)
        );
        assert_eq!(
            game_input_for_key(PhysicalKey::Code(KeyCode::ArrowLeft)),
            Some(GameInput::Left)
        );
        assert_eq!(
            game_input_for_key(PhysicalKey::Code(KeyCode::Enter)),
            Some(GameInput::Start)
        );
        assert_eq!(game_input_for_key(PhysicalKey::Code(KeyCode::F3)), None);
    }

    #[test]
    fn held_key_emits_one_press_until_released() {
        let mut input = InputCollector::default();
        let jump = PhysicalKey::Code(KeyCode::KeyZ);
        input.handle_physical_key(jump, ElementState::Pressed);
        input.handle_physical_key(jump, ElementState::Pressed);
        assert_eq!(
            input.take_events(),
            vec![InputEvent::pressed(GameInput::Jump)]
        );
        assert!(input.take_events().is_empty());

        input.handle_physical_key(jump, ElementState::Released);
        input.handle_physical_key(jump, ElementState::Pressed);
        assert_eq!(
            input.take_events(),
            vec![
                InputEvent::released(GameInput::Jump),
                InputEvent::pressed(GameInput::Jump)
            ]
        );
    }

    #[test]
    fn escape_requests_quit_without_game_event() {
        let mut input = InputCollector::default();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::Escape), ElementState::Pressed);
        assert!(input.quit_requested);
        assert!(input.take_events().is_empty());
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut input = InputCollector::default();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyX), ElementState::Released);
        assert!(input.take_events().is_empty());
    }
}
