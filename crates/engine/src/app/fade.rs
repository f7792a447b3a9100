use std::collections::VecDeque;

use super::consts::FADE_FRAMES;
use super::handler::HandlerKey;

/// What a fade was started for; echoed back in its completion events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeCue {
    Death,
    Teleport,
    OpenPause,
    ClosePause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeEvent {
    /// The screen is fully dark; the owner swaps whatever it needs to now.
    OutComplete(FadeCue),
    InComplete(FadeCue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FadePhase {
    Out,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveFade {
    owner: HandlerKey,
    cue: FadeCue,
    phase: FadePhase,
    frame: u32,
}

/// Out-then-in screen fade shared by every handler.
///
/// Each fade emits exactly one `OutComplete` and one `InComplete`. Requests made
/// while a fade is running wait their turn.
#[derive(Debug, Default)]
pub struct FadeTransition {
    active: Option<ActiveFade>,
    queued: VecDeque<(HandlerKey, FadeCue)>,
}

impl FadeTransition {
    pub fn start(&mut self, owner: HandlerKey, cue: FadeCue) {
        if self.active.is_some() {
            self.queued.push_back((owner, cue));
        } else {
            self.active = Some(ActiveFade {
                owner,
                cue,
                phase: FadePhase::Out,
                frame: 0,
            });
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn tick(&mut self) -> Option<(HandlerKey, FadeEvent)> {
        let fade = self.active.as_mut()?;
        fade.frame += 1;
        if fade.frame < FADE_FRAMES {
            return None;
        }

        let owner = fade.owner;
        let cue = fade.cue;
        match fade.phase {
            FadePhase::Out => {
                fade.phase = FadePhase::In;
                fade.frame = 0;
                Some((owner, FadeEvent::OutComplete(cue)))
            }
            FadePhase::In => {
                self.active = self.queued.pop_front().map(|(owner, cue)| ActiveFade {
                    owner,
                    cue,
                    phase: FadePhase::Out,
                    frame: 0,
                });
                Some((owner, FadeEvent::InComplete(cue)))
            }
        }
    }

    /// Tint multiplier for everything drawn this frame: 1.0 is fully visible.
    pub fn opacity(&self) -> f32 {
        match self.active {
            None => 1.0,
            Some(fade) => {
                let progress = fade.frame as f32 / FADE_FRAMES as f32;
                match fade.phase {
                    FadePhase::Out => 1.0 - progress,
                    FadePhase::In => progress,
                }
            }
        }
    }

    /// Drops fades `owner` has waiting; a running one plays out.
    pub fn cancel_queued(&mut self, owner: HandlerKey) {
        self.queued.retain(|(queued_owner, _)| *queued_owner != owner);
    }

    /// Drops every fade owned by `owner`, running or queued.
    pub fn cancel_owner(&mut self, owner: HandlerKey) {
        self.queued.retain(|(queued_owner, _)| *queued_owner != owner);
        if self.active.is_some_and(|fade| fade.owner == owner) {
            self.active = self.queued.pop_front().map(|(owner, cue)| ActiveFade {
                owner,
                cue,
                phase: FadePhase::Out,
                frame: 0,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_until_event(fade: &mut FadeTransition) -> (u32, (HandlerKey, FadeEvent)) {
        for frame in 1..=FADE_FRAMES * 4 {
            if let Some(event) = fade.tick() {
                return (frame, event);
            }
        }
        panic!("fade never produced an event");
    }

    #[test]
    fn fade_emits_out_then_in_once_each() {
        let mut fade = FadeTransition::default();
        fade.start(HandlerKey::Map, FadeCue::Teleport);

        let (frames, event) = run_until_event(&mut fade);
        assert_eq!(frames, FADE_FRAMES);
        assert_eq!(
            event,
            (HandlerKey::Map, FadeEvent::OutComplete(FadeCue::Teleport))
        );
        assert_eq!(fade.opacity(), 0.0);

        let (frames, event) = run_until_event(&mut fade);
        assert_eq!(frames, FADE_FRAMES);
        assert_eq!(
            event,
            (HandlerKey::Map, FadeEvent::InComplete(FadeCue::Teleport))
        );
        assert!(!fade.is_running());
        assert_eq!(fade.opacity(), 1.0);
        assert_eq!(fade.tick(), None);
    }

    #[test]
    fn second_request_is_queued_behind_running_fade() {
        let mut fade = FadeTransition::default();
        fade.start(HandlerKey::Map, FadeCue::OpenPause);
        fade.start(HandlerKey::Map, FadeCue::Death);

        let mut events = Vec::new();
        for _ in 0..FADE_FRAMES * 4 {
            if let Some((_, event)) = fade.tick() {
                events.push(event);
            }
        }

        assert_eq!(
            events,
            vec![
                FadeEvent::OutComplete(FadeCue::OpenPause),
                FadeEvent::InComplete(FadeCue::OpenPause),
                FadeEvent::OutComplete(FadeCue::Death),
                FadeEvent::InComplete(FadeCue::Death),
            ]
        );
    }

    #[test]
    fn cancel_owner_drops_running_and_queued_fades() {
        let mut fade = FadeTransition::default();
        fade.start(HandlerKey::Map, FadeCue::Teleport);
        fade.start(HandlerKey::Map, FadeCue::Death);
        fade.tick();

        fade.cancel_owner(HandlerKey::Map);
        assert!(!fade.is_running());
        assert_eq!(fade.opacity(), 1.0);
    }

    #[test]
    fn cancel_queued_keeps_the_running_fade() {
        let mut fade = FadeTransition::default();
        fade.start(HandlerKey::Map, FadeCue::Death);
        fade.start(HandlerKey::StageSelect, FadeCue::OpenPause);
        fade.start(HandlerKey::Map, FadeCue::Teleport);
        fade.cancel_queued(HandlerKey::Map);

        let mut events = Vec::new();
        for _ in 0..FADE_FRAMES * 8 {
            if let Some(event) = fade.tick() {
                events.push(event);
            }
        }
        assert_eq!(
            events,
            vec![
                (HandlerKey::Map, FadeEvent::OutComplete(FadeCue::Death)),
                (HandlerKey::Map, FadeEvent::InComplete(FadeCue::Death)),
                (
                    HandlerKey::StageSelect,
                    FadeEvent::OutComplete(FadeCue::OpenPause)
                ),
                (
                    HandlerKey::StageSelect,
                    FadeEvent::InComplete(FadeCue::OpenPause)
                ),
            ]
        );
    }
}
