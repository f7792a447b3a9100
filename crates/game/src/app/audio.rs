use engine::{AudioBackend, MusicTrack};
use tracing::{debug, info};

/// Audio backend that reports playback through tracing instead of a device.
#[derive(Debug, Default)]
pub(crate) struct LoggingAudio {
    music: Option<MusicTrack>,
    nsf_track: Option<u32>,
    sounds_played: u64,
}

impl LoggingAudio {
    #[cfg(test)]
    pub(crate) fn current_music(&self) -> Option<&MusicTrack> {
        self.music.as_ref()
    }
}

impl AudioBackend for LoggingAudio {
    fn play_music(&mut self, track: &MusicTrack) {
        if self.music.as_ref() == Some(track) {
            return;
        }
        info!(
            intro = track.intro.as_deref().unwrap_or("-"),
            looped = track.looped.as_deref().unwrap_or("-"),
            "music_started"
        );
        self.music = Some(track.clone());
    }

    fn stop_music(&mut self, track: &MusicTrack) {
        if self.music.as_ref() == Some(track) {
            debug!(looped = track.looped.as_deref().unwrap_or("-"), "music_stopped");
            self.music = None;
        }
    }

    fn play_nsf(&mut self, track: u32) {
        info!(track, "nsf_started");
        self.nsf_track = Some(track);
    }

    fn stop_nsf(&mut self) {
        if let Some(track) = self.nsf_track.take() {
            debug!(track, "nsf_stopped");
        }
    }

    fn play_sound(&mut self, name: &str) {
        self.sounds_played = self.sounds_played.saturating_add(1);
        debug!(sound = name, total = self.sounds_played, "sound_played");
    }
}
