// Playback controller
// The control-thread state machine driving the sound cache, preload worker
// and dual-channel player. The control surface calls the operations below
// and drains `poll_events` for everything it should display.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::audio::cache::SoundCache;
use crate::audio::player::DualChannelPlayer;
use crate::error::PlayerError;
use crate::playlist::{Playlist, Track};
use crate::preload::{PreloadEvent, PreloadWorker};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Presentation events for the control surface. The core holds no display
/// handles; whoever renders the surface drains these.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    TrackAdded {
        path: PathBuf,
    },
    PreloadProgress {
        fraction: f32,
        current: PathBuf,
    },
    PreloadFinished,
    Status {
        message: String,
        severity: Severity,
    },
    PlayState {
        is_playing: bool,
        is_paused: bool,
    },
}

/// Where the controller is in its lifecycle.
///
/// `Stopped` keeps the selected index around so `replay` can restart the cue
/// after a fade-out; `Idle` means nothing has ever been selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Stopped,
}

pub struct PlaybackController {
    playlist: Playlist,
    cache: Arc<SoundCache>,
    player: DualChannelPlayer,
    preload: PreloadWorker,
    preload_tx: Sender<PreloadEvent>,
    preload_rx: Receiver<PreloadEvent>,
    state: PlaybackState,
    selected: Option<usize>,
    volume: f32,
    fade: Duration,
    pending: Vec<ControllerEvent>,
}

impl PlaybackController {
    pub fn new(player: DualChannelPlayer, cache: Arc<SoundCache>, settings: &Settings) -> Self {
        let (preload_tx, preload_rx) = crossbeam_channel::unbounded();
        let volume = settings.volume_percent.min(100) as f32 / 100.0;
        player.set_volume(volume);

        Self {
            playlist: Playlist::new(),
            cache,
            player,
            preload: PreloadWorker::new(),
            preload_tx,
            preload_rx,
            state: PlaybackState::Idle,
            selected: None,
            volume,
            fade: Duration::from_millis(settings.fade_ms),
            pending: Vec::new(),
        }
    }

    fn push_status(&mut self, message: String, severity: Severity) {
        self.pending.push(ControllerEvent::Status { message, severity });
    }

    fn push_play_state(&mut self) {
        self.pending.push(ControllerEvent::PlayState {
            is_playing: self.state == PlaybackState::Playing,
            is_paused: self.state == PlaybackState::Paused,
        });
    }

    /// Kick off background preloading of `paths`. Tracks appear in the
    /// playlist as their decodes succeed, via `poll_events`.
    pub fn add_tracks(&mut self, paths: Vec<PathBuf>) -> Result<(), PlayerError> {
        if paths.is_empty() {
            return Ok(());
        }
        let count = paths.len();
        match self
            .preload
            .spawn(paths, self.cache.clone(), self.preload_tx.clone())
        {
            Ok(()) => {
                self.push_status(format!("preloading {count} tracks"), Severity::Info);
                Ok(())
            }
            Err(e) => {
                self.push_status(
                    "a preload is already running; retry when it finishes".to_string(),
                    Severity::Warning,
                );
                Err(e)
            }
        }
    }

    /// Trigger the cue at `index` with a crossfade from whatever is sounding.
    ///
    /// Out-of-range indices are a no-op, reported as a status event. A cache
    /// miss falls back to a synchronous decode (the one accepted stall); if
    /// that also fails, playback state is left untouched.
    pub fn select(&mut self, index: usize) -> Result<(), PlayerError> {
        let Some(track) = self.playlist.get(index) else {
            warn!(index, len = self.playlist.len(), "select out of range");
            self.push_status(
                format!("track {index} is out of range"),
                Severity::Warning,
            );
            return Ok(());
        };
        let path = track.path.clone();
        let name = track.display_name.clone();

        let sound = match self.cache.get_or_decode(&path) {
            Ok(sound) => sound,
            Err(e) => {
                let err = PlayerError::CacheMissFallback {
                    path,
                    reason: e.to_string(),
                };
                self.push_status(format!("cannot play {name}: {err}"), Severity::Error);
                return Err(err);
            }
        };

        let channel = self.player.crossfade_to(sound, self.volume, self.fade);
        self.state = PlaybackState::Playing;
        self.selected = Some(index);
        info!(index, %channel, "cue triggered");
        self.push_status(format!("playing {name}"), Severity::Info);
        self.push_play_state();
        Ok(())
    }

    pub fn toggle_play_pause(&mut self) {
        match self.state {
            PlaybackState::Playing => {
                self.player.pause_active();
                self.state = PlaybackState::Paused;
                self.push_status("paused".to_string(), Severity::Info);
                self.push_play_state();
            }
            PlaybackState::Paused => {
                self.player.resume_active();
                self.state = PlaybackState::Playing;
                self.push_status("resumed".to_string(), Severity::Info);
                self.push_play_state();
            }
            PlaybackState::Idle | PlaybackState::Stopped => {
                if self.playlist.is_empty() {
                    return;
                }
                let index = self.selected.unwrap_or(0);
                let _ = self.select(index);
            }
        }
    }

    /// Restart the current cue from the top with a fresh crossfade.
    pub fn replay(&mut self) {
        if let Some(index) = self.selected {
            let _ = self.select(index);
        }
    }

    /// Advance to the following cue; no-op at the end of the list.
    pub fn next(&mut self) {
        let Some(index) = self.selected else {
            return;
        };
        if index + 1 < self.playlist.len() {
            let _ = self.select(index + 1);
        } else {
            debug!(index, "already at the last cue");
            self.push_status("end of playlist".to_string(), Severity::Info);
        }
    }

    /// Fade everything out. The selected index survives for `replay`.
    pub fn stop(&mut self) {
        self.player.stop_all(self.fade);
        self.state = PlaybackState::Stopped;
        self.push_status("stopped".to_string(), Severity::Info);
        self.push_play_state();
    }

    /// Set output volume as a percentage, applied to both channels at once.
    pub fn set_volume(&mut self, percent: u8) {
        self.volume = percent.min(100) as f32 / 100.0;
        self.player.set_volume(self.volume);
    }

    /// Stop playback and empty the playlist. The sound cache is kept, so
    /// re-adding any of these files won't re-decode them.
    pub fn clear_playlist(&mut self) {
        self.stop();
        self.playlist.clear();
        self.selected = None;
        self.state = PlaybackState::Idle;
        self.push_status("playlist cleared".to_string(), Severity::Info);
    }

    /// Drain worker notifications on the control thread and hand back
    /// everything the surface should display.
    ///
    /// This is the single hand-off point between the preload thread and the
    /// control context: playlist mutation happens here, never on the worker.
    pub fn poll_events(&mut self) -> Vec<ControllerEvent> {
        while let Ok(event) = self.preload_rx.try_recv() {
            match event {
                PreloadEvent::Item { path, result } => match result {
                    Ok(()) => {
                        self.playlist.add(Track::new(&path));
                        self.pending.push(ControllerEvent::TrackAdded { path });
                    }
                    Err(e) => {
                        self.push_status(
                            format!("failed to preload {}: {e}", path.display()),
                            Severity::Error,
                        );
                    }
                },
                PreloadEvent::Progress {
                    completed,
                    total,
                    path,
                } => {
                    let fraction = if total == 0 {
                        1.0
                    } else {
                        completed as f32 / total as f32
                    };
                    self.pending.push(ControllerEvent::PreloadProgress {
                        fraction,
                        current: path,
                    });
                }
                PreloadEvent::Finished => {
                    self.pending.push(ControllerEvent::PreloadFinished);
                    self.push_status(
                        "preload finished, all cues ready".to_string(),
                        Severity::Info,
                    );
                }
            }
        }
        std::mem::take(&mut self.pending)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn is_preloading(&self) -> bool {
        self.preload.is_busy()
    }
}
