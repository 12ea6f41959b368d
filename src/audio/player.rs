// Control-side handle over the two playback channels
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, warn};

use crate::audio::decoder::DecodedSound;
use crate::audio::mixer::{ChannelId, MixerCommand};

/// Owns which of the two channels is active and issues fire-and-forget
/// commands to the mixer.
///
/// Channel selection always toggles the last-used channel, even when nothing
/// is playing, so two consecutive triggers land on alternating channels and
/// produce an audible crossfade instead of restarting the same slot.
pub struct DualChannelPlayer {
    tx: Sender<MixerCommand>,
    active: Option<ChannelId>,
    last_used: ChannelId,
}

impl DualChannelPlayer {
    pub fn new(tx: Sender<MixerCommand>) -> Self {
        Self {
            tx,
            active: None,
            // First crossfade targets channel A
            last_used: ChannelId::B,
        }
    }

    fn send(&self, cmd: MixerCommand) {
        if let Err(e) = self.tx.try_send(cmd) {
            warn!("dropping mixer command, queue full or closed: {e}");
        }
    }

    /// Crossfade from whatever is sounding to `sound`.
    ///
    /// The outgoing channel (if any) fades to silence over `fade` while the
    /// target channel fades in playing `sound`, looping, at `volume`.
    /// Returns the new active channel.
    pub fn crossfade_to(
        &mut self,
        sound: Arc<DecodedSound>,
        volume: f32,
        fade: Duration,
    ) -> ChannelId {
        let target = self.last_used.other();

        if let Some(old) = self.active {
            self.send(MixerCommand::FadeOut { channel: old, fade });
        }
        self.send(MixerCommand::Play {
            channel: target,
            sound,
            volume,
            fade,
        });

        debug!(channel = %target, "crossfade started");
        self.last_used = target;
        self.active = Some(target);
        target
    }

    pub fn pause_active(&self) {
        if let Some(channel) = self.active {
            self.send(MixerCommand::Pause { channel });
        }
    }

    pub fn resume_active(&self) {
        if let Some(channel) = self.active {
            self.send(MixerCommand::Resume { channel });
        }
    }

    /// Uniform volume for both channels, 0.0-1.0.
    pub fn set_volume(&self, volume: f32) {
        self.send(MixerCommand::SetVolume(volume.clamp(0.0, 1.0)));
    }

    /// Fade out whichever channels are busy. Does not wait for the fade.
    pub fn stop_all(&mut self, fade: Duration) {
        self.send(MixerCommand::StopAll { fade });
        self.active = None;
    }

    pub fn active(&self) -> Option<ChannelId> {
        self.active
    }
}
