// Dual-channel mixer
// Two alternating playback strips with asynchronous linear fade ramps,
// rendered inside the audio callback

use std::sync::Arc;
use std::time::Duration;

use crate::audio::decoder::DecodedSound;

/// The engine has exactly two output slots; a crossfade always runs between
/// them.
pub const NUM_CHANNELS: usize = 2;

/// Index of one of the two playback channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelId(usize);

impl ChannelId {
    pub const A: ChannelId = ChannelId(0);
    pub const B: ChannelId = ChannelId(1);

    /// The other of the two channels.
    pub fn other(self) -> ChannelId {
        ChannelId(1 - self.0)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            0 => write!(f, "A"),
            _ => write!(f, "B"),
        }
    }
}

/// Fire-and-forget commands sent from the control thread to the mixer.
///
/// Fades are not awaited and not cancellable; a new fade command simply
/// re-aims the ramp from the channel's current gain (last command wins).
#[derive(Debug)]
pub enum MixerCommand {
    /// Start `sound` looping on `channel`, fading it in over `fade` and
    /// setting the uniform output volume to `volume`.
    Play {
        channel: ChannelId,
        sound: Arc<DecodedSound>,
        volume: f32,
        fade: Duration,
    },
    /// Fade `channel` to silence; it goes idle when the ramp lands.
    FadeOut { channel: ChannelId, fade: Duration },
    Pause { channel: ChannelId },
    Resume { channel: ChannelId },
    /// Uniform volume for both channels, 0.0-1.0. Fade ramps keep their
    /// relative balance because volume is applied after the ramp gain.
    SetVolume(f32),
    /// Fade out whichever channels are busy.
    StopAll { fade: Duration },
}

/// An in-flight linear gain ramp.
#[derive(Debug, Clone, Copy)]
struct Fade {
    step: f32,
    target: f32,
}

/// One playback slot: a looping read head over a shared decoded buffer plus
/// its fade ramp.
#[derive(Debug, Default)]
struct ChannelStrip {
    sound: Option<Arc<DecodedSound>>,
    pos: usize,
    paused: bool,
    gain: f32,
    fade: Option<Fade>,
}

impl ChannelStrip {
    fn is_busy(&self) -> bool {
        self.sound.is_some()
    }

    fn start(&mut self, sound: Arc<DecodedSound>, fade_frames: u64) {
        self.sound = Some(sound);
        self.pos = 0;
        self.paused = false;
        if fade_frames == 0 {
            self.gain = 1.0;
            self.fade = None;
        } else {
            self.gain = 0.0;
            self.fade = Some(Fade {
                step: 1.0 / fade_frames as f32,
                target: 1.0,
            });
        }
    }

    fn fade_out(&mut self, fade_frames: u64) {
        if !self.is_busy() {
            return;
        }
        // A fade-out must finish even if the channel was paused
        self.paused = false;
        if fade_frames == 0 || self.gain <= 0.0 {
            self.go_idle();
        } else {
            self.fade = Some(Fade {
                step: -(self.gain / fade_frames as f32),
                target: 0.0,
            });
        }
    }

    fn go_idle(&mut self) {
        self.sound = None;
        self.pos = 0;
        self.gain = 0.0;
        self.fade = None;
        self.paused = false;
    }

    /// Produce one stereo frame and advance the read head and fade ramp.
    fn next_frame(&mut self) -> (f32, f32) {
        let (left, right, frame_count) = match &self.sound {
            Some(sound) => {
                let frame_count = sound.frame_count();
                if frame_count == 0 {
                    self.go_idle();
                    return (0.0, 0.0);
                }
                if self.paused {
                    return (0.0, 0.0);
                }
                (
                    sound.frames[self.pos * 2],
                    sound.frames[self.pos * 2 + 1],
                    frame_count,
                )
            }
            None => return (0.0, 0.0),
        };

        let out = (left * self.gain, right * self.gain);

        // Cues loop until explicitly advanced
        self.pos += 1;
        if self.pos >= frame_count {
            self.pos = 0;
        }

        if let Some(fade) = self.fade {
            self.gain += fade.step;
            let landed = if fade.step < 0.0 {
                self.gain <= fade.target
            } else {
                self.gain >= fade.target
            };
            if landed {
                self.gain = fade.target;
                self.fade = None;
                if self.gain <= 0.0 {
                    self.go_idle();
                }
            }
        }

        out
    }
}

/// The render-side half of the dual-channel player. Owned by the audio
/// callback; fed commands through a bounded channel.
pub struct Mixer {
    sample_rate: u32,
    master: f32,
    strips: [ChannelStrip; NUM_CHANNELS],
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            master: 1.0,
            strips: Default::default(),
        }
    }

    fn fade_frames(&self, fade: Duration) -> u64 {
        (fade.as_secs_f64() * self.sample_rate as f64).round() as u64
    }

    pub fn handle_command(&mut self, cmd: MixerCommand) {
        match cmd {
            MixerCommand::Play {
                channel,
                sound,
                volume,
                fade,
            } => {
                self.master = volume.clamp(0.0, 1.0);
                let frames = self.fade_frames(fade);
                self.strips[channel.index()].start(sound, frames);
            }
            MixerCommand::FadeOut { channel, fade } => {
                let frames = self.fade_frames(fade);
                self.strips[channel.index()].fade_out(frames);
            }
            MixerCommand::Pause { channel } => {
                self.strips[channel.index()].paused = true;
            }
            MixerCommand::Resume { channel } => {
                self.strips[channel.index()].paused = false;
            }
            MixerCommand::SetVolume(volume) => {
                self.master = volume.clamp(0.0, 1.0);
            }
            MixerCommand::StopAll { fade } => {
                let frames = self.fade_frames(fade);
                for strip in &mut self.strips {
                    strip.fade_out(frames);
                }
            }
        }
    }

    /// Mix one stereo frame from both channels.
    pub fn next_frame(&mut self) -> (f32, f32) {
        let mut left = 0.0;
        let mut right = 0.0;
        for strip in &mut self.strips {
            let (l, r) = strip.next_frame();
            left += l;
            right += r;
        }
        (left * self.master, right * self.master)
    }

    pub fn is_busy(&self, channel: ChannelId) -> bool {
        self.strips[channel.index()].is_busy()
    }

    pub fn channel_gain(&self, channel: ChannelId) -> f32 {
        self.strips[channel.index()].gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_sound(value: f32, frames: usize) -> Arc<DecodedSound> {
        Arc::new(DecodedSound::from_frames(
            std::iter::repeat(value).take(frames * 2).collect(),
            100,
        ))
    }

    fn render(mixer: &mut Mixer, frames: usize) -> Vec<(f32, f32)> {
        (0..frames).map(|_| mixer.next_frame()).collect()
    }

    #[test]
    fn test_instant_play_renders_at_full_gain() {
        let mut mixer = Mixer::new(100);
        mixer.handle_command(MixerCommand::Play {
            channel: ChannelId::A,
            sound: constant_sound(0.5, 10),
            volume: 1.0,
            fade: Duration::ZERO,
        });

        let out = render(&mut mixer, 4);
        for (l, r) in out {
            assert!((l - 0.5).abs() < 1e-6);
            assert!((r - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_fade_in_ramps_linearly() {
        let mut mixer = Mixer::new(100);
        mixer.handle_command(MixerCommand::Play {
            channel: ChannelId::A,
            sound: constant_sound(1.0, 1000),
            volume: 1.0,
            fade: Duration::from_secs(1), // 100 frames at 100 Hz
        });

        render(&mut mixer, 50);
        let gain = mixer.channel_gain(ChannelId::A);
        assert!((gain - 0.5).abs() < 0.02, "gain at midpoint was {gain}");

        render(&mut mixer, 60);
        assert!((mixer.channel_gain(ChannelId::A) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_crossfade_swaps_busy_channels() {
        let mut mixer = Mixer::new(100);
        mixer.handle_command(MixerCommand::Play {
            channel: ChannelId::A,
            sound: constant_sound(1.0, 1000),
            volume: 1.0,
            fade: Duration::ZERO,
        });
        render(&mut mixer, 10);

        mixer.handle_command(MixerCommand::FadeOut {
            channel: ChannelId::A,
            fade: Duration::from_secs(1),
        });
        mixer.handle_command(MixerCommand::Play {
            channel: ChannelId::B,
            sound: constant_sound(1.0, 1000),
            volume: 1.0,
            fade: Duration::from_secs(1),
        });

        render(&mut mixer, 50);
        assert!(mixer.channel_gain(ChannelId::A) < 0.6);
        assert!(mixer.channel_gain(ChannelId::B) > 0.4);
        assert!(mixer.is_busy(ChannelId::A));
        assert!(mixer.is_busy(ChannelId::B));

        // After the full fade the outgoing channel has gone idle
        render(&mut mixer, 60);
        assert!(!mixer.is_busy(ChannelId::A));
        assert!(mixer.is_busy(ChannelId::B));
        assert!((mixer.channel_gain(ChannelId::B) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_playback_loops() {
        let mut mixer = Mixer::new(100);
        let sound = Arc::new(DecodedSound::from_frames(
            vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3],
            100,
        ));
        mixer.handle_command(MixerCommand::Play {
            channel: ChannelId::A,
            sound,
            volume: 1.0,
            fade: Duration::ZERO,
        });

        let out = render(&mut mixer, 7);
        let lefts: Vec<f32> = out.iter().map(|(l, _)| *l).collect();
        assert_eq!(lefts, vec![0.1, 0.2, 0.3, 0.1, 0.2, 0.3, 0.1]);
    }

    #[test]
    fn test_pause_freezes_position_and_outputs_silence() {
        let mut mixer = Mixer::new(100);
        let sound = Arc::new(DecodedSound::from_frames(
            vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3, 0.4, 0.4],
            100,
        ));
        mixer.handle_command(MixerCommand::Play {
            channel: ChannelId::A,
            sound,
            volume: 1.0,
            fade: Duration::ZERO,
        });
        render(&mut mixer, 2); // consumed 0.1, 0.2

        mixer.handle_command(MixerCommand::Pause {
            channel: ChannelId::A,
        });
        let paused = render(&mut mixer, 5);
        assert!(paused.iter().all(|&(l, r)| l == 0.0 && r == 0.0));

        mixer.handle_command(MixerCommand::Resume {
            channel: ChannelId::A,
        });
        let (l, _) = mixer.next_frame();
        assert!((l - 0.3).abs() < 1e-6, "resume restarted the buffer");
    }

    #[test]
    fn test_volume_scales_both_channels_uniformly() {
        let mut mixer = Mixer::new(100);
        mixer.handle_command(MixerCommand::Play {
            channel: ChannelId::A,
            sound: constant_sound(1.0, 100),
            volume: 1.0,
            fade: Duration::ZERO,
        });
        mixer.handle_command(MixerCommand::Play {
            channel: ChannelId::B,
            sound: constant_sound(1.0, 100),
            volume: 1.0,
            fade: Duration::ZERO,
        });
        mixer.handle_command(MixerCommand::SetVolume(0.25));

        let (l, r) = mixer.next_frame();
        assert!((l - 0.5).abs() < 1e-6); // two unit channels at quarter volume
        assert!((r - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_stop_all_fades_out_busy_channels() {
        let mut mixer = Mixer::new(100);
        mixer.handle_command(MixerCommand::Play {
            channel: ChannelId::A,
            sound: constant_sound(1.0, 100),
            volume: 1.0,
            fade: Duration::ZERO,
        });
        mixer.handle_command(MixerCommand::StopAll {
            fade: Duration::from_millis(100), // 10 frames
        });

        render(&mut mixer, 15);
        assert!(!mixer.is_busy(ChannelId::A));
        assert!(!mixer.is_busy(ChannelId::B));
        let (l, r) = mixer.next_frame();
        assert_eq!((l, r), (0.0, 0.0));
    }

    #[test]
    fn test_fade_out_on_idle_channel_is_a_no_op() {
        let mut mixer = Mixer::new(100);
        mixer.handle_command(MixerCommand::FadeOut {
            channel: ChannelId::B,
            fade: Duration::from_secs(1),
        });
        assert!(!mixer.is_busy(ChannelId::B));
        assert_eq!(mixer.next_frame(), (0.0, 0.0));
    }

    #[test]
    fn test_new_fade_reaims_from_current_gain() {
        let mut mixer = Mixer::new(100);
        mixer.handle_command(MixerCommand::Play {
            channel: ChannelId::A,
            sound: constant_sound(1.0, 1000),
            volume: 1.0,
            fade: Duration::from_secs(1),
        });
        render(&mut mixer, 50); // ~0.5 gain mid fade-in

        // Last command wins: fade back out from wherever the ramp is now
        mixer.handle_command(MixerCommand::FadeOut {
            channel: ChannelId::A,
            fade: Duration::from_millis(500), // 50 frames
        });
        render(&mut mixer, 55);
        assert!(!mixer.is_busy(ChannelId::A));
    }

    #[test]
    fn test_channel_id_alternation() {
        assert_eq!(ChannelId::A.other(), ChannelId::B);
        assert_eq!(ChannelId::B.other(), ChannelId::A);
        assert_eq!(ChannelId::A.other().other(), ChannelId::A);
    }
}
