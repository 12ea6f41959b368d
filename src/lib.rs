// Cuedeck - live-event cue playback engine
// Dual-channel crossfade core with a preloaded sound cache; the control
// surface is an external caller driving PlaybackController

pub mod audio;
pub mod controller;
pub mod error;
pub mod playlist;
pub mod preload;
pub mod scanner;
pub mod settings;

pub use audio::{AudioOutput, ChannelId, DecodedSound, DualChannelPlayer, SoundCache};
pub use controller::{ControllerEvent, PlaybackController, PlaybackState, Severity};
pub use error::PlayerError;
pub use playlist::{Playlist, Track};
pub use settings::Settings;
