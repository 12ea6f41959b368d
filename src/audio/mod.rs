// Audio playback module
// Uses Symphonia for decoding and cpal for output

pub mod cache;
pub mod decoder;
pub mod mixer;
pub mod output;
pub mod player;

pub use cache::SoundCache;
pub use decoder::DecodedSound;
pub use mixer::{ChannelId, MixerCommand};
pub use output::AudioOutput;
pub use player::DualChannelPlayer;
