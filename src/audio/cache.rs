// Sound cache: decode once, play many
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::audio::decoder::{self, DecodedSound};
use crate::error::PlayerError;

/// Shared map of source path to decoded buffer.
///
/// Shared between the preload worker and the control thread. Decoding runs
/// outside the lock, so a race on the same path may decode twice; the first
/// insert wins and the loser's buffer is dropped, never double-inserted.
///
/// The cache deliberately outlives playlist clears so re-adding a source
/// doesn't re-decode it. There is no eviction; `clear` is the operator's
/// explicit purge.
pub struct SoundCache {
    sounds: RwLock<HashMap<PathBuf, Arc<DecodedSound>>>,
    engine_rate: u32,
}

impl SoundCache {
    /// `engine_rate` is the output device rate every buffer is decoded to.
    pub fn new(engine_rate: u32) -> Self {
        Self {
            sounds: RwLock::new(HashMap::new()),
            engine_rate,
        }
    }

    pub fn engine_rate(&self) -> u32 {
        self.engine_rate
    }

    /// Return the cached buffer, decoding (synchronously, slow) on a miss.
    pub fn get_or_decode(&self, path: &Path) -> Result<Arc<DecodedSound>, PlayerError> {
        if let Some(sound) = self.sounds.read().get(path) {
            return Ok(sound.clone());
        }

        let sound = Arc::new(decoder::decode_file(path, self.engine_rate)?);
        debug!(path = %path.display(), frames = sound.frame_count(), "decoded into cache");

        let mut sounds = self.sounds.write();
        // First writer wins if another thread decoded the same path meanwhile
        Ok(sounds
            .entry(path.to_path_buf())
            .or_insert(sound)
            .clone())
    }

    pub fn get(&self, path: &Path) -> Option<Arc<DecodedSound>> {
        self.sounds.read().get(path).cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.sounds.read().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.sounds.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.read().is_empty()
    }

    /// Drop every cached buffer.
    pub fn clear(&self) {
        self.sounds.write().clear();
    }
}
