// Playlist management
// An insertion-ordered list of cue tracks, owned by the playback controller

use std::path::{Path, PathBuf};

/// A single cue track. Immutable once added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub path: PathBuf,
    pub display_name: String,
}

impl Track {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        Self { path, display_name }
    }
}

/// Ordered sequence of tracks with stable, contiguous indices.
///
/// Duplicate paths are allowed; the sound cache dedups by path, not the list.
#[derive(Debug, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track, returning its index.
    pub fn add(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    /// Empty the list. Does not touch the sound cache.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}
