// Scanner for finding audio files in a cue folder
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// List of supported audio file extensions
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "wav", "m4a", "aac", "opus", "wma",
];

/// Scan a directory recursively and return all audio file paths, sorted so a
/// cue folder always loads in the same order.
pub fn find_audio_files<P: AsRef<Path>>(directory: P) -> Vec<PathBuf> {
    let mut audio_files = Vec::new();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if let Some(extension) = path.extension() {
            let ext_str = extension.to_string_lossy().to_lowercase();
            if SUPPORTED_EXTENSIONS.contains(&ext_str.as_str()) {
                audio_files.push(path.to_path_buf());
            }
        }
    }

    audio_files.sort();
    audio_files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.wav"), b"").unwrap();
        fs::write(dir.path().join("a.mp3"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let found = find_audio_files(dir.path());
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.mp3", "b.wav"]);
    }

    #[test]
    fn test_scans_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("act2")).unwrap();
        fs::write(dir.path().join("act2").join("entrance.flac"), b"").unwrap();

        let found = find_audio_files(dir.path());
        assert_eq!(found.len(), 1);
    }
}
