// Background preload worker
// Decodes a batch of files into the sound cache off the control thread,
// reporting per-item results and fractional progress as it goes

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Sender;
use tracing::{info, warn};

use crate::audio::cache::SoundCache;
use crate::error::PlayerError;

/// Raw events from the preload thread. The controller drains these on the
/// control thread and turns them into presentation events; the worker itself
/// never touches the playlist or playback state.
#[derive(Debug)]
pub enum PreloadEvent {
    /// One file finished, successfully or not.
    Item {
        path: PathBuf,
        result: Result<(), PlayerError>,
    },
    /// Emitted after every item regardless of outcome.
    Progress {
        completed: usize,
        total: usize,
        path: PathBuf,
    },
    /// Emitted exactly once per batch, even if every item failed.
    Finished,
}

/// Runs at most one decode batch at a time.
pub struct PreloadWorker {
    busy: Arc<AtomicBool>,
}

impl Default for PreloadWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl PreloadWorker {
    pub fn new() -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start decoding `paths` into `cache` on a background thread.
    ///
    /// Individual decode failures are reported and skipped; they never abort
    /// the batch. Returns `PreloadBusy` while a previous batch is still
    /// running; the caller retries after `Finished`.
    pub fn spawn(
        &self,
        paths: Vec<PathBuf>,
        cache: Arc<SoundCache>,
        tx: Sender<PreloadEvent>,
    ) -> Result<(), PlayerError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(PlayerError::PreloadBusy);
        }

        let busy = self.busy.clone();
        let spawned = thread::Builder::new()
            .name("cuedeck-preload".into())
            .spawn(move || {
                let total = paths.len();
                info!(total, "preload batch started");

                for (index, path) in paths.into_iter().enumerate() {
                    let result = cache.get_or_decode(&path).map(|_| ());
                    if let Err(e) = &result {
                        warn!(path = %path.display(), "preload failed: {e}");
                    }

                    let _ = tx.send(PreloadEvent::Item {
                        path: path.clone(),
                        result,
                    });
                    let _ = tx.send(PreloadEvent::Progress {
                        completed: index + 1,
                        total,
                        path,
                    });
                }

                info!("preload batch finished");
                // Clear the flag before announcing completion so a caller
                // reacting to Finished can start the next batch immediately
                busy.store(false, Ordering::SeqCst);
                let _ = tx.send(PreloadEvent::Finished);
            });

        if let Err(e) = spawned {
            self.busy.store(false, Ordering::SeqCst);
            return Err(PlayerError::PreloadSpawn(e.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    fn write_wav(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..500i16 {
            writer.write_sample(i).unwrap();
            writer.write_sample(i).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    fn recv(rx: &crossbeam_channel::Receiver<PreloadEvent>) -> PreloadEvent {
        rx.recv_timeout(Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn test_batch_continues_past_failures_and_finishes_once() {
        let dir = tempfile::tempdir().unwrap();
        let good_a = write_wav(dir.path(), "a.wav");
        let bad = dir.path().join("broken.wav");
        std::fs::write(&bad, b"not audio").unwrap();
        let good_b = write_wav(dir.path(), "b.wav");

        let cache = Arc::new(SoundCache::new(44100));
        let worker = PreloadWorker::new();
        let (tx, rx) = crossbeam_channel::unbounded();

        worker
            .spawn(
                vec![good_a.clone(), bad.clone(), good_b.clone()],
                cache.clone(),
                tx,
            )
            .unwrap();

        // Item then Progress, per file, in order
        match recv(&rx) {
            PreloadEvent::Item { path, result } => {
                assert_eq!(path, good_a);
                assert!(result.is_ok());
            }
            other => panic!("expected Item, got {other:?}"),
        }
        match recv(&rx) {
            PreloadEvent::Progress {
                completed, total, ..
            } => {
                assert_eq!((completed, total), (1, 3));
            }
            other => panic!("expected Progress, got {other:?}"),
        }
        match recv(&rx) {
            PreloadEvent::Item { path, result } => {
                assert_eq!(path, bad);
                assert!(result.is_err());
            }
            other => panic!("expected Item, got {other:?}"),
        }
        match recv(&rx) {
            PreloadEvent::Progress { completed, .. } => assert_eq!(completed, 2),
            other => panic!("expected Progress, got {other:?}"),
        }
        match recv(&rx) {
            PreloadEvent::Item { result, .. } => assert!(result.is_ok()),
            other => panic!("expected Item, got {other:?}"),
        }
        match recv(&rx) {
            PreloadEvent::Progress {
                completed, total, ..
            } => {
                assert_eq!((completed, total), (3, 3));
            }
            other => panic!("expected Progress, got {other:?}"),
        }
        assert!(matches!(recv(&rx), PreloadEvent::Finished));

        // Nothing after Finished, and the worker is free again
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert!(!worker.is_busy());

        // Both good files made it into the cache, the bad one did not
        assert!(cache.contains(&good_a));
        assert!(cache.contains(&good_b));
        assert!(!cache.contains(&bad));
    }

    #[test]
    fn test_second_batch_rejected_while_busy() {
        let worker = PreloadWorker::new();
        worker.busy.store(true, Ordering::SeqCst);

        let cache = Arc::new(SoundCache::new(44100));
        let (tx, _rx) = crossbeam_channel::unbounded();
        let err = worker.spawn(vec![], cache, tx).unwrap_err();
        assert!(matches!(err, PlayerError::PreloadBusy));
    }

    #[test]
    fn test_worker_reusable_after_finished() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "cue.wav");

        let cache = Arc::new(SoundCache::new(44100));
        let worker = PreloadWorker::new();

        for _ in 0..2 {
            let (tx, rx) = crossbeam_channel::unbounded();
            worker.spawn(vec![path.clone()], cache.clone(), tx).unwrap();
            loop {
                if matches!(recv(&rx), PreloadEvent::Finished) {
                    break;
                }
            }
        }
        assert_eq!(cache.len(), 1);
    }
}
