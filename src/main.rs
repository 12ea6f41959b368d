// Cuedeck operator console
// A minimal line-driven control surface over the playback core, standing in
// for the real front-of-house UI

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::RecvTimeoutError;
use tracing_subscriber::EnvFilter;

use cuedeck::{
    scanner, AudioOutput, ControllerEvent, DualChannelPlayer, PlaybackController, Settings,
    Severity, SoundCache,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let settings = Settings::load(Path::new(".")).unwrap_or_default();

    let output = AudioOutput::start().context("failed to start audio output")?;
    let cache = Arc::new(SoundCache::new(output.sample_rate()));
    let player = DualChannelPlayer::new(output.sender());
    let mut controller = PlaybackController::new(player, cache, &settings);

    println!("cuedeck console");
    println!("commands: add <file|dir>  play <n>  pause  replay  next  stop  vol <0-100>  list  clear  quit");

    // stdin gets its own thread so the control loop keeps pumping events
    // while the operator isn't typing
    let (line_tx, line_rx) = crossbeam_channel::unbounded::<String>();
    std::thread::spawn(move || {
        let mut line = String::new();
        loop {
            line.clear();
            match std::io::stdin().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if line_tx.send(line.trim_end().to_string()).is_err() {
                        break;
                    }
                }
            }
        }
    });

    loop {
        for event in controller.poll_events() {
            print_event(&event);
        }

        let line = match line_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let (cmd, arg) = match line.split_once(' ') {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line.as_str(), ""),
        };

        match cmd {
            "add" => {
                if arg.is_empty() {
                    println!("usage: add <file|dir>");
                    continue;
                }
                let path = PathBuf::from(arg);
                let paths = if path.is_dir() {
                    scanner::find_audio_files(&path)
                } else {
                    vec![path]
                };
                if paths.is_empty() {
                    println!("no audio files found at {arg}");
                    continue;
                }
                // Rejection while a batch is running is already surfaced as
                // a status event
                let _ = controller.add_tracks(paths);
            }
            "play" => match arg.parse::<usize>() {
                Ok(index) => {
                    let _ = controller.select(index);
                }
                Err(_) => println!("usage: play <index>"),
            },
            "pause" | "p" => controller.toggle_play_pause(),
            "replay" | "r" => controller.replay(),
            "next" | "n" => controller.next(),
            "stop" | "s" => controller.stop(),
            "vol" => match arg.parse::<u32>() {
                Ok(percent) => controller.set_volume(percent.min(100) as u8),
                Err(_) => println!("usage: vol <0-100>"),
            },
            "list" | "l" => {
                for (index, track) in controller.playlist().iter().enumerate() {
                    let marker = if controller.selected() == Some(index) {
                        ">"
                    } else {
                        " "
                    };
                    println!("{marker} {index:3}  {}", track.display_name);
                }
            }
            "clear" => controller.clear_playlist(),
            "quit" | "q" => break,
            "" => {}
            other => println!("unknown command: {other}"),
        }
    }

    Ok(())
}

fn print_event(event: &ControllerEvent) {
    match event {
        ControllerEvent::TrackAdded { path } => {
            println!("+ {}", path.display());
        }
        ControllerEvent::PreloadProgress { fraction, current } => {
            let name = current
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown");
            println!("  preloading {name} ({:3.0}%)", fraction * 100.0);
        }
        ControllerEvent::PreloadFinished => {
            println!("  all cues loaded, playback will be instant");
        }
        ControllerEvent::Status { message, severity } => match severity {
            Severity::Info => println!("* {message}"),
            Severity::Warning => println!("! {message}"),
            Severity::Error => eprintln!("!! {message}"),
        },
        ControllerEvent::PlayState {
            is_playing,
            is_paused,
        } => {
            let state = if *is_playing {
                "playing"
            } else if *is_paused {
                "paused"
            } else {
                "stopped"
            };
            println!("  [{state}]");
        }
    }
}
