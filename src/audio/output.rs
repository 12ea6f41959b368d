// Audio output using cpal
// Opens the default device and renders the dual-channel mixer in the stream
// callback, draining pending mixer commands first

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use tracing::{error, info};

use crate::audio::mixer::{Mixer, MixerCommand};
use crate::error::PlayerError;

/// Pending commands the callback can lag behind by before sends start
/// dropping; far more than a control surface can produce between callbacks.
const COMMAND_QUEUE_DEPTH: usize = 256;

pub struct AudioOutput {
    _stream: Stream,
    tx: Sender<MixerCommand>,
    sample_rate: u32,
    channels: u16,
}

impl AudioOutput {
    /// Open the default output device and start the stream.
    pub fn start() -> Result<Self, PlayerError> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or(PlayerError::NoOutputDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| PlayerError::Stream(e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        let (tx, rx) = crossbeam_channel::bounded::<MixerCommand>(COMMAND_QUEUE_DEPTH);
        let mixer = Mixer::new(sample_rate);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.into(), rx, mixer)?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.into(), rx, mixer)?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.into(), rx, mixer)?
            }
            format => return Err(PlayerError::UnsupportedFormat(format!("{format:?}"))),
        };

        stream
            .play()
            .map_err(|e| PlayerError::Stream(e.to_string()))?;

        info!(sample_rate, channels, "audio output started");

        Ok(Self {
            _stream: stream,
            tx,
            sample_rate,
            channels,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        rx: Receiver<MixerCommand>,
        mut mixer: Mixer,
    ) -> Result<Stream, PlayerError> {
        let channels = config.channels as usize;

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // Apply whatever the control thread sent since last time
                    while let Ok(cmd) = rx.try_recv() {
                        mixer.handle_command(cmd);
                    }

                    for frame in data.chunks_mut(channels) {
                        let (left, right) = mixer.next_frame();
                        if channels == 1 {
                            frame[0] = T::from_sample(0.5 * (left + right));
                            continue;
                        }
                        frame[0] = T::from_sample(left);
                        frame[1] = T::from_sample(right);
                        for sample in &mut frame[2..] {
                            *sample = T::from_sample(0.0f32);
                        }
                    }
                },
                move |err| {
                    error!("audio output error: {err}");
                },
                None,
            )
            .map_err(|e| PlayerError::Stream(e.to_string()))?;

        Ok(stream)
    }

    /// Command sender for the mixer; clones are handed to the player.
    pub fn sender(&self) -> Sender<MixerCommand> {
        self.tx.clone()
    }

    /// Rate the device runs at; decoded buffers must match it.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}
