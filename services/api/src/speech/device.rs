//! Host audio input and output.
//!
//! Device calls block for the length of the recording or playback, so callers
//! run them on the blocking thread pool.

use std::time::Duration;

/// Mono audio captured from an input device.
#[derive(Debug, Clone, PartialEq)]
pub struct Captured {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

pub trait AudioDevice: Send + Sync {
    /// Records from the default input device for `duration`.
    fn capture(&self, duration: Duration) -> anyhow::Result<Captured>;

    /// Plays mono `samples` on the default output device and waits for them to finish.
    fn play(&self, samples: &[f32], sample_rate: u32) -> anyhow::Result<()>;
}

/// Used when the binary is built without host audio support.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAudio;

impl AudioDevice for NoAudio {
    fn capture(&self, _duration: Duration) -> anyhow::Result<Captured> {
        anyhow::bail!("No audio input device available (built without the native-audio feature)")
    }

    fn play(&self, samples: &[f32], sample_rate: u32) -> anyhow::Result<()> {
        tracing::debug!(
            samples = samples.len(),
            sample_rate,
            "Skipping playback, no audio output device"
        );
        Ok(())
    }
}

/// The audio device this build should use.
pub fn default_device() -> std::sync::Arc<dyn AudioDevice> {
    #[cfg(feature = "native-audio")]
    {
        std::sync::Arc::new(native::CpalDevice)
    }
    #[cfg(not(feature = "native-audio"))]
    {
        std::sync::Arc::new(NoAudio)
    }
}

#[cfg(feature = "native-audio")]
pub mod native {
    use super::{AudioDevice, Captured};
    use crate::audio_utils;
    use anyhow::{Context, anyhow};
    use cpal::{
        SampleFormat, StreamConfig,
        traits::{DeviceTrait, HostTrait, StreamTrait},
    };
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
        time::Duration,
    };
    use tracing::{debug, error};

    /// Tail added after playback so the last buffer drains before the stream drops.
    const PLAYBACK_TAIL: Duration = Duration::from_millis(250);

    /// The host's default input and output devices via `cpal`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct CpalDevice;

    impl AudioDevice for CpalDevice {
        fn capture(&self, duration: Duration) -> anyhow::Result<Captured> {
            let host = cpal::default_host();
            let device = host
                .default_input_device()
                .context("No default input device")?;
            debug!(device = ?device.name().ok(), "Capturing from input device");

            let supported = device.default_input_config()?;
            let sample_format = supported.sample_format();
            let config: StreamConfig = supported.into();
            let channels = config.channels;
            let sample_rate = config.sample_rate.0;

            let buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
            let err_fn = |err: cpal::StreamError| error!("An error occurred on input stream: {}", err);
            let stream = match sample_format {
                SampleFormat::F32 => {
                    let buffer = buffer.clone();
                    device.build_input_stream(
                        &config,
                        move |data: &[f32], _: &cpal::InputCallbackInfo| {
                            if let Ok(mut buf) = buffer.lock() {
                                buf.extend_from_slice(data);
                            }
                        },
                        err_fn,
                        None,
                    )?
                }
                SampleFormat::I16 => {
                    let buffer = buffer.clone();
                    device.build_input_stream(
                        &config,
                        move |data: &[i16], _: &cpal::InputCallbackInfo| {
                            if let Ok(mut buf) = buffer.lock() {
                                buf.extend(audio_utils::convert_i16_to_f32(data));
                            }
                        },
                        err_fn,
                        None,
                    )?
                }
                other => return Err(anyhow!("Unsupported input sample format {other:?}")),
            };

            stream.play()?;
            std::thread::sleep(duration);
            drop(stream);

            let interleaved = std::mem::take(
                &mut *buffer
                    .lock()
                    .map_err(|_| anyhow!("Input buffer lock poisoned"))?,
            );
            Ok(Captured {
                samples: audio_utils::downmix(&interleaved, channels),
                sample_rate,
            })
        }

        fn play(&self, samples: &[f32], sample_rate: u32) -> anyhow::Result<()> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .context("No default output device")?;
            let supported = device.default_output_config()?;
            if supported.sample_format() != SampleFormat::F32 {
                return Err(anyhow!(
                    "Unsupported output sample format {:?}",
                    supported.sample_format()
                ));
            }
            let config: StreamConfig = supported.into();
            let channels = config.channels as usize;
            let out_rate = config.sample_rate.0;

            let mono = audio_utils::resample(samples, sample_rate, out_rate)?;
            let playback_time = Duration::from_secs_f64(mono.len() as f64 / out_rate as f64);
            let source = Arc::new(Mutex::new(VecDeque::from(mono)));
            let stream = device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut source = match source.lock() {
                        Ok(source) => source,
                        Err(_) => return data.fill(0.0),
                    };
                    for frame in data.chunks_mut(channels) {
                        let sample = source.pop_front().unwrap_or(0.0);
                        frame.fill(sample);
                    }
                },
                |err| error!("An error occurred on output stream: {}", err),
                None,
            )?;

            stream.play()?;
            std::thread::sleep(playback_time + PLAYBACK_TAIL);
            Ok(())
        }
    }
}
