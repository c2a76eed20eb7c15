use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

use crate::error::DeviceError;

const TARGET_RATE: u32 = 16000;

/// Check that a default input device exists without opening it.
pub fn probe_input_device() -> Result<(), DeviceError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(DeviceError::NoInputDevice)?;
    log::info!("Input device: {:?}", device.description());
    Ok(())
}

/// Start capturing audio from the default input device.
/// Samples are appended to the shared buffer at ~16kHz mono f32.
/// Drop the returned `Stream` to stop recording and release the device.
pub fn start_capture(buffer: Arc<Mutex<Vec<f32>>>) -> Result<(cpal::Stream, u32), DeviceError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(DeviceError::NoInputDevice)?;

    let supported_configs: Vec<_> = device
        .supported_input_configs()
        .map_err(|e| DeviceError::Stream(e.to_string()))?
        .collect();

    let desired = supported_configs.iter().find(|c| {
        c.channels() == 1
            && c.min_sample_rate() <= TARGET_RATE
            && c.max_sample_rate() >= TARGET_RATE
            && c.sample_format() == cpal::SampleFormat::F32
    });

    let (config, native_rate, downsample_factor) = if let Some(cfg) = desired {
        (cfg.with_sample_rate(TARGET_RATE).config(), TARGET_RATE, 1usize)
    } else {
        let default_config = device
            .default_input_config()
            .map_err(|e| DeviceError::Stream(e.to_string()))?;
        let rate = default_config.sample_rate();
        let factor = (rate / TARGET_RATE).max(1) as usize;
        let actual_rate = rate / factor as u32;
        log::info!("Using native rate {rate}Hz, downsampling by {factor}x to ~{actual_rate}Hz");
        (default_config.config(), actual_rate, factor)
    };

    let channels = config.channels as usize;

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let Ok(mut buf) = buffer.lock() else {
                    return;
                };
                for (i, chunk) in data.chunks(channels).enumerate() {
                    if i % downsample_factor == 0 {
                        buf.push(chunk.iter().sum::<f32>() / channels as f32);
                    }
                }
            },
            |err| log::error!("Input stream error: {err}"),
            None,
        )
        .map_err(|e| DeviceError::Stream(e.to_string()))?;

    stream
        .play()
        .map_err(|e| DeviceError::Stream(e.to_string()))?;
    Ok((stream, native_rate))
}

/// RMS of the most recent `window` samples.
pub fn recent_rms(samples: &[f32], window: usize) -> f32 {
    let n = samples.len().min(window);
    if n == 0 {
        return 0.0;
    }
    let sum_sq: f32 = samples[samples.len() - n..].iter().map(|&s| s * s).sum();
    (sum_sq / n as f32).sqrt()
}

/// Convert f32 samples to WAV bytes (mono 16-bit PCM).
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, DeviceError> {
    if samples.is_empty() {
        return Err(DeviceError::NoAudio);
    }
    let mut cursor = std::io::Cursor::new(Vec::new());
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let encode = |e: hound::Error| DeviceError::Encode(e.to_string());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(encode)?;
    for &s in samples {
        let clamped = s.clamp(-1.0, 1.0);
        writer
            .write_sample((clamped * i16::MAX as f32) as i16)
            .map_err(encode)?;
    }
    writer.finalize().map_err(encode)?;
    Ok(cursor.into_inner())
}
