//! WAV ingestion and raw per-frame feature extraction.
//!
//! The renderer consumes two equal-length arrays (one sample per output
//! frame): RMS energy and spectral centroid. Both are raw here; robust
//! normalization and smoothing happen in [`crate::features`].

use std::path::Path;

use anyhow::{bail, Context, Result};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

const ANALYZER_WINDOW: usize = 1024;

/// Raw (unnormalized) feature streams, one sample per output video frame.
#[derive(Debug, Clone)]
pub struct RawFeatureTrack {
    pub energy: Vec<f32>,
    pub brightness: Vec<f32>,
}

pub fn read_wav_mono_f32(path: &Path) -> Result<(u32, Vec<f32>)> {
    let bytes = std::fs::read(path)?;
    if bytes.len() < 44 {
        bail!("wav too small");
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        bail!("not a RIFF/WAVE file");
    }

    let mut fmt_audio_format = 0u16;
    let mut fmt_channels = 0u16;
    let mut fmt_sample_rate = 0u32;
    let mut fmt_bits = 0u16;
    let mut data: Option<&[u8]> = None;

    let mut pos = 12usize;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size =
            u32::from_le_bytes([bytes[pos + 4], bytes[pos + 5], bytes[pos + 6], bytes[pos + 7]])
                as usize;
        let start = pos + 8;
        let end = start.saturating_add(size);
        if end > bytes.len() {
            break;
        }

        if id == b"fmt " {
            if size < 16 {
                bail!("invalid fmt chunk");
            }
            fmt_audio_format = u16::from_le_bytes([bytes[start], bytes[start + 1]]);
            fmt_channels = u16::from_le_bytes([bytes[start + 2], bytes[start + 3]]);
            fmt_sample_rate = u32::from_le_bytes([
                bytes[start + 4],
                bytes[start + 5],
                bytes[start + 6],
                bytes[start + 7],
            ]);
            fmt_bits = u16::from_le_bytes([bytes[start + 14], bytes[start + 15]]);
        } else if id == b"data" {
            data = Some(&bytes[start..end]);
        }

        pos = end + (size % 2);
    }

    let data = data.context("missing data chunk")?;
    if fmt_channels == 0 {
        bail!("invalid channel count");
    }

    match (fmt_audio_format, fmt_bits) {
        (1, 16) => {
            let ch = fmt_channels as usize;
            let total = data.len() / 2;
            let frames = total / ch;
            let mut out = Vec::<f32>::with_capacity(frames);
            for i in 0..frames {
                let mut acc = 0.0f32;
                for c in 0..ch {
                    let o = (i * ch + c) * 2;
                    let s = i16::from_le_bytes([data[o], data[o + 1]]) as f32 / 32768.0;
                    acc += s;
                }
                out.push((acc / ch as f32).clamp(-1.0, 1.0));
            }
            Ok((fmt_sample_rate, out))
        }
        (3, 32) => {
            let ch = fmt_channels as usize;
            let total = data.len() / 4;
            let frames = total / ch;
            let mut out = Vec::<f32>::with_capacity(frames);
            for i in 0..frames {
                let mut acc = 0.0f32;
                for c in 0..ch {
                    let o = (i * ch + c) * 4;
                    let s = f32::from_le_bytes([data[o], data[o + 1], data[o + 2], data[o + 3]]);
                    acc += s;
                }
                out.push((acc / ch as f32).clamp(-1.0, 1.0));
            }
            Ok((fmt_sample_rate, out))
        }
        _ => bail!(
            "unsupported wav format: audio_format={} bits={} (supported: PCM16, Float32)",
            fmt_audio_format,
            fmt_bits
        ),
    }
}

/// Compute raw RMS energy and spectral centroid, one value per output frame.
pub fn extract_raw_features(
    samples: &[f32],
    sample_rate_hz: u32,
    fps: u32,
    frame_count: usize,
) -> Result<RawFeatureTrack> {
    if samples.is_empty() {
        bail!("audio clip has no samples");
    }
    if sample_rate_hz == 0 || fps == 0 {
        bail!("sample rate and fps must be >= 1");
    }

    let n = ANALYZER_WINDOW;
    let hann = (0..n)
        .map(|i| 0.5 - 0.5 * ((2.0 * std::f32::consts::PI * i as f32) / (n as f32)).cos())
        .collect::<Vec<_>>();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n);
    let mut fft_buf = vec![Complex { re: 0.0, im: 0.0 }; n];
    let mut window = vec![0.0f32; n];

    let mut energy = Vec::with_capacity(frame_count);
    let mut brightness = Vec::with_capacity(frame_count);
    let sr = sample_rate_hz as f32;
    let fps_f = fps as f32;
    let half = n / 2;

    for frame in 0..frame_count {
        let t = frame as f32 / fps_f;
        let sample_end = ((t * sr).floor() as usize).min(samples.len());
        fill_window(samples, sample_end, &mut window);

        let mut rms_acc = 0.0f32;
        for i in 0..n {
            let s = window[i];
            rms_acc += s * s;
            fft_buf[i].re = s * hann[i];
            fft_buf[i].im = 0.0;
        }
        energy.push((rms_acc / n as f32).sqrt());

        fft.process(&mut fft_buf);

        // Spectral centroid in Hz; kept raw, percentile normalization later.
        let mut num = 0.0f32;
        let mut den = 0.0f32;
        for (i, c) in fft_buf.iter().take(half).enumerate().skip(1) {
            let m = (c.re * c.re + c.im * c.im).sqrt();
            let f = i as f32 * sr / n as f32;
            num += f * m;
            den += m;
        }
        brightness.push(if den > 1e-6 { num / den } else { 0.0 });
    }

    Ok(RawFeatureTrack { energy, brightness })
}

fn fill_window(samples: &[f32], sample_end: usize, out: &mut [f32]) {
    out.fill(0.0);
    let len = out.len();
    let end = sample_end.min(samples.len());
    let start = end.saturating_sub(len);
    let src = &samples[start..end];
    let dst_off = len.saturating_sub(src.len());
    out[dst_off..].copy_from_slice(src);
}
