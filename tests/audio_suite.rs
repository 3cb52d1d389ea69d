use std::path::PathBuf;

use fractal_visualizer::audio::{extract_raw_features, read_wav_mono_f32};

/// Minimal PCM16 WAV writer for fixtures.
fn wav_pcm16(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let byte_rate = sample_rate * channels as u32 * 2;
    let block_align = channels * 2;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

fn write_fixture(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("fractal_visualizer_{name}_{}.wav", std::process::id()));
    std::fs::write(&path, bytes).expect("write fixture");
    path
}

fn sine(freq: f32, sample_rate: u32, seconds: f32, amplitude: f32) -> Vec<i16> {
    let n = (sample_rate as f32 * seconds) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (amplitude * (std::f32::consts::TAU * freq * t).sin() * 32767.0) as i16
        })
        .collect()
}

#[test]
fn reads_mono_pcm16() {
    let samples = sine(440.0, 8000, 0.25, 0.8);
    let path = write_fixture("mono", &wav_pcm16(8000, 1, &samples));

    let (rate, mono) = read_wav_mono_f32(&path).expect("parse should succeed");
    std::fs::remove_file(&path).ok();

    assert_eq!(rate, 8000);
    assert_eq!(mono.len(), samples.len());
    assert!(mono.iter().all(|s| (-1.0..=1.0).contains(s)));
}

#[test]
fn downmixes_stereo_to_mono() {
    // L = +0.5, R = -0.5 cancel to silence after the downmix.
    let mut interleaved = Vec::new();
    for _ in 0..400 {
        interleaved.push(16384i16);
        interleaved.push(-16384i16);
    }
    let path = write_fixture("stereo", &wav_pcm16(8000, 2, &interleaved));

    let (_, mono) = read_wav_mono_f32(&path).expect("parse should succeed");
    std::fs::remove_file(&path).ok();

    assert_eq!(mono.len(), 400);
    assert!(mono.iter().all(|s| s.abs() < 1e-3));
}

#[test]
fn rejects_garbage_and_truncated_files() {
    let path = write_fixture("garbage", b"not a wav at all");
    let err = read_wav_mono_f32(&path).expect_err("garbage must fail");
    std::fs::remove_file(&path).ok();
    assert!(err.to_string().contains("wav"));

    let mut truncated = wav_pcm16(8000, 1, &[0i16; 100]);
    truncated[0..4].copy_from_slice(b"RIFX");
    truncated.resize(60, 0);
    let path = write_fixture("badmagic", &truncated);
    assert!(read_wav_mono_f32(&path).is_err());
    std::fs::remove_file(&path).ok();
}

#[test]
fn louder_audio_yields_higher_raw_energy() {
    let quiet = sine(440.0, 8000, 1.0, 0.1)
        .iter()
        .map(|&s| s as f32 / 32768.0)
        .collect::<Vec<_>>();
    let loud = sine(440.0, 8000, 1.0, 0.9)
        .iter()
        .map(|&s| s as f32 / 32768.0)
        .collect::<Vec<_>>();

    let q = extract_raw_features(&quiet, 8000, 10, 10).expect("extract should succeed");
    let l = extract_raw_features(&loud, 8000, 10, 10).expect("extract should succeed");

    assert_eq!(q.energy.len(), 10);
    assert_eq!(q.brightness.len(), 10);
    // Skip the first frame: its window is mostly the zero-padded run-in.
    for i in 1..10 {
        assert!(
            l.energy[i] > q.energy[i],
            "frame {i}: loud {} vs quiet {}",
            l.energy[i],
            q.energy[i]
        );
    }
}

#[test]
fn higher_pitch_yields_higher_raw_brightness() {
    let low = sine(200.0, 8000, 1.0, 0.8)
        .iter()
        .map(|&s| s as f32 / 32768.0)
        .collect::<Vec<_>>();
    let high = sine(2000.0, 8000, 1.0, 0.8)
        .iter()
        .map(|&s| s as f32 / 32768.0)
        .collect::<Vec<_>>();

    let lo = extract_raw_features(&low, 8000, 10, 10).expect("extract should succeed");
    let hi = extract_raw_features(&high, 8000, 10, 10).expect("extract should succeed");

    for i in 1..10 {
        assert!(
            hi.brightness[i] > lo.brightness[i],
            "frame {i}: high {} vs low {}",
            hi.brightness[i],
            lo.brightness[i]
        );
    }
}

#[test]
fn silence_produces_zero_features_without_errors() {
    let silence = vec![0.0f32; 8000];
    let track = extract_raw_features(&silence, 8000, 30, 30).expect("extract should succeed");
    assert!(track.energy.iter().all(|&e| e == 0.0));
    assert!(track.brightness.iter().all(|&b| b == 0.0));
}
