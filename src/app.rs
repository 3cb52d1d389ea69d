//! Top-level orchestration: feature extraction on the calling thread, the
//! render loop on a worker thread, status flowing back over a one-way
//! channel so nothing downstream can block the pipeline.

use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::{anyhow, bail, Context, Result};

use crate::audio;
use crate::config::{self, Config};
use crate::encoder::{self, FfmpegEncoder};
use crate::features::{self, FeatureConfig};
use crate::fractal::palette::{parse_hex_color, PaletteKind};
use crate::pipeline::{FramePipeline, FrameSink};
use crate::presets::{self, Preset};

#[derive(Debug)]
pub enum RenderStatus {
    Progress { done: usize, total: usize },
    Finished { frames: usize, cancelled: bool },
    Failed { error: String },
}

/// Resolve the named preset and fold the CLI overrides into it.
pub fn build_preset(cfg: &Config) -> Result<Preset> {
    let table = presets::make_presets();
    let idx = presets::resolve_preset(cfg.preset.as_deref(), &table)?;
    let mut preset = table[idx].clone();

    if let (Some(main), Some(accent)) = (&cfg.custom_main, &cfg.custom_accent) {
        preset.palette = PaletteKind::Custom {
            main: parse_hex_color(main)?,
            accent: parse_hex_color(accent)?,
        };
    } else if let Some(name) = &cfg.palette {
        preset.palette = PaletteKind::from_name(name)
            .ok_or_else(|| anyhow!("unknown palette '{name}'"))?;
    }

    preset.power = cfg.power;
    preset.sensitivity = cfg.sensitivity;
    preset.rotation_velocity = if cfg.rotation { cfg.rotation_velocity } else { 0.0 };
    preset.dimension_growth = if cfg.dynamic_dimensions { cfg.dimension_factor } else { 1.0 };
    preset.video_quality = cfg.quality;

    preset.validate()?;
    Ok(preset)
}

pub fn run(cfg: Config) -> Result<()> {
    config::validate_args(&cfg)?;
    encoder::ensure_ffmpeg_available()?;

    let (sample_rate_hz, samples) = audio::read_wav_mono_f32(&cfg.audio)
        .with_context(|| format!("read wav {}", cfg.audio.display()))?;
    if samples.is_empty() {
        bail!("wav had no samples");
    }

    let audio_duration_s = samples.len() as f32 / sample_rate_hz as f32;
    let render_duration_s = config::compute_render_duration(audio_duration_s, cfg.duration);
    if render_duration_s <= 0.0 {
        bail!("audio duration is zero after applying --duration");
    }
    let frame_count = config::compute_frame_count(render_duration_s, cfg.fps);

    let raw = audio::extract_raw_features(&samples, sample_rate_hz, cfg.fps, frame_count)?;
    let frames = features::condition_features(&raw.energy, &raw.brightness, &FeatureConfig::default())?;

    let preset = build_preset(&cfg)?;
    let preset_name = preset.name;
    let mut pipeline = FramePipeline::new(preset, cfg.width, cfg.height, frame_count, cfg.parallel)?;
    let mut sink = FfmpegEncoder::spawn(&cfg.out, cfg.width, cfg.height, cfg.fps, cfg.quality)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let worker_cancel = Arc::clone(&cancel);
    let (tx, rx) = mpsc::channel::<RenderStatus>();

    let worker = thread::spawn(move || {
        let progress_tx = tx.clone();
        let result = pipeline.render(&frames, &mut sink, &worker_cancel, |done, total| {
            let _ = progress_tx.send(RenderStatus::Progress { done, total });
        });
        let status = match result {
            Ok(outcome) => match sink.finish() {
                Ok(()) => RenderStatus::Finished {
                    frames: outcome.frames_emitted,
                    cancelled: outcome.cancelled,
                },
                Err(err) => RenderStatus::Failed {
                    error: format!("{err:#}"),
                },
            },
            Err(err) => {
                // Dropping the sink closes the pipe and reaps ffmpeg so the
                // partial output stays playable up to the last good frame.
                drop(sink);
                RenderStatus::Failed {
                    error: format!("{err:#}"),
                }
            }
        };
        let _ = tx.send(status);
    });

    let mut final_status = None;
    for status in rx {
        match status {
            RenderStatus::Progress { done, total } => {
                eprint!("\rrendering {done}/{total} frames");
                let _ = std::io::stderr().flush();
            }
            other => {
                final_status = Some(other);
                break;
            }
        }
    }
    eprintln!();
    worker
        .join()
        .map_err(|_| anyhow!("render worker panicked"))?;

    let (rendered, cancelled) = match final_status {
        Some(RenderStatus::Finished { frames, cancelled }) => (frames, cancelled),
        Some(RenderStatus::Failed { error }) => bail!("render failed: {error}"),
        _ => bail!("render worker exited without reporting a status"),
    };

    if cfg.mux_audio && !cancelled {
        if let Err(err) = encoder::mux_audio(&cfg.out, &cfg.audio) {
            eprintln!("warning: video kept without audio track ({err:#})");
        }
    }

    println!(
        "rendered {} frames @ {} fps with preset '{}'{} -> {}",
        rendered,
        cfg.fps,
        preset_name,
        if cancelled { " (cancelled)" } else { "" },
        cfg.out.display()
    );
    Ok(())
}
