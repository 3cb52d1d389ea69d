use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "fractal-visualizer",
    version,
    about = "Audio-reactive Julia set renderer (WAV input -> MP4 output via ffmpeg)"
)]
pub struct Config {
    #[arg(long, value_name = "WAV")]
    pub audio: PathBuf,

    #[arg(long, value_name = "MP4", default_value = "visualization.mp4")]
    pub out: PathBuf,

    #[arg(long, default_value_t = 800)]
    pub width: usize,

    #[arg(long, default_value_t = 600)]
    pub height: usize,

    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Cap the rendered duration in seconds (defaults to the clip length).
    #[arg(long, value_name = "SECONDS")]
    pub duration: Option<f32>,

    #[arg(long, value_name = "INDEX_OR_SUBSTRING")]
    pub preset: Option<String>,

    /// Override the preset's named palette (fire, ocean, deep_sea, ethereal,
    /// mathematical, abstract, warm).
    #[arg(long)]
    pub palette: Option<String>,

    /// Main color for a custom two-color palette, hex "#RRGGBB".
    /// Takes effect together with --custom-accent and wins over --palette.
    #[arg(long, value_name = "HEX")]
    pub custom_main: Option<String>,

    #[arg(long, value_name = "HEX")]
    pub custom_accent: Option<String>,

    /// Exponent p of the iteration z^p + c.
    #[arg(long, default_value_t = 2.0, allow_negative_numbers = true)]
    pub power: f32,

    /// Global multiplier on the preset's modulation amplitudes.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub sensitivity: f32,

    #[arg(long, default_value_t = false)]
    pub rotation: bool,

    /// Radians per frame, applied when --rotation is set.
    #[arg(long, default_value_t = 0.1)]
    pub rotation_velocity: f32,

    /// Grow the render grid frame-over-frame and downscale on output.
    #[arg(long, default_value_t = false)]
    pub dynamic_dimensions: bool,

    #[arg(long, default_value_t = 1.001)]
    pub dimension_factor: f32,

    /// Encoder quality knob, 5 (fast/small) ..= 10 (slow/best).
    #[arg(long, default_value_t = 8)]
    pub quality: u8,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub mux_audio: bool,

    /// Row-parallel escape kernel; identical output either way.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub parallel: bool,
}

pub fn validate_args(cfg: &Config) -> Result<()> {
    if cfg.width == 0 {
        bail!("--width must be >= 1");
    }
    if cfg.height == 0 {
        bail!("--height must be >= 1");
    }
    if cfg.fps == 0 {
        bail!("--fps must be >= 1");
    }
    if let Some(cap) = cfg.duration {
        if cap <= 0.0 {
            bail!("--duration must be > 0 seconds");
        }
    }
    if !(5..=10).contains(&cfg.quality) {
        bail!("--quality must be in 5..=10");
    }
    if !cfg.power.is_finite() || cfg.power <= 0.0 {
        bail!("--power must be a positive finite number");
    }
    if !cfg.sensitivity.is_finite() || cfg.sensitivity < 0.0 {
        bail!("--sensitivity must be finite and >= 0");
    }
    if !cfg.dimension_factor.is_finite() || cfg.dimension_factor < 1.0 {
        bail!("--dimension-factor must be >= 1.0");
    }
    if cfg.custom_main.is_some() != cfg.custom_accent.is_some() {
        bail!("--custom-main and --custom-accent must be given together");
    }
    Ok(())
}

pub fn compute_render_duration(audio_duration_s: f32, duration_cap_s: Option<f32>) -> f32 {
    let base = audio_duration_s.max(0.0);
    match duration_cap_s {
        Some(cap) => base.min(cap.max(0.0)),
        None => base,
    }
}

pub fn compute_frame_count(duration_s: f32, fps: u32) -> usize {
    ((duration_s.max(0.0) * fps as f32).floor() as usize).max(1)
}
