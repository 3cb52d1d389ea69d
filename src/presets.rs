//! Named render presets and configuration validation.
//!
//! One `Preset` governs an entire render; per-frame state never mutates it.
//! The built-in table mirrors the tuned Julia presets the project ships
//! with; CLI flags may override individual fields before validation.

use anyhow::{bail, Result};
use rustfft::num_complex::Complex;

use crate::fractal::palette::PaletteKind;
use crate::fractal::ViewRect;

#[derive(Debug, Clone)]
pub struct Preset {
    pub name: &'static str,
    pub base_c: Complex<f32>,
    /// Modulation amplitude: energy drives the real axis, brightness the
    /// imaginary axis.
    pub amp: Complex<f32>,
    pub max_iter: u32,
    pub palette: PaletteKind,
    pub gamma: f32,
    pub contrast: f32,
    /// Contrast-stretch percentile band over escaped pixels.
    pub stretch_lo: f32,
    pub stretch_hi: f32,
    pub view: ViewRect,
    pub power: f32,
    pub sensitivity: f32,
    /// Inertia coefficient of the continuity controller.
    pub alpha_c: f32,
    pub drift_amp: f32,
    pub drift_period: f32,
    pub z_offset: Complex<f32>,
    pub c_offset: Complex<f32>,
    /// Radians per frame; 0 disables rotation.
    pub rotation_velocity: f32,
    /// Per-frame grid growth factor; 1.0 disables dynamic dimensions.
    pub dimension_growth: f32,
    /// Encoder quality knob, 5..=10.
    pub video_quality: u8,
}

impl Preset {
    fn base(
        name: &'static str,
        base_c: (f32, f32),
        amp: (f32, f32),
        max_iter: u32,
        palette: PaletteKind,
        gamma: f32,
        view: (f32, f32, f32, f32),
    ) -> Self {
        Self {
            name,
            base_c: Complex { re: base_c.0, im: base_c.1 },
            amp: Complex { re: amp.0, im: amp.1 },
            max_iter,
            palette,
            gamma,
            contrast: 1.25,
            stretch_lo: 2.0,
            stretch_hi: 98.0,
            view: ViewRect::new(view.0, view.1, view.2, view.3),
            power: 2.0,
            sensitivity: 1.0,
            alpha_c: 0.12,
            drift_amp: 0.0006,
            drift_period: 240.0,
            z_offset: Complex { re: 0.0, im: 0.0 },
            c_offset: Complex { re: 0.0, im: 0.0 },
            rotation_velocity: 0.0,
            dimension_growth: 1.0,
            video_quality: 8,
        }
    }

    pub fn rotation_enabled(&self) -> bool {
        self.rotation_velocity != 0.0
    }

    pub fn dynamic_dimensions(&self) -> bool {
        self.dimension_growth > 1.0
    }

    /// Fail fast before any frame is produced.
    pub fn validate(&self) -> Result<()> {
        let floats = [
            self.base_c.re,
            self.base_c.im,
            self.amp.re,
            self.amp.im,
            self.gamma,
            self.contrast,
            self.power,
            self.sensitivity,
            self.alpha_c,
            self.drift_amp,
            self.drift_period,
            self.z_offset.re,
            self.z_offset.im,
            self.c_offset.re,
            self.c_offset.im,
            self.rotation_velocity,
            self.dimension_growth,
        ];
        if floats.iter().any(|v| !v.is_finite()) {
            bail!("preset '{}' has non-finite values", self.name);
        }
        if self.max_iter == 0 {
            bail!("preset '{}': max_iter must be >= 1", self.name);
        }
        if self.gamma <= 0.0 {
            bail!("preset '{}': gamma must be > 0", self.name);
        }
        if self.power <= 0.0 {
            bail!("preset '{}': power must be > 0", self.name);
        }
        if !(0.0 < self.alpha_c && self.alpha_c <= 1.0) {
            bail!("preset '{}': alpha_c must be in (0, 1]", self.name);
        }
        if self.drift_period <= 0.0 {
            bail!("preset '{}': drift_period must be > 0", self.name);
        }
        if self.dimension_growth < 1.0 {
            bail!("preset '{}': dimension_growth must be >= 1.0", self.name);
        }
        if !(0.0..=100.0).contains(&self.stretch_lo)
            || !(0.0..=100.0).contains(&self.stretch_hi)
            || self.stretch_lo >= self.stretch_hi
        {
            bail!("preset '{}': stretch percentiles must satisfy 0 <= lo < hi <= 100", self.name);
        }
        if !(5..=10).contains(&self.video_quality) {
            bail!("preset '{}': video_quality must be in 5..=10", self.name);
        }
        self.view.validate()?;
        Ok(())
    }
}

pub fn make_presets() -> Vec<Preset> {
    use PaletteKind::*;
    vec![
        Preset::base("calm", (-0.62, 0.43), (0.12, 0.06), 400, Ocean, 0.95, (-1.2, 1.2, -1.0, 1.0)),
        Preset::base("deep_sea", (-0.75, 0.12), (0.08, 0.05), 400, DeepSea, 1.05, (-1.4, 1.4, -1.2, 1.2)),
        Preset::base("ethereal", (-0.55, 0.48), (0.18, 0.12), 400, Ethereal, 1.00, (-1.3, 1.3, -1.1, 1.1)),
        Preset::base("energetic", (-0.70, 0.27015), (0.65, 0.55), 400, Fire, 0.85, (-1.2, 1.2, -1.0, 1.0)),
        Preset::base("mathematical", (-0.40, 0.60), (0.05, 0.05), 400, Mathematical, 1.10, (-1.35, 1.35, -1.35, 1.35)),
        Preset::base("abstract", (-0.40, 0.64), (0.25, 0.30), 400, Abstract, 0.78, (-1.35, 1.35, -1.05, 1.05)),
        Preset::base("warm", (-0.68, 0.22), (0.25, 0.18), 400, Warm, 0.95, (-1.3, 1.3, -1.1, 1.1)),
    ]
}

/// Resolve a preset by index, exact name, or case-insensitive substring.
pub fn resolve_preset(selection: Option<&str>, presets: &[Preset]) -> Result<usize> {
    if presets.is_empty() {
        bail!("no presets available");
    }
    let Some(raw) = selection else {
        return Ok(0);
    };

    if let Ok(idx) = raw.parse::<usize>() {
        if idx < presets.len() {
            return Ok(idx);
        }
        bail!(
            "preset index {} out of range (0..{})",
            idx,
            presets.len().saturating_sub(1)
        );
    }

    let needle = raw.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Ok(0);
    }

    if let Some((idx, _)) = presets
        .iter()
        .enumerate()
        .find(|(_, p)| p.name.to_ascii_lowercase() == needle)
    {
        return Ok(idx);
    }

    if let Some((idx, _)) = presets
        .iter()
        .enumerate()
        .find(|(_, p)| p.name.to_ascii_lowercase().contains(&needle))
    {
        return Ok(idx);
    }

    bail!("preset '{}' not found", raw)
}
