//! Per-frame parameter mapping and frame-to-frame continuity.
//!
//! `map_target` is pure: features in, target constant out. All temporal
//! state (inertia, micro-drift, rotation accumulation) lives in
//! [`ContinuityState`], the only state carried across frames besides the
//! pipeline buffers.

use std::f32::consts::TAU;

use rustfft::num_complex::Complex;

use crate::features::FeatureFrame;
use crate::presets::Preset;

/// Target complex constant for one frame. Stateless; smoothing is applied
/// afterwards by [`ContinuityState::advance`].
pub fn map_target(frame: &FeatureFrame, preset: &Preset) -> Complex<f32> {
    let s = preset.sensitivity;
    Complex {
        re: preset.base_c.re + preset.c_offset.re + s * preset.amp.re * (frame.energy - 0.5),
        im: preset.base_c.im + preset.c_offset.im + s * preset.amp.im * (frame.brightness - 0.5),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ContinuityState {
    prev_c: Option<Complex<f32>>,
    rotation_angle: f32,
}

impl ContinuityState {
    pub fn new() -> Self {
        Self {
            prev_c: None,
            rotation_angle: 0.0,
        }
    }

    /// Smooth `c_target` with single-pole inertia and add the deterministic
    /// micro-drift sinusoid so the image never fully freezes in silence.
    pub fn advance(&mut self, c_target: Complex<f32>, frame_index: u32, preset: &Preset) -> Complex<f32> {
        let mut c = match self.prev_c {
            None => c_target,
            Some(prev) => prev + (c_target - prev).scale(preset.alpha_c),
        };

        let phase = TAU * frame_index as f32 / preset.drift_period;
        c.re += preset.drift_amp * phase.sin();
        c.im += preset.drift_amp * phase.cos();

        self.prev_c = Some(c);
        c
    }

    /// Accumulate the per-frame rotation increment; audio-independent.
    pub fn rotate(&mut self, velocity: f32) -> f32 {
        self.rotation_angle += velocity;
        self.rotation_angle
    }

    pub fn rotation_angle(&self) -> f32 {
        self.rotation_angle
    }

    pub fn prev_c(&self) -> Option<Complex<f32>> {
        self.prev_c
    }
}

impl Default for ContinuityState {
    fn default() -> Self {
        Self::new()
    }
}

/// Analytic bound on one continuity step: the inertia-limited pull towards
/// the target plus the worst-case drift contribution on both axes.
pub fn max_step_bound(prev: Complex<f32>, c_target: Complex<f32>, preset: &Preset) -> f32 {
    preset.alpha_c * (c_target - prev).norm() + std::f32::consts::SQRT_2 * preset.drift_amp
}
