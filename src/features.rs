//! Feature conditioning: robust percentile normalization into [0,1] followed
//! by asymmetric attack/release smoothing. Deterministic and purely
//! data-dependent.

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureFrame {
    pub energy: f32,
    pub brightness: f32,
    pub index: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureConfig {
    /// Percentile band used for outlier clipping before rescale.
    pub lo_percentile: f32,
    pub hi_percentile: f32,
    /// Coefficient applied while the signal rises (fast).
    pub energy_attack: f32,
    /// Coefficient applied while the signal falls (slow decay).
    pub energy_release: f32,
    /// Centroid-like signals are noisier, so brightness smooths harder.
    pub brightness_attack: f32,
    pub brightness_release: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            lo_percentile: 5.0,
            hi_percentile: 95.0,
            energy_attack: 0.30,
            energy_release: 0.12,
            brightness_attack: 0.15,
            brightness_release: 0.06,
        }
    }
}

/// Linear-interpolated percentile of `xs`, `pct` in [0, 100].
pub fn percentile(xs: &[f32], pct: f32) -> f32 {
    debug_assert!(!xs.is_empty());
    let mut sorted = xs.to_vec();
    sorted.sort_by(f32::total_cmp);
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (n - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Clip to the [lo_pct, hi_pct] percentile band and rescale to [0,1].
pub fn normalize_robust(xs: &[f32], lo_pct: f32, hi_pct: f32) -> Vec<f32> {
    if xs.is_empty() {
        return Vec::new();
    }
    let p_lo = percentile(xs, lo_pct);
    let p_hi = percentile(xs, hi_pct);
    let clipped = xs
        .iter()
        .map(|&x| x.clamp(p_lo, p_hi))
        .collect::<Vec<_>>();
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &x in &clipped {
        min = min.min(x);
        max = max.max(x);
    }
    let span = max - min + 1e-12;
    clipped.into_iter().map(|x| (x - min) / span).collect()
}

/// One-pole smoothing with separate coefficients for rising and falling
/// samples; `y[0] = x[0]`.
pub fn smooth_attack_release(xs: &[f32], attack: f32, release: f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(xs.len());
    let mut prev = match xs.first() {
        Some(&x) => x,
        None => return out,
    };
    out.push(prev);
    for &x in &xs[1..] {
        let a = if x > prev { attack } else { release };
        prev = a * x + (1.0 - a) * prev;
        out.push(prev);
    }
    out
}

/// Condition raw energy/brightness streams into per-frame features in [0,1].
pub fn condition_features(
    energy_raw: &[f32],
    brightness_raw: &[f32],
    cfg: &FeatureConfig,
) -> Result<Vec<FeatureFrame>> {
    if energy_raw.len() != brightness_raw.len() {
        bail!(
            "feature streams differ in length ({} vs {})",
            energy_raw.len(),
            brightness_raw.len()
        );
    }
    if energy_raw.is_empty() {
        bail!("feature streams are empty");
    }
    for &x in energy_raw.iter().chain(brightness_raw.iter()) {
        if !x.is_finite() {
            bail!("feature streams contain non-finite samples");
        }
    }

    let energy = smooth_attack_release(
        &normalize_robust(energy_raw, cfg.lo_percentile, cfg.hi_percentile),
        cfg.energy_attack,
        cfg.energy_release,
    );
    let brightness = smooth_attack_release(
        &normalize_robust(brightness_raw, cfg.lo_percentile, cfg.hi_percentile),
        cfg.brightness_attack,
        cfg.brightness_release,
    );

    Ok(energy
        .into_iter()
        .zip(brightness)
        .enumerate()
        .map(|(i, (energy, brightness))| FeatureFrame {
            energy,
            brightness,
            index: i as u32,
        })
        .collect())
}
