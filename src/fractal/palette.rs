//! Percentile contrast stretch, tone curves, and color ramps.
//!
//! Palettes are a closed enum rather than a string-keyed table: unknown
//! names are resolved (or rejected) at configuration time, never during
//! rendering.

use anyhow::{bail, Result};

use crate::features::percentile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteKind {
    Fire,
    Ocean,
    DeepSea,
    Ethereal,
    Mathematical,
    Abstract,
    Warm,
    /// Two-color ramp: darkened main -> main -> blend -> accent -> brightened accent.
    Custom { main: [u8; 3], accent: [u8; 3] },
}

const FIRE_STOPS: [[f32; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [255.0, 0.0, 0.0],
    [255.0, 255.0, 0.0],
    [255.0, 255.0, 255.0],
];

const OCEAN_STOPS: [[f32; 3]; 6] = [
    [208.0, 238.0, 233.0],
    [12.0, 30.0, 120.0],
    [46.0, 110.0, 159.0],
    [108.0, 75.0, 150.0],
    [65.0, 157.0, 141.0],
    [160.0, 220.0, 210.0],
];

const DEEP_SEA_STOPS: [[f32; 3]; 5] = [
    [3.0, 8.0, 20.0],
    [10.0, 25.0, 55.0],
    [20.0, 60.0, 90.0],
    [40.0, 100.0, 120.0],
    [90.0, 160.0, 170.0],
];

const ETHEREAL_STOPS: [[f32; 3]; 5] = [
    [212.0, 205.0, 213.0],
    [162.0, 46.0, 120.0],
    [106.0, 85.0, 181.0],
    [157.0, 141.0, 215.0],
    [186.0, 165.0, 194.0],
];

const MATHEMATICAL_STOPS: [[f32; 3]; 5] = [
    [2.0, 4.0, 10.0],
    [6.0, 12.0, 79.0],
    [20.0, 55.0, 120.0],
    [90.0, 160.0, 230.0],
    [235.0, 245.0, 255.0],
];

const ABSTRACT_STOPS: [[f32; 3]; 5] = [
    [14.0, 32.0, 28.0],
    [60.0, 35.0, 110.0],
    [40.0, 140.0, 160.0],
    [180.0, 90.0, 210.0],
    [245.0, 210.0, 90.0],
];

const WARM_STOPS: [[f32; 3]; 5] = [
    [28.0, 26.0, 40.0],
    [89.0, 51.0, 78.0],
    [210.0, 77.0, 85.0],
    [218.0, 96.0, 38.0],
    [255.0, 196.0, 4.0],
];

impl PaletteKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "fire" => Some(Self::Fire),
            "ocean" => Some(Self::Ocean),
            "deep_sea" | "deep-sea" => Some(Self::DeepSea),
            "ethereal" => Some(Self::Ethereal),
            "mathematical" => Some(Self::Mathematical),
            "abstract" => Some(Self::Abstract),
            "warm" => Some(Self::Warm),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Fire => "fire",
            Self::Ocean => "ocean",
            Self::DeepSea => "deep_sea",
            Self::Ethereal => "ethereal",
            Self::Mathematical => "mathematical",
            Self::Abstract => "abstract",
            Self::Warm => "warm",
            Self::Custom { .. } => "custom",
        }
    }

    /// Color painted on pixels that never escape.
    pub fn interior_color(&self) -> [u8; 3] {
        match self {
            Self::Fire => [0, 0, 0],
            Self::Ocean => [205, 226, 235],
            Self::DeepSea => [6, 12, 28],
            Self::Ethereal => [20, 11, 66],
            Self::Mathematical => [15, 24, 59],
            Self::Abstract => [6, 8, 22],
            Self::Warm => [18, 26, 40],
            Self::Custom { main, .. } => {
                [main[0].saturating_sub(30), main[1].saturating_sub(30), main[2].saturating_sub(30)]
            }
        }
    }

    /// Map `t` in [0,1] through the ramp by linear interpolation between the
    /// two nearest control points; never extrapolates.
    pub fn sample(&self, t: f32) -> [u8; 3] {
        match self {
            Self::Fire => sample_stops(&FIRE_STOPS, t),
            Self::Ocean => sample_stops(&OCEAN_STOPS, t),
            Self::DeepSea => sample_stops(&DEEP_SEA_STOPS, t),
            Self::Ethereal => sample_stops(&ETHEREAL_STOPS, t),
            Self::Mathematical => sample_stops(&MATHEMATICAL_STOPS, t),
            Self::Abstract => sample_stops(&ABSTRACT_STOPS, t),
            Self::Warm => sample_stops(&WARM_STOPS, t),
            Self::Custom { main, accent } => {
                let m = [main[0] as f32, main[1] as f32, main[2] as f32];
                let a = [accent[0] as f32, accent[1] as f32, accent[2] as f32];
                let stops = [
                    [m[0] * 0.1, m[1] * 0.1, m[2] * 0.1],
                    [m[0] * 0.5, m[1] * 0.5, m[2] * 0.5],
                    m,
                    [(m[0] + a[0]) * 0.5, (m[1] + a[1]) * 0.5, (m[2] + a[2]) * 0.5],
                    a,
                    [a[0] * 1.2, a[1] * 1.2, a[2] * 1.2],
                ];
                sample_stops(&stops, t)
            }
        }
    }
}

fn sample_stops(stops: &[[f32; 3]], t: f32) -> [u8; 3] {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let last = stops.len() - 1;
    let pos = t * last as f32;
    let lo = (pos.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    let frac = pos - lo as f32;
    let mut out = [0u8; 3];
    for ch in 0..3 {
        let v = stops[lo][ch] + (stops[hi][ch] - stops[lo][ch]) * frac;
        out[ch] = v.clamp(0.0, 255.0) as u8;
    }
    out
}

pub fn parse_hex_color(s: &str) -> Result<[u8; 3]> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("invalid hex color '{s}' (expected #RRGGBB)");
    }
    let mut out = [0u8; 3];
    for (i, ch) in out.iter_mut().enumerate() {
        *ch = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)?;
    }
    Ok(out)
}

/// Per-frame tone mapping parameters; the percentile pair is the robust
/// contrast-stretch band over escaped pixels only.
#[derive(Debug, Clone, Copy)]
pub struct ToneMap {
    pub stretch_lo: f32,
    pub stretch_hi: f32,
    pub contrast: f32,
    pub gamma: f32,
}

impl Default for ToneMap {
    fn default() -> Self {
        Self {
            stretch_lo: 2.0,
            stretch_hi: 98.0,
            contrast: 1.25,
            gamma: 0.85,
        }
    }
}

/// Tone-map the smooth iteration field and paint RGB8 into `rgb`.
///
/// `scratch` is the reusable normalization buffer (escaped-pixel nu values);
/// `rgb` must hold at least `3 * nu.len()` bytes. Degenerate fields (no
/// escaped pixels, or all nu equal) are epsilon-guarded, never errors.
pub fn map_colors(
    nu: &[f32],
    escaped: &[bool],
    tone: &ToneMap,
    palette: &PaletteKind,
    scratch: &mut Vec<f32>,
    rgb: &mut [u8],
) {
    let n = nu.len();
    debug_assert_eq!(escaped.len(), n);
    debug_assert!(rgb.len() >= n * 3);

    scratch.clear();
    scratch.extend(
        nu.iter()
            .zip(escaped.iter())
            .filter(|&(_, &esc)| esc)
            .map(|(&v, _)| v),
    );

    let (p_lo, p_hi) = if scratch.is_empty() {
        (0.0, 1e-6)
    } else {
        let mut lo = percentile(scratch, tone.stretch_lo);
        let mut hi = percentile(scratch, tone.stretch_hi);
        if hi - lo < 1e-6 {
            lo = scratch.iter().copied().fold(f32::INFINITY, f32::min);
            hi = scratch.iter().copied().fold(f32::NEG_INFINITY, f32::max) + 1e-6;
        }
        (lo, hi)
    };
    let inv_span = 1.0 / (p_hi - p_lo);

    let interior = palette.interior_color();
    for i in 0..n {
        let px = &mut rgb[i * 3..i * 3 + 3];
        if !escaped[i] {
            px.copy_from_slice(&interior);
            continue;
        }
        let mut t = ((nu[i] - p_lo) * inv_span).clamp(0.0, 1.0);
        t = ((t - 0.5) * tone.contrast + 0.5).clamp(0.0, 1.0);
        t = t.powf(tone.gamma);
        px.copy_from_slice(&palette.sample(t));
    }
}
