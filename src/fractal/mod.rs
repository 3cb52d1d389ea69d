//! Complex-plane grid and the escape-time iteration kernel.
//!
//! The kernel is the dominant cost center: every pixel trajectory is fully
//! local, so rows are distributed across rayon workers with no shared
//! mutable state. Serial and parallel execution produce identical fields.

pub mod palette;

use anyhow::{bail, Result};
use rayon::prelude::*;
use rustfft::num_complex::Complex;

const POWER_EPS: f32 = 1e-6;
const MAG_EPS: f32 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRect {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

impl ViewRect {
    pub fn new(x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> Self {
        Self { x_min, x_max, y_min, y_max }
    }

    pub fn center(&self) -> Complex<f32> {
        Complex {
            re: (self.x_min + self.x_max) * 0.5,
            im: (self.y_min + self.y_max) * 0.5,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for v in [self.x_min, self.x_max, self.y_min, self.y_max] {
            if !v.is_finite() {
                bail!("view rectangle has non-finite bounds");
            }
        }
        if self.x_max <= self.x_min || self.y_max <= self.y_min {
            bail!("view rectangle is degenerate");
        }
        Ok(())
    }
}

/// Dense row-major grid of complex samples, one per pixel.
pub struct ComplexGrid {
    width: usize,
    height: usize,
    points: Vec<Complex<f32>>,
}

impl ComplexGrid {
    pub fn new(width: usize, height: usize, view: ViewRect) -> Self {
        let mut points = Vec::with_capacity(width * height);
        let dx = if width > 1 {
            (view.x_max - view.x_min) / (width - 1) as f32
        } else {
            0.0
        };
        let dy = if height > 1 {
            (view.y_max - view.y_min) / (height - 1) as f32
        } else {
            0.0
        };
        for y in 0..height {
            let im = view.y_min + y as f32 * dy;
            for x in 0..width {
                points.push(Complex {
                    re: view.x_min + x as f32 * dx,
                    im,
                });
            }
        }
        Self { width, height, points }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Complex<f32>] {
        &self.points
    }

    /// Rotate every sample about `center` by `angle` radians.
    pub fn rotate_about(&mut self, center: Complex<f32>, angle: f32) {
        let rot = Complex {
            re: angle.cos(),
            im: angle.sin(),
        };
        for p in &mut self.points {
            *p = (*p - center) * rot + center;
        }
    }

    /// Constant shift of the whole plane.
    pub fn offset(&mut self, delta: Complex<f32>) {
        if delta.re == 0.0 && delta.im == 0.0 {
            return;
        }
        for p in &mut self.points {
            *p += delta;
        }
    }
}

/// Escape-time field with smooth coloring for `z -> z^p + c`.
///
/// Writes one `nu` and one escape flag per grid point into the leading
/// `grid.len()` elements of the output slices (callers hand in sub-slices
/// of max-capacity buffers). Non-escaped pixels get `nu = 0`.
pub fn render_escape_field(
    grid: &ComplexGrid,
    c: Complex<f32>,
    max_iter: u32,
    power: f32,
    nu: &mut [f32],
    escaped: &mut [bool],
    parallel: bool,
) {
    let w = grid.width();
    let n = grid.len();
    assert!(nu.len() >= n && escaped.len() >= n, "iteration buffers too small");
    let nu = &mut nu[..n];
    let escaped = &mut escaped[..n];
    let points = grid.points();

    if parallel && w > 0 {
        nu.par_chunks_mut(w)
            .zip(escaped.par_chunks_mut(w))
            .enumerate()
            .for_each(|(y, (nu_row, esc_row))| {
                let row = &points[y * w..(y + 1) * w];
                render_row(row, c, max_iter, power, nu_row, esc_row);
            });
    } else {
        render_row(points, c, max_iter, power, nu, escaped);
    }
}

fn render_row(
    points: &[Complex<f32>],
    c: Complex<f32>,
    max_iter: u32,
    power: f32,
    nu: &mut [f32],
    escaped: &mut [bool],
) {
    let quadratic = (power - 2.0).abs() < POWER_EPS;
    for (i, &z0) in points.iter().enumerate() {
        let (v, esc) = if quadratic {
            escape_quadratic(z0, c, max_iter)
        } else {
            escape_power(z0, c, max_iter, power)
        };
        nu[i] = v;
        escaped[i] = esc;
    }
}

fn escape_quadratic(z0: Complex<f32>, c: Complex<f32>, max_iter: u32) -> (f32, bool) {
    let mut zr = z0.re;
    let mut zi = z0.im;
    for k in 0..max_iter {
        let zr2 = zr * zr - zi * zi + c.re;
        zi = 2.0 * zr * zi + c.im;
        zr = zr2;

        let mag2 = zr * zr + zi * zi;
        if mag2 > 4.0 {
            return (smooth_count(k, mag2), true);
        }
    }
    (0.0, false)
}

fn escape_power(z0: Complex<f32>, c: Complex<f32>, max_iter: u32, power: f32) -> (f32, bool) {
    let mut zr = z0.re;
    let mut zi = z0.im;
    for k in 0..max_iter {
        let mag2 = zr * zr + zi * zi;
        if mag2 < MAG_EPS {
            // z^p is ill-defined at the origin; restart the trajectory at c.
            zr = c.re;
            zi = c.im;
        } else {
            let mag = mag2.sqrt();
            let arg = zi.atan2(zr);
            let new_mag = mag.powf(power);
            let new_arg = power * arg;
            zr = new_mag * new_arg.cos() + c.re;
            zi = new_mag * new_arg.sin() + c.im;
        }

        let mag2 = zr * zr + zi * zi;
        if mag2 > 4.0 {
            return (smooth_count(k, mag2), true);
        }
    }
    (0.0, false)
}

/// Continuous escape count `k + 1 - log(log|z|)/log 2`, guarded against the
/// log singularities at |z| near 0 and 1.
fn smooth_count(k: u32, mag2: f32) -> f32 {
    let log_mag = 0.5 * mag2.max(MAG_EPS).ln();
    if log_mag > MAG_EPS {
        k as f32 + 1.0 - log_mag.ln() / std::f32::consts::LN_2
    } else {
        k as f32
    }
}
