//! Frame-at-a-time render pipeline.
//!
//! Owns every buffer the render touches (grid, iteration field,
//! normalization scratch, RGB staging) so per-frame heap churn stays at
//! zero: buffers are sized once for the largest shape the sequence can
//! reach and sliced per frame. Frames are produced and emitted strictly in
//! index order; frame i+1 depends on frame i through `ContinuityState`.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Context, Result};

use crate::features::FeatureFrame;
use crate::fractal::palette::{map_colors, ToneMap};
use crate::fractal::{render_escape_field, ComplexGrid};
use crate::motion::{map_target, ContinuityState};
use crate::presets::Preset;

/// Ordered consumer of finished RGB frames (normally an ffmpeg child
/// process; tests substitute an in-memory sink).
pub trait FrameSink {
    fn append(&mut self, rgb: &[u8]) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOutcome {
    pub frames_emitted: usize,
    pub cancelled: bool,
}

pub struct FramePipeline {
    preset: Preset,
    width: usize,
    height: usize,
    parallel: bool,
    total_frames: usize,
    state: ContinuityState,
    grid: Option<ComplexGrid>,
    nu_buf: Vec<f32>,
    esc_buf: Vec<bool>,
    norm_buf: Vec<f32>,
    rgb_buf: Vec<u8>,
    out_buf: Vec<u8>,
}

impl FramePipeline {
    pub fn new(
        preset: Preset,
        width: usize,
        height: usize,
        total_frames: usize,
        parallel: bool,
    ) -> Result<Self> {
        preset.validate()?;
        if width == 0 || height == 0 {
            bail!("output dimensions must be >= 1");
        }
        if total_frames == 0 {
            bail!("nothing to render: feature track is empty");
        }

        let (max_w, max_h) = if preset.dynamic_dimensions() {
            grown_dims(width, height, preset.dimension_growth, total_frames)
        } else {
            (width, height)
        };
        let max_px = max_w
            .checked_mul(max_h)
            .filter(|&n| n <= 1 << 28)
            .context("dynamic dimension growth overflows a sane buffer size")?;

        Ok(Self {
            preset,
            width,
            height,
            parallel,
            total_frames,
            state: ContinuityState::new(),
            grid: None,
            nu_buf: vec![0.0; max_px],
            esc_buf: vec![false; max_px],
            norm_buf: Vec::with_capacity(max_px),
            rgb_buf: vec![0; max_px * 3],
            out_buf: vec![0; width * height * 3],
        })
    }

    /// Grid shape for frame `index` under dynamic dimension growth.
    pub fn frame_dims(&self, index: usize) -> (usize, usize) {
        if self.preset.dynamic_dimensions() {
            grown_dims(self.width, self.height, self.preset.dimension_growth, index)
        } else {
            (self.width, self.height)
        }
    }

    /// Render the whole sequence into `sink`, in strict frame order.
    ///
    /// The cancellation flag is polled at frame boundaries only; a cancelled
    /// render is a successful early termination with a partial count.
    /// `progress` is observational and runs on this thread after each frame.
    pub fn render<S, F>(
        &mut self,
        frames: &[FeatureFrame],
        sink: &mut S,
        cancel: &AtomicBool,
        mut progress: F,
    ) -> Result<RenderOutcome>
    where
        S: FrameSink + ?Sized,
        F: FnMut(usize, usize),
    {
        if frames.len() > self.total_frames {
            bail!(
                "feature track ({}) exceeds the pipeline capacity ({})",
                frames.len(),
                self.total_frames
            );
        }

        let total = frames.len();
        let tone = ToneMap {
            stretch_lo: self.preset.stretch_lo,
            stretch_hi: self.preset.stretch_hi,
            contrast: self.preset.contrast,
            gamma: self.preset.gamma,
        };
        let mut emitted = 0usize;

        for (i, frame) in frames.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                return Ok(RenderOutcome {
                    frames_emitted: emitted,
                    cancelled: true,
                });
            }

            let (cw, ch) = self.frame_dims(i);
            let grid = self.prepare_grid(cw, ch);

            let c_target = map_target(frame, &self.preset);
            let c = self.state.advance(c_target, frame.index, &self.preset);

            let n = cw * ch;
            render_escape_field(
                &grid,
                c,
                self.preset.max_iter,
                self.preset.power,
                &mut self.nu_buf[..n],
                &mut self.esc_buf[..n],
                self.parallel,
            );
            map_colors(
                &self.nu_buf[..n],
                &self.esc_buf[..n],
                &tone,
                &self.preset.palette,
                &mut self.norm_buf,
                &mut self.rgb_buf[..n * 3],
            );
            self.grid = Some(grid);

            let out: &[u8] = if cw != self.width || ch != self.height {
                resize_area(
                    &self.rgb_buf[..n * 3],
                    cw,
                    ch,
                    self.width,
                    self.height,
                    &mut self.out_buf,
                );
                &self.out_buf
            } else {
                &self.rgb_buf[..n * 3]
            };

            sink.append(out).with_context(|| format!("append frame {i}"))?;
            emitted += 1;
            progress(emitted, total);
        }

        Ok(RenderOutcome {
            frames_emitted: emitted,
            cancelled: false,
        })
    }

    /// Reuse the cached grid when nothing about it can have changed;
    /// rebuild it when rotation advances or the shape grows.
    fn prepare_grid(&mut self, cw: usize, ch: usize) -> ComplexGrid {
        let fresh = self.preset.dynamic_dimensions() || self.preset.rotation_enabled();
        if !fresh {
            if let Some(grid) = self.grid.take() {
                return grid;
            }
        }

        let mut grid = ComplexGrid::new(cw, ch, self.preset.view);
        if self.preset.rotation_enabled() {
            let angle = self.state.rotate(self.preset.rotation_velocity);
            grid.rotate_about(self.preset.view.center(), angle);
        }
        grid.offset(self.preset.z_offset);
        grid
    }
}

fn grown_dims(width: usize, height: usize, growth: f32, steps: usize) -> (usize, usize) {
    let g = (growth as f64).powi(steps as i32);
    let w = ((width as f64) * g) as usize;
    let h = ((height as f64) * g) as usize;
    (w.max(1), h.max(1))
}

/// Area-average downscale from (sw, sh) to (dw, dh), RGB8 row-major.
/// Dest pixels average the source box they cover; never upsamples past the
/// source (callers only shrink).
pub fn resize_area(src: &[u8], sw: usize, sh: usize, dw: usize, dh: usize, dst: &mut [u8]) {
    debug_assert!(src.len() >= sw * sh * 3);
    debug_assert!(dst.len() >= dw * dh * 3);

    for y in 0..dh {
        let y0 = y * sh / dh;
        let y1 = (((y + 1) * sh).div_ceil(dh)).clamp(y0 + 1, sh);
        for x in 0..dw {
            let x0 = x * sw / dw;
            let x1 = (((x + 1) * sw).div_ceil(dw)).clamp(x0 + 1, sw);

            let mut acc = [0u32; 3];
            for sy in y0..y1 {
                let row = sy * sw;
                for sx in x0..x1 {
                    let s = (row + sx) * 3;
                    acc[0] += src[s] as u32;
                    acc[1] += src[s + 1] as u32;
                    acc[2] += src[s + 2] as u32;
                }
            }
            let count = ((y1 - y0) * (x1 - x0)) as u32;
            let d = (y * dw + x) * 3;
            dst[d] = (acc[0] / count) as u8;
            dst[d + 1] = (acc[1] / count) as u8;
            dst[d + 2] = (acc[2] / count) as u8;
        }
    }
}
