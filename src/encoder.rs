//! ffmpeg-backed frame sink and the optional audio-mux pass.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};

use crate::pipeline::FrameSink;

pub fn ensure_ffmpeg_available() -> Result<()> {
    match Command::new("ffmpeg")
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            bail!("ffmpeg not found in PATH (install ffmpeg and retry)")
        }
        Err(err) => Err(anyhow!("failed to run ffmpeg: {err}")),
    }
}

/// x264 CRF from the 5..=10 quality knob (higher quality, lower CRF).
pub fn crf_for_quality(quality: u8) -> u8 {
    38u8.saturating_sub(quality.clamp(5, 10) * 2)
}

/// Child ffmpeg process consuming rawvideo rgb24 frames on stdin.
pub struct FfmpegEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    out: PathBuf,
    frame_len: usize,
}

impl FfmpegEncoder {
    pub fn spawn(out: &Path, width: usize, height: usize, fps: u32, quality: u8) -> Result<Self> {
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create output directory {}", parent.display()))?;
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-video_size")
            .arg(format!("{width}x{height}"))
            .arg("-framerate")
            .arg(fps.to_string())
            .arg("-i")
            .arg("-")
            .arg("-c:v")
            .arg("libx264")
            .arg("-preset")
            .arg("fast")
            .arg("-crf")
            .arg(crf_for_quality(quality).to_string())
            .arg("-pix_fmt")
            .arg("yuv420p")
            .arg("-movflags")
            .arg("+faststart")
            .arg(out)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawn ffmpeg for output {}", out.display()))?;
        let stdin = child
            .stdin
            .take()
            .context("failed to open ffmpeg stdin for rawvideo input")?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            out: out.to_path_buf(),
            frame_len: width * height * 3,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.out
    }
}

impl FrameSink for FfmpegEncoder {
    fn append(&mut self, rgb: &[u8]) -> Result<()> {
        if rgb.len() != self.frame_len {
            bail!(
                "frame size mismatch: got {} bytes, encoder expects {}",
                rgb.len(),
                self.frame_len
            );
        }
        let stdin = self.stdin.as_mut().context("encoder already finished")?;
        stdin.write_all(rgb).context("write frame to ffmpeg stdin")
    }

    fn finish(&mut self) -> Result<()> {
        drop(self.stdin.take());
        let status = self.child.wait().context("wait for ffmpeg")?;
        if !status.success() {
            bail!("ffmpeg exited with status {status}");
        }
        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        // Close the pipe and reap the child even on an error path; a killed
        // encoder must not leave a zombie or block on a full pipe.
        drop(self.stdin.take());
        let _ = self.child.wait();
    }
}

/// Attach the source audio to a finished silent video in-place.
///
/// Failure leaves the silent video intact and is reported as an error for
/// the caller to downgrade to a warning: a render without audio is still a
/// valid render.
pub fn mux_audio(video: &Path, audio: &Path) -> Result<()> {
    let temp = video.with_extension("mux_tmp.mp4");
    fs::rename(video, &temp)
        .with_context(|| format!("stage {} for audio mux", video.display()))?;

    let status = Command::new("ffmpeg")
        .arg("-hide_banner")
        .arg("-loglevel")
        .arg("error")
        .arg("-y")
        .arg("-i")
        .arg(&temp)
        .arg("-i")
        .arg(audio)
        .arg("-c:v")
        .arg("copy")
        .arg("-c:a")
        .arg("aac")
        .arg("-shortest")
        .arg(video)
        .stdin(Stdio::null())
        .status();

    match status {
        Ok(s) if s.success() => {
            let _ = fs::remove_file(&temp);
            Ok(())
        }
        Ok(s) => {
            let _ = fs::rename(&temp, video);
            bail!("ffmpeg audio mux exited with status {s}")
        }
        Err(err) => {
            let _ = fs::rename(&temp, video);
            Err(anyhow!("ffmpeg audio mux failed to start: {err}"))
        }
    }
}
