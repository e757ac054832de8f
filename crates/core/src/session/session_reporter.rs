use std::path::Path;
use std::time::Instant;

use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Everything a front-end gets to see of a running session: the live
/// frame, user-facing messages and end-of-session statistics.
///
/// Lets the CLI, the desktop worker and tests observe the same driver
/// without the driver knowing where output goes.
pub trait SessionReporter: Send {
    /// Display an annotated frame.
    fn frame(&mut self, frame: &Frame, detections: &[Detection]);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}

    fn success(&mut self, message: &str);

    fn info(&mut self, message: &str);

    fn warning(&mut self, message: &str);

    fn error(&mut self, message: &str);

    /// An annotated frame was written to `path` and recorded.
    fn image_saved(&mut self, path: &Path);

    /// The saved images were bundled and written to `path`.
    fn archive_exported(&mut self, path: &Path);

    /// The session entered (`true`) or left (`false`) Running.
    fn detecting_changed(&mut self, _detecting: bool) {}

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&mut self) {}
}

/// Reporter for terminal use: messages go to the `log` facade and frames
/// are tallied rather than shown.
///
/// Frame lines are throttled to every `throttle_frames` frames.
pub struct LogSessionReporter {
    throttle_frames: usize,
    frames: usize,
    faces: usize,
    timings: Vec<f64>,
    started: Option<Instant>,
}

impl LogSessionReporter {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            frames: 0,
            faces: 0,
            timings: Vec::new(),
            started: None,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn faces(&self) -> usize {
        self.faces
    }

    /// Returns the formatted summary, or `None` if no frame was seen.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 {
            return None;
        }

        let elapsed = self
            .started
            .map(|s| s.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let frames = self.frames;
        let mut lines = vec![format!(
            "Session summary ({frames} frames, {elapsed:.1}s):"
        )];

        if !self.timings.is_empty() {
            let total_ms: f64 = self.timings.iter().sum();
            let avg_ms = total_ms / self.timings.len() as f64;
            lines.push(format!(
                "  annotate: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        let avg_faces = self.faces as f64 / frames as f64;
        lines.push(format!("  faces: {} total, avg {avg_faces:.2}/frame", self.faces));

        if elapsed > 0.0 {
            lines.push(format!("  Throughput: {:.1} fps", frames as f64 / elapsed));
        }

        Some(lines.join("\n"))
    }

    fn reset(&mut self) {
        self.frames = 0;
        self.faces = 0;
        self.timings.clear();
        self.started = None;
    }
}

impl Default for LogSessionReporter {
    fn default() -> Self {
        Self::new(30)
    }
}

impl SessionReporter for LogSessionReporter {
    fn frame(&mut self, frame: &Frame, detections: &[Detection]) {
        self.started.get_or_insert_with(Instant::now);
        self.frames += 1;
        self.faces += detections.len();
        if self.frames % self.throttle_frames == 0 {
            log::info!(
                "Frame {}: {} face(s) ({}x{})",
                frame.index(),
                detections.len(),
                frame.width(),
                frame.height()
            );
        }
    }

    fn timing(&mut self, _stage: &str, duration_ms: f64) {
        self.timings.push(duration_ms);
    }

    fn success(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn warning(&mut self, message: &str) {
        log::warn!("{message}");
    }

    fn error(&mut self, message: &str) {
        log::error!("{message}");
    }

    fn image_saved(&mut self, path: &Path) {
        log::info!("Image saved as {}", path.display());
    }

    fn archive_exported(&mut self, path: &Path) {
        log::info!("Archive written to {}", path.display());
    }

    fn summary(&mut self) {
        if let Some(s) = self.summary_string() {
            log::info!("{s}");
        }
        self.reset();
    }
}
