use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;

use crate::annotation::frame_annotator::FrameAnnotator;
use crate::archive::saved_image_archive::{ArchiveError, SavedImageArchive};
use crate::capture::domain::frame_source::{FrameSource, SourceInfo};
use crate::detection::domain::detection_config::DetectionConfig;
use crate::session::session_state::SessionState;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Detection is already running")]
    AlreadyRunning,

    #[error("Unable to open frame source: {0}")]
    Open(String),

    #[error("Face detection failed: {0}")]
    Detection(String),

    #[error("No frame has been captured yet")]
    NoFrame,

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Result of one successful call to [`CaptureSession::tick`].
#[derive(Debug)]
pub enum TickOutcome {
    /// The session is not running; nothing was pulled.
    Idle,
    /// A frame was annotated and is now the current frame.
    Frame {
        detections: Vec<Detection>,
        annotate_ms: f64,
    },
    /// The source ran out of frames. The session is Idle again.
    Ended,
    /// The source failed to deliver a frame. The session is Idle again.
    Failed(String),
}

/// Idle/Running state machine around one frame source.
///
/// The source is opened on `start` and closed exactly once when the
/// session leaves Running, whether by `stop`, end of stream, or an error.
pub struct CaptureSession {
    source: Box<dyn FrameSource>,
    annotator: FrameAnnotator,
    state: SessionState,
}

impl CaptureSession {
    pub fn new(
        source: Box<dyn FrameSource>,
        annotator: FrameAnnotator,
        archive: SavedImageArchive,
    ) -> Self {
        Self {
            source,
            annotator,
            state: SessionState::new(archive),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_detecting(&self) -> bool {
        self.state.is_detecting
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.state.current_frame.as_ref()
    }

    /// Idle → Running. A source that fails to open leaves the session Idle.
    pub fn start(&mut self) -> Result<SourceInfo, SessionError> {
        if self.state.is_detecting {
            return Err(SessionError::AlreadyRunning);
        }

        let info = self
            .source
            .open()
            .map_err(|e| SessionError::Open(e.to_string()))?;
        self.state.is_detecting = true;
        log::info!(
            "Capture started on {} ({}x{})",
            info.description,
            info.width,
            info.height
        );
        Ok(info)
    }

    /// Pulls, annotates and stores one frame.
    ///
    /// Acquisition failures and end of stream come back as outcomes; a
    /// detector failure is returned as an error. Either way the source has
    /// been released and the session is Idle afterwards.
    pub fn tick(&mut self, config: &DetectionConfig) -> Result<TickOutcome, SessionError> {
        if !self.state.is_detecting {
            return Ok(TickOutcome::Idle);
        }

        let mut frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.release();
                return Ok(TickOutcome::Ended);
            }
            Err(e) => {
                self.release();
                return Ok(TickOutcome::Failed(e.to_string()));
            }
        };

        let t0 = Instant::now();
        let detections = match self.annotator.annotate(&mut frame, config) {
            Ok(detections) => detections,
            Err(e) => {
                self.release();
                return Err(SessionError::Detection(e.to_string()));
            }
        };
        let annotate_ms = t0.elapsed().as_secs_f64() * 1000.0;

        self.state.current_frame = Some(frame);
        Ok(TickOutcome::Frame {
            detections,
            annotate_ms,
        })
    }

    /// Running → Idle. Returns `false` if the session was already Idle.
    pub fn stop(&mut self) -> bool {
        let was_running = self.state.is_detecting;
        self.release();
        was_running
    }

    /// Saves the current frame through the archive.
    pub fn save_current(&mut self) -> Result<PathBuf, SessionError> {
        let frame = self
            .state
            .current_frame
            .as_ref()
            .ok_or(SessionError::NoFrame)?;
        Ok(self.state.archive.save_current(frame)?)
    }

    pub fn build_archive(&self) -> Result<Option<Vec<u8>>, SessionError> {
        Ok(self.state.archive.build_archive()?)
    }

    pub fn export_archive(&self, dest: &Path) -> Result<Option<PathBuf>, SessionError> {
        Ok(self.state.archive.export_archive(dest)?)
    }

    fn release(&mut self) {
        if self.state.is_detecting {
            self.state.is_detecting = false;
            self.source.close();
            log::info!("Capture stopped");
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}
