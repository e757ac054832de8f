use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};

use crate::capture::domain::frame_source::{FrameSource, SourceInfo};
use crate::shared::constants::{CAPTURE_HEIGHT, CAPTURE_WIDTH};
use crate::shared::frame::Frame;

/// Local capture device read through OpenCV's `videoio`.
///
/// The requested resolution is a hint; the device may settle on another
/// mode, which is what `open` reports.
pub struct CameraFrameSource {
    device_index: i32,
    requested: (u32, u32),
    capture: Option<VideoCapture>,
    buffer: Mat,
    frame_index: usize,
}

// Safety: CameraFrameSource is only used from a single thread at a time.
// The OpenCV handles inside are not shared across threads.
unsafe impl Send for CameraFrameSource {}

impl CameraFrameSource {
    pub fn new(device_index: i32) -> Self {
        Self {
            device_index,
            requested: (CAPTURE_WIDTH, CAPTURE_HEIGHT),
            capture: None,
            buffer: Mat::default(),
            frame_index: 0,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.requested = (width, height);
        self
    }
}

impl FrameSource for CameraFrameSource {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
        self.close();

        let mut capture = VideoCapture::new(self.device_index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(format!("Cannot open camera {}", self.device_index).into());
        }
        capture.set(videoio::CAP_PROP_FRAME_WIDTH, self.requested.0 as f64)?;
        capture.set(videoio::CAP_PROP_FRAME_HEIGHT, self.requested.1 as f64)?;

        let info = SourceInfo {
            width: capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32,
            height: capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32,
            fps: capture.get(videoio::CAP_PROP_FPS)?,
            description: format!("camera {}", self.device_index),
        };
        log::info!(
            "Opened camera {} at {}x{}",
            self.device_index,
            info.width,
            info.height
        );

        self.capture = Some(capture);
        self.frame_index = 0;
        Ok(info)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let capture = self
            .capture
            .as_mut()
            .ok_or("CameraFrameSource: not opened")?;

        if !capture.read(&mut self.buffer)? || self.buffer.empty() {
            return Err("Unable to capture image from camera".into());
        }

        // Row-padded buffers are compacted by a deep copy.
        let compacted;
        let mat = if self.buffer.is_continuous() {
            &self.buffer
        } else {
            compacted = self.buffer.try_clone()?;
            &compacted
        };
        let width = mat.cols() as u32;
        let height = mat.rows() as u32;
        let channels = mat.channels() as u8;
        let frame = Frame::new(
            mat.data_bytes()?.to_vec(),
            width,
            height,
            channels,
            self.frame_index,
        );
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                log::warn!("Failed to release camera {}: {e}", self.device_index);
            }
        }
    }
}

impl Drop for CameraFrameSource {
    fn drop(&mut self) {
        self.close();
    }
}
