use crate::annotation::domain::frame_painter::FramePainter;
use crate::detection::domain::detection_config::DetectionConfig;
use crate::detection::domain::face_detector::{DetectionParams, FaceDetector};
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Per-frame annotation: grayscale → detect → draw boxes in place.
pub struct FrameAnnotator {
    detector: Box<dyn FaceDetector>,
    painter: Box<dyn FramePainter>,
}

impl FrameAnnotator {
    pub fn new(detector: Box<dyn FaceDetector>, painter: Box<dyn FramePainter>) -> Self {
        Self { detector, painter }
    }

    /// Draws every detection onto `frame` in the configured colour and
    /// returns the detections. Detector errors are passed through untouched.
    pub fn annotate(
        &mut self,
        frame: &mut Frame,
        config: &DetectionConfig,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let gray = frame.to_luma();
        let params = DetectionParams {
            scale_factor: config.scale_factor(),
            min_neighbors: config.min_neighbors(),
        };
        let detections = self.detector.detect(&gray, params)?;
        self.painter
            .paint(frame, &detections, config.box_color_bgr())?;
        Ok(detections)
    }
}
