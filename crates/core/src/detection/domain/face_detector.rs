use image::GrayImage;

use crate::shared::detection::Detection;

/// Multi-scale detector parameters forwarded on every call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionParams {
    pub scale_factor: f64,
    pub min_neighbors: u32,
}

/// Domain interface for face detection on a single-channel image.
///
/// Parameters travel with each call because the user may change them
/// between ticks. Implementations may hold native state, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(
        &mut self,
        gray: &GrayImage,
        params: DetectionParams,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
