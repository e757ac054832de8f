use std::path::Path;

use image::GrayImage;
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;

use crate::detection::domain::face_detector::{DetectionParams, FaceDetector};
use crate::shared::detection::Detection;

/// Viola-Jones face detector backed by OpenCV's `CascadeClassifier`.
pub struct CascadeFaceDetector {
    classifier: CascadeClassifier,
}

// Safety: the classifier is only touched from the thread that owns the
// detector; no OpenCV handles are shared.
unsafe impl Send for CascadeFaceDetector {}

impl CascadeFaceDetector {
    /// Loads a cascade XML file (e.g. `haarcascade_frontalface_default.xml`).
    pub fn new(cascade_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let path = cascade_path
            .to_str()
            .ok_or_else(|| format!("Cascade path is not valid UTF-8: {}", cascade_path.display()))?;
        let classifier = CascadeClassifier::new(path)?;
        if classifier.empty()? {
            return Err(format!("Failed to load cascade from {}", cascade_path.display()).into());
        }
        log::debug!("Loaded cascade classifier from {}", cascade_path.display());
        Ok(Self { classifier })
    }
}

impl FaceDetector for CascadeFaceDetector {
    fn detect(
        &mut self,
        gray: &GrayImage,
        params: DetectionParams,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let mat = Mat::new_rows_cols_with_data(height as i32, width as i32, gray.as_raw())?;
        let mut faces = Vector::<Rect>::new();
        self.classifier.detect_multi_scale(
            &*mat,
            &mut faces,
            params.scale_factor,
            params.min_neighbors as i32,
            0,
            Size::default(),
            Size::default(),
        )?;

        Ok(faces
            .iter()
            .map(|r| Detection::new(r.x, r.y, r.width, r.height))
            .collect())
    }
}
