use std::path::Path;

use crate::annotation::frame_annotator::FrameAnnotator;
use crate::archive::domain::image_writer::ImageWriter;
use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::detection_config::DetectionConfig;
use crate::shared::detection::Detection;

/// Single-image annotation: read → detect → draw → write.
pub struct AnnotateImageUseCase {
    source: Box<dyn FrameSource>,
    image_writer: Box<dyn ImageWriter>,
    annotator: FrameAnnotator,
}

impl AnnotateImageUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        image_writer: Box<dyn ImageWriter>,
        annotator: FrameAnnotator,
    ) -> Self {
        Self {
            source,
            image_writer,
            annotator,
        }
    }

    /// Annotates the first frame of the source and writes it to `output_path`.
    pub fn execute(
        &mut self,
        output_path: &Path,
        config: &DetectionConfig,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        self.source.open()?;
        let frame = self.source.next_frame();
        self.source.close();
        let mut frame = frame?.ok_or("No frames in image")?;

        let detections = self.annotator.annotate(&mut frame, config)?;
        self.image_writer.write(output_path, &frame)?;

        log::info!(
            "Annotated {} face(s), wrote {}",
            detections.len(),
            output_path.display()
        );
        Ok(detections)
    }
}
