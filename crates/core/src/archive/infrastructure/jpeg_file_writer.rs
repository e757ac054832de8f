use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;

use crate::archive::domain::image_writer::ImageWriter;
use crate::shared::frame::Frame;

const DEFAULT_QUALITY: u8 = 95;

/// Encodes BGR frames as JPEG files using the `image` crate.
pub struct JpegFileWriter {
    quality: u8,
}

impl JpegFileWriter {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for JpegFileWriter {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

impl ImageWriter for JpegFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let rgb = frame
            .to_rgb_image()
            .ok_or("JPEG output needs a 3-channel frame")?;

        let mut out = BufWriter::new(File::create(path)?);
        JpegEncoder::new_with_quality(&mut out, self.quality).encode_image(&rgb)?;
        Ok(())
    }
}
