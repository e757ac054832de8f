use std::path::{Path, PathBuf};

use crate::capture::domain::frame_source::{FrameSource, SourceInfo};
use crate::shared::frame::Frame;

/// Treats one image file as a single-frame stream.
///
/// Decoding uses the `image` crate; the frame is converted to BGR on
/// `open` and handed out once per open.
pub struct StillImageFrameSource {
    path: PathBuf,
    frame: Option<Frame>,
}

impl StillImageFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frame: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for StillImageFrameSource {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
        let img = image::open(&self.path)?.to_rgb8();
        let frame = Frame::from_rgb_image(&img, 0);
        let info = SourceInfo {
            width: frame.width(),
            height: frame.height(),
            fps: 0.0,
            description: self.path.display().to_string(),
        };
        self.frame = Some(frame);
        Ok(info)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        Ok(self.frame.take())
    }

    fn close(&mut self) {
        self.frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yields_one_bgr_frame_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        image::RgbImage::from_pixel(6, 4, image::Rgb([255, 0, 0]))
            .save(&path)
            .unwrap();

        let mut source = StillImageFrameSource::new(&path);
        let info = source.open().unwrap();
        assert_eq!((info.width, info.height), (6, 4));

        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(&frame.data()[..3], &[0, 0, 255]);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_reopen_yields_frame_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::RgbImage::from_pixel(2, 2, image::Rgb([9, 9, 9]))
            .save(&path)
            .unwrap();

        let mut source = StillImageFrameSource::new(&path);
        source.open().unwrap();
        source.next_frame().unwrap();
        source.close();
        source.open().unwrap();
        assert!(source.next_frame().unwrap().is_some());
    }

    #[test]
    fn test_missing_file_fails_open() {
        let mut source = StillImageFrameSource::new("/nonexistent/face.png");
        assert!(source.open().is_err());
    }
}
