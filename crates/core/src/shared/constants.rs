pub const CASCADE_MODEL_NAME: &str = "haarcascade_frontalface_default.xml";
pub const CASCADE_MODEL_URL: &str =
    "https://raw.githubusercontent.com/opencv/opencv/4.x/data/haarcascades/haarcascade_frontalface_default.xml";

/// Resolution requested from capture devices.
pub const CAPTURE_WIDTH: u32 = 1280;
pub const CAPTURE_HEIGHT: u32 = 720;

/// Outline thickness in pixels. The stroke is laid inside the detected
/// rectangle rather than centred on its edge, so a box touching the frame
/// border keeps its full width and no pixel outside the detection changes.
pub const BOX_STROKE_WIDTH: u32 = 2;

pub const SAVED_IMAGE_PREFIX: &str = "detected_faces_";
pub const SAVED_IMAGE_EXTENSION: &str = "jpg";

pub const ARCHIVE_FILE_NAME: &str = "images.zip";
pub const ARCHIVE_MIME_TYPE: &str = "application/zip";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
