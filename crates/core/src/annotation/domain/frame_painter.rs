use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for drawing detection boxes onto a frame.
///
/// Implementations modify the frame in-place (`&mut Frame`). `color` is in
/// the frame's channel order.
pub trait FramePainter: Send {
    fn paint(
        &self,
        frame: &mut Frame,
        detections: &[Detection],
        color: [u8; 3],
    ) -> Result<(), Box<dyn std::error::Error>>;
}
