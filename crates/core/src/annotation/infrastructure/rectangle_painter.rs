use ndarray::s;

use crate::annotation::domain::frame_painter::FramePainter;
use crate::shared::constants::BOX_STROKE_WIDTH;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// CPU painter that outlines each detection with a solid stroke.
///
/// The outline spans `(x, y)` to `(x + width, y + height)` inclusive and
/// grows inward by `stroke` pixels. Anything outside the frame is clipped.
pub struct RectanglePainter {
    stroke: u32,
}

impl RectanglePainter {
    pub fn new(stroke: u32) -> Self {
        Self {
            stroke: stroke.max(1),
        }
    }

    pub fn stroke(&self) -> u32 {
        self.stroke
    }
}

impl Default for RectanglePainter {
    fn default() -> Self {
        Self::new(BOX_STROKE_WIDTH)
    }
}

impl FramePainter for RectanglePainter {
    fn paint(
        &self,
        frame: &mut Frame,
        detections: &[Detection],
        color: [u8; 3],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let fw = frame.width() as i64;
        let fh = frame.height() as i64;
        let channels = (frame.channels() as usize).min(color.len());
        let t = self.stroke as i64;
        let mut pixels = frame.as_ndarray_mut();

        for d in detections {
            if d.width < 0 || d.height < 0 {
                continue;
            }
            let (x0, y0) = (d.x as i64, d.y as i64);
            let (x1, y1) = (x0 + d.width as i64, y0 + d.height as i64);

            // Top, bottom, left, right bands as half-open [x, x) x [y, y)
            let bands = [
                (x0, x1 + 1, y0, y0 + t),
                (x0, x1 + 1, y1 - t + 1, y1 + 1),
                (x0, x0 + t, y0, y1 + 1),
                (x1 - t + 1, x1 + 1, y0, y1 + 1),
            ];

            for (bx0, bx1, by0, by1) in bands {
                let cx0 = bx0.clamp(0, fw);
                let cx1 = bx1.clamp(0, fw);
                let cy0 = by0.clamp(0, fh);
                let cy1 = by1.clamp(0, fh);
                if cx0 >= cx1 || cy0 >= cy1 {
                    continue;
                }
                let mut band = pixels.slice_mut(s![
                    cy0 as usize..cy1 as usize,
                    cx0 as usize..cx1 as usize,
                    ..
                ]);
                for (c, &value) in color.iter().enumerate().take(channels) {
                    band.slice_mut(s![.., .., c]).fill(value);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED_BGR: [u8; 3] = [0, 0, 255];

    fn make_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![0u8; (width * height * 3) as usize], width, height, 3, 0)
    }

    fn pixel(frame: &Frame, x: usize, y: usize) -> [u8; 3] {
        let arr = frame.as_ndarray();
        [arr[[y, x, 0]], arr[[y, x, 1]], arr[[y, x, 2]]]
    }

    fn painted_count(frame: &Frame) -> usize {
        frame
            .data()
            .chunks_exact(3)
            .filter(|px| *px != [0, 0, 0])
            .count()
    }

    #[test]
    fn test_outline_corners_and_edges_are_painted() {
        let mut frame = make_frame(50, 50);
        let painter = RectanglePainter::default();
        painter
            .paint(&mut frame, &[Detection::new(10, 10, 20, 20)], RED_BGR)
            .unwrap();

        assert_eq!(pixel(&frame, 10, 10), RED_BGR);
        assert_eq!(pixel(&frame, 30, 30), RED_BGR);
        assert_eq!(pixel(&frame, 11, 20), RED_BGR); // second column of left edge
        assert_eq!(pixel(&frame, 20, 29), RED_BGR); // second row of bottom edge
    }

    #[test]
    fn test_interior_and_exterior_untouched() {
        let mut frame = make_frame(50, 50);
        let painter = RectanglePainter::default();
        painter
            .paint(&mut frame, &[Detection::new(10, 10, 20, 20)], RED_BGR)
            .unwrap();

        assert_eq!(pixel(&frame, 20, 20), [0, 0, 0]);
        assert_eq!(pixel(&frame, 12, 12), [0, 0, 0]);
        assert_eq!(pixel(&frame, 9, 10), [0, 0, 0]);
        assert_eq!(pixel(&frame, 31, 31), [0, 0, 0]);
    }

    #[test]
    fn test_stroke_pixel_count() {
        // 21x21 outline, 2px thick: 21*21 - 17*17
        let mut frame = make_frame(50, 50);
        RectanglePainter::new(2)
            .paint(&mut frame, &[Detection::new(10, 10, 20, 20)], RED_BGR)
            .unwrap();
        assert_eq!(painted_count(&frame), 21 * 21 - 17 * 17);
    }

    #[test]
    fn test_box_crossing_frame_edge_is_clipped() {
        let mut frame = make_frame(20, 20);
        RectanglePainter::default()
            .paint(&mut frame, &[Detection::new(-5, 15, 10, 10)], RED_BGR)
            .unwrap();
        // Top band of the box is visible at y=15..17, x=0..=5
        assert_eq!(pixel(&frame, 0, 15), RED_BGR);
        assert_eq!(pixel(&frame, 5, 16), RED_BGR);
        assert_eq!(pixel(&frame, 6, 15), [0, 0, 0]);
    }

    #[test]
    fn test_box_entirely_outside_is_ignored() {
        let mut frame = make_frame(20, 20);
        RectanglePainter::default()
            .paint(&mut frame, &[Detection::new(100, 100, 10, 10)], RED_BGR)
            .unwrap();
        assert_eq!(painted_count(&frame), 0);
    }

    #[test]
    fn test_no_detections_leaves_frame_unchanged() {
        let mut frame = make_frame(10, 10);
        RectanglePainter::default()
            .paint(&mut frame, &[], RED_BGR)
            .unwrap();
        assert_eq!(painted_count(&frame), 0);
    }

    #[test]
    fn test_zero_stroke_is_raised_to_one() {
        assert_eq!(RectanglePainter::new(0).stroke(), 1);
    }
}
