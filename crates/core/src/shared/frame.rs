use image::{GrayImage, RgbImage};
use ndarray::{ArrayView3, ArrayViewMut3};

/// A single captured frame: contiguous BGR bytes in row-major order.
///
/// BGR is the order the camera and the cascade classifier work in.
/// Conversion to RGB (encoding) or RGBA (display) happens at I/O
/// boundaries only.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Builds a BGR frame from an RGB image decoded by the `image` crate.
    pub fn from_rgb_image(img: &RgbImage, index: usize) -> Self {
        let (width, height) = img.dimensions();
        let mut data = img.as_raw().clone();
        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        Self::new(data, width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Single-channel intensity using BT.601 weights, matching OpenCV's
    /// `COLOR_BGR2GRAY`. Single-channel frames are copied as-is.
    pub fn to_luma(&self) -> GrayImage {
        let pixels: Vec<u8> = if self.channels < 3 {
            self.data
                .chunks_exact(self.channels as usize)
                .map(|px| px[0])
                .collect()
        } else {
            self.data
                .chunks_exact(self.channels as usize)
                .map(|px| {
                    let (b, g, r) = (px[0] as u32, px[1] as u32, px[2] as u32);
                    // Fixed-point 0.114 B + 0.587 G + 0.299 R, rounded.
                    ((b * 1868 + g * 9617 + r * 4899 + (1 << 13)) >> 14) as u8
                })
                .collect()
        };
        GrayImage::from_raw(self.width, self.height, pixels)
            .expect("luma buffer length must match dimensions")
    }

    /// RGB copy for encoders that expect RGB order.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if self.channels != 3 {
            return None;
        }
        let mut data = self.data.clone();
        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        RgbImage::from_raw(self.width, self.height, data)
    }

    /// Opaque RGBA bytes for display surfaces.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let channels = self.channels as usize;
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for px in self.data.chunks_exact(channels) {
            if channels >= 3 {
                out.extend_from_slice(&[px[2], px[1], px[0], 255]);
            } else {
                out.extend_from_slice(&[px[0], px[0], px[0], 255]);
            }
        }
        out
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
