//! Video Frame Types
//!
//! Raw frames as delivered by capture backends, and their conversion to RGB.

use std::fmt;

use cardscan_core::ScanError;
use image::RgbImage;

/// Pixel layout of a raw frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8 bits per channel, packed.
    Rgb24,
    /// YUV 4:2:2 packed, the common uncompressed V4L2 format.
    Yuyv,
    /// Each frame is a complete JPEG image.
    Mjpeg,
}

impl PixelFormat {
    /// Expected buffer size, or `None` for compressed formats.
    pub fn buffer_size(&self, width: u32, height: u32) -> Option<usize> {
        let pixels = width as usize * height as usize;
        match self {
            PixelFormat::Rgb24 => Some(pixels * 3),
            PixelFormat::Yuyv => Some(pixels * 2),
            PixelFormat::Mjpeg => None,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Rgb24 => write!(f, "RGB24"),
            PixelFormat::Yuyv => write!(f, "YUYV (YUV 4:2:2 packed)"),
            PixelFormat::Mjpeg => write!(f, "MJPEG"),
        }
    }
}

/// One frame of a live stream.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self { width, height, format, data }
    }

    pub fn from_rgb(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height, PixelFormat::Rgb24, image.into_raw())
    }

    /// Decode into an RGB raster of the frame's own size.
    pub fn to_rgb_image(&self) -> Result<RgbImage, ScanError> {
        match self.format {
            PixelFormat::Rgb24 => {
                self.check_len()?;
                RgbImage::from_raw(self.width, self.height, self.data.clone())
                    .ok_or_else(|| ScanError::Capture("RGB buffer does not match frame size".into()))
            }
            PixelFormat::Yuyv => {
                self.check_len()?;
                Ok(self.yuyv_to_rgb())
            }
            PixelFormat::Mjpeg => image::load_from_memory_with_format(&self.data, image::ImageFormat::Jpeg)
                .map(|img| img.to_rgb8())
                .map_err(|e| ScanError::Capture(format!("failed to decode MJPEG frame: {e}"))),
        }
    }

    fn check_len(&self) -> Result<(), ScanError> {
        let expected = self.format.buffer_size(self.width, self.height).unwrap_or(0);
        if self.data.len() < expected {
            return Err(ScanError::Capture(format!(
                "{} frame {}x{} has {} bytes, expected {}",
                self.format,
                self.width,
                self.height,
                self.data.len(),
                expected
            )));
        }
        Ok(())
    }

    /// BT.601 limited-range conversion; each 4-byte group is Y0 U Y1 V.
    fn yuyv_to_rgb(&self) -> RgbImage {
        let width = self.width as usize;
        let height = self.height as usize;
        let mut rgb = vec![0u8; width * height * 3];

        for row in 0..height {
            for pair in 0..(width / 2) {
                let src = row * width * 2 + pair * 4;
                let (y0, u, y1, v) = (
                    self.data[src],
                    self.data[src + 1],
                    self.data[src + 2],
                    self.data[src + 3],
                );
                let dst = (row * width + pair * 2) * 3;
                rgb[dst..dst + 3].copy_from_slice(&yuv_to_rgb(y0, u, v));
                rgb[dst + 3..dst + 6].copy_from_slice(&yuv_to_rgb(y1, u, v));
            }
        }

        // from_raw only fails on a short buffer, which the allocation above rules out.
        RgbImage::from_raw(self.width, self.height, rgb).unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    let clamp = |x: i32| x.clamp(0, 255) as u8;
    [
        clamp((298 * c + 409 * e + 128) >> 8),
        clamp((298 * c - 100 * d - 208 * e + 128) >> 8),
        clamp((298 * c + 516 * d + 128) >> 8),
    ]
}
