//! Grayscale frame and region types

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

/// Axis-aligned rectangle within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Translate a region expressed relative to `self` into the parent's coordinates
    pub fn to_parent(&self, child: &Region) -> Region {
        Region {
            x: self.x.saturating_add(child.x),
            y: self.y.saturating_add(child.y),
            width: child.width,
            height: child.height,
        }
    }

    /// Intersection with a `width` x `height` canvas anchored at the origin
    pub fn clip(&self, width: u32, height: u32) -> Option<Region> {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.right().min(width);
        let y1 = self.bottom().min(height);

        let clipped = Region::new(x0, y0, x1 - x0, y1 - y0);
        (!clipped.is_empty()).then_some(clipped)
    }
}

/// Single-channel 8-bit frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayFrame {
    /// Row-major luma samples (width * height)
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl GrayFrame {
    /// Wrap raw luma samples. Returns `None` when the buffer length does not
    /// match the dimensions.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        Some(Self { data, width, height })
    }

    /// Frame of uniform intensity
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            data: vec![value; width as usize * height as usize],
            width,
            height,
        }
    }

    /// Convert packed RGB to luma (0.299*R + 0.587*G + 0.114*B)
    pub fn from_rgb(rgb: &RgbImage) -> Self {
        let mut gray = Vec::with_capacity((rgb.width() * rgb.height()) as usize);
        for pixel in rgb.as_raw().chunks_exact(3) {
            let y = pixel[0] as f32 * 0.299 + pixel[1] as f32 * 0.587 + pixel[2] as f32 * 0.114;
            gray.push(y.round().min(255.0) as u8);
        }
        Self {
            data: gray,
            width: rgb.width(),
            height: rgb.height(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Crop a region of the frame, clipped to the frame bounds.
    /// Returns `None` if nothing of the region lies inside the frame.
    pub fn crop(&self, region: &Region) -> Option<GrayFrame> {
        let r = region.clip(self.width, self.height)?;

        let mut cropped = Vec::with_capacity(r.area() as usize);
        for row in r.y..r.bottom() {
            let start = (row * self.width + r.x) as usize;
            let end = start + r.width as usize;
            cropped.extend_from_slice(&self.data[start..end]);
        }

        Some(GrayFrame {
            data: cropped,
            width: r.width,
            height: r.height,
        })
    }

    /// Resize to exactly `new_width` x `new_height` using bilinear filtering.
    /// Returns `None` for degenerate source or target sizes.
    pub fn resize(&self, new_width: u32, new_height: u32) -> Option<GrayFrame> {
        if self.is_empty() || new_width == 0 || new_height == 0 {
            return None;
        }
        if self.width == new_width && self.height == new_height {
            return Some(self.clone());
        }

        let img = self.to_image()?;
        let resized = imageops::resize(&img, new_width, new_height, FilterType::Triangle);
        Some(GrayFrame::from(resized))
    }

    /// Mean luma of the frame, `None` when empty
    pub fn mean_intensity(&self) -> Option<f64> {
        if self.data.is_empty() {
            return None;
        }
        let sum: u64 = self.data.iter().map(|&v| v as u64).sum();
        Some(sum as f64 / self.data.len() as f64)
    }

    /// Samples scaled into [0, 1]
    pub fn normalized(&self) -> Vec<f32> {
        self.data.iter().map(|&v| v as f32 / 255.0).collect()
    }

    /// Borrow as an `image` buffer (copies the samples)
    pub fn to_image(&self) -> Option<GrayImage> {
        GrayImage::from_raw(self.width, self.height, self.data.clone())
    }
}

impl From<GrayImage> for GrayFrame {
    fn from(img: GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
        }
    }
}
