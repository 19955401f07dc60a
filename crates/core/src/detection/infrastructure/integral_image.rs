//! Summed-area tables for O(1) rectangle sums during cascade evaluation.

use image::GrayImage;
use imageproc::integral_image::{integral_image, integral_squared_image};

/// Plain and squared integral images of one pyramid level.
///
/// Both tables are `(width + 1) x (height + 1)` with a zero first row and
/// column, so `sum(x, y, w, h)` never needs bounds special-casing.
pub struct IntegralImages {
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
    stride: usize,
}

impl IntegralImages {
    pub fn new(image: &GrayImage) -> Self {
        let sum = integral_image::<_, u64>(image);
        let sq_sum = integral_squared_image::<_, u64>(image);
        Self {
            stride: sum.width() as usize,
            sum: sum.into_raw(),
            sq_sum: sq_sum.into_raw(),
        }
    }

    /// Sum of pixel values in the rectangle at `(x, y)` of size `w` x `h`.
    #[inline]
    pub fn sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        rect_sum(&self.sum, self.stride, x, y, w, h)
    }

    /// Sum of squared pixel values in the rectangle.
    #[inline]
    pub fn squared_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        rect_sum(&self.sq_sum, self.stride, x, y, w, h)
    }
}

#[inline]
fn rect_sum(table: &[u64], stride: usize, x: u32, y: u32, w: u32, h: u32) -> u64 {
    let x0 = x as usize;
    let y0 = y as usize;
    let x1 = x0 + w as usize;
    let y1 = y0 + h as usize;
    table[y1 * stride + x1] + table[y0 * stride + x0]
        - table[y0 * stride + x1]
        - table[y1 * stride + x0]
}
