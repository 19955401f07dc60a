use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::shared::constants::MAX_FRAME_PIXELS;
use crate::shared::error::ConversionError;
use crate::shared::frame::{Frame, PixelFormat};

/// Size of a `width` x `height` frame scaled by `factor`, never below 1x1.
///
/// Fails when the result would exceed [`MAX_FRAME_PIXELS`].
pub fn scaled_size(width: u32, height: u32, factor: f64) -> Result<(u32, u32), ConversionError> {
    let scale = |v: u32| (v as f64 * factor).round().max(1.0);
    let (w, h) = (scale(width), scale(height));
    if w * h > MAX_FRAME_PIXELS as f64 {
        return Err(ConversionError::TooLarge {
            factor,
            width: w,
            height: h,
            max_pixels: MAX_FRAME_PIXELS,
        });
    }
    Ok((w as u32, h as u32))
}

/// Bilinear resize of an RGB frame by a uniform factor.
pub fn resize_frame(frame: &Frame, factor: f64) -> Result<Frame, ConversionError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(ConversionError::InvalidScale(factor));
    }
    if frame.format() != PixelFormat::Rgb {
        return Err(ConversionError::Unsupported {
            from: frame.format(),
            to: PixelFormat::Rgb,
        });
    }
    let image = frame
        .to_rgb_image()
        .ok_or_else(|| ConversionError::BufferLength {
            format: frame.format(),
            width: frame.width(),
            height: frame.height(),
            expected: frame.format().buffer_len(frame.width(), frame.height()),
            actual: frame.data().len(),
        })?;

    let (w, h) = scaled_size(frame.width(), frame.height(), factor)?;
    if (w, h) == image.dimensions() {
        return Ok(Frame::from_rgb_image(image));
    }
    Ok(Frame::from_rgb_image(imageops::resize(
        &image,
        w,
        h,
        FilterType::Triangle,
    )))
}

/// Bilinear resize of a grayscale image to an exact size.
pub fn resize_gray(image: &GrayImage, width: u32, height: u32) -> GrayImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}
