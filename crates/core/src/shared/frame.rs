use image::RgbImage;
use ndarray::ArrayView3;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame must have positive dimensions, got {width}x{height}")]
    ZeroArea { width: u32, height: u32 },
    #[error("unsupported pixel format {found:?}, expected {expected}")]
    UnsupportedFormat {
        found: PixelFormat,
        expected: &'static str,
    },
}

/// Byte layout of a [`Frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Planar 4:2:0 as delivered by the capture device: Y plane, U plane, V plane.
    Yuv420,
    /// Semi-planar 4:2:0: Y plane followed by interleaved V/U pairs.
    Nv21,
    Rgb,
    Bgr,
    Gray,
}

impl PixelFormat {
    /// Number of bytes a `width` x `height` frame of this format occupies.
    pub fn buffer_len(self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            PixelFormat::Yuv420 | PixelFormat::Nv21 => pixels + pixels / 2,
            PixelFormat::Rgb | PixelFormat::Bgr => pixels * 3,
            PixelFormat::Gray => pixels,
        }
    }

    /// Interleaved channel count, `None` for the planar YUV layouts.
    pub fn channels(self) -> Option<u8> {
        match self {
            PixelFormat::Rgb | PixelFormat::Bgr => Some(3),
            PixelFormat::Gray => Some(1),
            PixelFormat::Yuv420 | PixelFormat::Nv21 => None,
        }
    }

    pub fn is_color(self) -> bool {
        !matches!(self, PixelFormat::Gray)
    }
}

/// A captured or decoded image: raw bytes plus the layout needed to read them.
///
/// Construction only rejects zero-area frames. Whether the buffer really
/// matches the declared layout is checked by the conversion that consumes it,
/// so a malformed camera buffer surfaces as a conversion failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::ZeroArea { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// Builds a frame whose dimensions the caller has already validated.
    pub(crate) fn from_validated(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        debug_assert!(width > 0 && height > 0);
        Self {
            data,
            width,
            height,
            format,
        }
    }

    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            format: PixelFormat::Rgb,
        }
    }

    /// Copies an RGB frame into an `image` buffer; `None` for any other
    /// format or a buffer of the wrong length.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if self.format != PixelFormat::Rgb {
            return None;
        }
        RgbImage::from_raw(self.width, self.height, self.data.clone())
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

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn has_valid_layout(&self) -> bool {
        self.data.len() == self.format.buffer_len(self.width, self.height)
    }

    /// `(row, column, channel)` view of an interleaved frame.
    pub fn as_ndarray(&self) -> Option<ArrayView3<'_, u8>> {
        let channels = self.format.channels()? as usize;
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, channels),
            &self.data,
        )
        .ok()
    }
}
