//! Colour-space conversions between the frame layouts a capture device or
//! decoder can hand us and the layouts the detector needs.
//!
//! Integer coefficients follow ITU-R BT.601 so results are bit-exact across
//! platforms.

use image::GrayImage;

use crate::shared::error::ConversionError;
use crate::shared::frame::{Frame, PixelFormat};

const YUV_SHIFT: u32 = 20;
const YUV_HALF: i32 = 1 << (YUV_SHIFT - 1);
const CY: i32 = 1_220_542;
const CUB: i32 = 2_116_026;
const CUG: i32 = -409_993;
const CVG: i32 = -852_492;
const CVR: i32 = 1_673_527;

const GRAY_SHIFT: u32 = 14;
const GRAY_R: u32 = 4899;
const GRAY_G: u32 = 9617;
const GRAY_B: u32 = 1868;

/// Brings any colour frame into interleaved RGB.
///
/// Planar camera frames are first reordered into NV21; RGB input is
/// returned as a copy.
pub fn normalize(frame: &Frame) -> Result<Frame, ConversionError> {
    match frame.format() {
        PixelFormat::Yuv420 => nv21_to_rgb(&yuv420_to_nv21(frame)?),
        PixelFormat::Nv21 => nv21_to_rgb(frame),
        PixelFormat::Bgr => swap_red_blue(frame, PixelFormat::Rgb),
        PixelFormat::Rgb => {
            check_layout(frame)?;
            Ok(frame.clone())
        }
        PixelFormat::Gray => Err(ConversionError::Unsupported {
            from: PixelFormat::Gray,
            to: PixelFormat::Rgb,
        }),
    }
}

/// Reorders planar Y/U/V into NV21 (Y plane, then interleaved V/U).
///
/// The capture device stores U before V, the reverse of what the NV21
/// conversion reads.
pub fn yuv420_to_nv21(frame: &Frame) -> Result<Frame, ConversionError> {
    expect_format(frame, PixelFormat::Yuv420, PixelFormat::Nv21)?;
    check_yuv_layout(frame)?;

    let luma_len = frame.width() as usize * frame.height() as usize;
    let chroma_len = luma_len / 4;
    let data = frame.data();
    let (y_plane, chroma) = data.split_at(luma_len);
    let (u_plane, v_plane) = chroma.split_at(chroma_len);

    let mut nv21 = Vec::with_capacity(data.len());
    nv21.extend_from_slice(y_plane);
    for (&v, &u) in v_plane.iter().zip(u_plane) {
        nv21.push(v);
        nv21.push(u);
    }

    Ok(Frame::from_validated(nv21, frame.width(), frame.height(), PixelFormat::Nv21))
}

pub fn nv21_to_rgb(frame: &Frame) -> Result<Frame, ConversionError> {
    expect_format(frame, PixelFormat::Nv21, PixelFormat::Rgb)?;
    check_yuv_layout(frame)?;

    let w = frame.width() as usize;
    let h = frame.height() as usize;
    let data = frame.data();
    let (y_plane, vu_plane) = data.split_at(w * h);

    let mut rgb = vec![0u8; w * h * 3];
    for row in 0..h {
        let vu_row = &vu_plane[(row / 2) * w..(row / 2) * w + w];
        for col in 0..w {
            let luma = y_plane[row * w + col];
            let pair = (col / 2) * 2;
            let [r, g, b] = yuv_to_rgb(luma, vu_row[pair + 1], vu_row[pair]);
            let idx = (row * w + col) * 3;
            rgb[idx] = r;
            rgb[idx + 1] = g;
            rgb[idx + 2] = b;
        }
    }

    Ok(Frame::from_validated(rgb, frame.width(), frame.height(), PixelFormat::Rgb))
}

/// Swaps the first and third channel, turning RGB into BGR and back.
pub fn swap_red_blue(frame: &Frame, target: PixelFormat) -> Result<Frame, ConversionError> {
    let source = frame.format();
    let valid = matches!(
        (source, target),
        (PixelFormat::Rgb, PixelFormat::Bgr) | (PixelFormat::Bgr, PixelFormat::Rgb)
    );
    if !valid {
        return Err(ConversionError::Unsupported {
            from: source,
            to: target,
        });
    }
    check_layout(frame)?;

    let mut data = frame.data().to_vec();
    for px in data.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    Ok(Frame::from_validated(data, frame.width(), frame.height(), target))
}

/// Single-channel intensity image for the classifier.
///
/// Accepts RGB, BGR or an already grayscale frame.
pub fn to_grayscale(frame: &Frame) -> Result<GrayImage, ConversionError> {
    let (r_idx, b_idx) = match frame.format() {
        PixelFormat::Rgb => (0, 2),
        PixelFormat::Bgr => (2, 0),
        PixelFormat::Gray => {
            check_layout(frame)?;
            return GrayImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
                .ok_or_else(|| layout_error(frame));
        }
        other => {
            return Err(ConversionError::Unsupported {
                from: other,
                to: PixelFormat::Gray,
            })
        }
    };
    check_layout(frame)?;
    let view = frame.as_ndarray().ok_or_else(|| layout_error(frame))?;
    let luma: Vec<u8> = view
        .rows()
        .into_iter()
        .map(|px| rgb_to_luma(px[r_idx], px[1], px[b_idx]))
        .collect();

    GrayImage::from_raw(frame.width(), frame.height(), luma).ok_or_else(|| layout_error(frame))
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let u = u as i32 - 128;
    let v = v as i32 - 128;
    let ruv = YUV_HALF + CVR * v;
    let guv = YUV_HALF + CVG * v + CUG * u;
    let buv = YUV_HALF + CUB * u;
    let y1 = (y as i32 - 16).max(0) * CY;
    [
        clamp_u8((y1 + ruv) >> YUV_SHIFT),
        clamp_u8((y1 + guv) >> YUV_SHIFT),
        clamp_u8((y1 + buv) >> YUV_SHIFT),
    ]
}

fn rgb_to_luma(r: u8, g: u8, b: u8) -> u8 {
    let sum = r as u32 * GRAY_R + g as u32 * GRAY_G + b as u32 * GRAY_B;
    ((sum + (1 << (GRAY_SHIFT - 1))) >> GRAY_SHIFT) as u8
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

fn expect_format(
    frame: &Frame,
    expected: PixelFormat,
    target: PixelFormat,
) -> Result<(), ConversionError> {
    if frame.format() != expected {
        return Err(ConversionError::Unsupported {
            from: frame.format(),
            to: target,
        });
    }
    Ok(())
}

fn check_yuv_layout(frame: &Frame) -> Result<(), ConversionError> {
    if frame.width() % 2 != 0 || frame.height() % 2 != 0 {
        return Err(ConversionError::OddDimensions {
            format: frame.format(),
            width: frame.width(),
            height: frame.height(),
        });
    }
    check_layout(frame)
}

fn check_layout(frame: &Frame) -> Result<(), ConversionError> {
    if frame.has_valid_layout() {
        return Ok(());
    }
    Err(layout_error(frame))
}

fn layout_error(frame: &Frame) -> ConversionError {
    ConversionError::BufferLength {
        format: frame.format(),
        width: frame.width(),
        height: frame.height(),
        expected: frame.format().buffer_len(frame.width(), frame.height()),
        actual: frame.data().len(),
    }
}
