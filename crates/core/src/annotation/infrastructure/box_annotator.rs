use embedded_graphics::mono_font::MonoFont;
use image::{ImageBuffer, Rgb};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::annotation::domain::frame_annotator::{AnnotatorError, FrameAnnotator};
use crate::shared::constants::{ANNOTATION_COLOR, ANNOTATION_THICKNESS, LABEL_OFFSET, PLATE_LABEL};
use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::region::Region;

use super::text_overlay::{draw_label, LABEL_FONT};

/// Outlines each region and writes a caption near its top-left corner.
///
/// The outline is `thickness` pixels wide and straddles the region edge. The
/// caption baseline starts at the region origin plus `label_offset`.
pub struct BoxAnnotator {
    label: String,
    color: Rgb<u8>,
    thickness: u32,
    label_offset: (i32, i32),
    font: &'static MonoFont<'static>,
}

impl BoxAnnotator {
    pub fn new(label: impl Into<String>, color: [u8; 3], thickness: u32, label_offset: (i32, i32)) -> Self {
        Self {
            label: label.into(),
            color: Rgb(color),
            thickness: thickness.max(1),
            label_offset,
            font: LABEL_FONT,
        }
    }
}

impl Default for BoxAnnotator {
    fn default() -> Self {
        Self::new(PLATE_LABEL, ANNOTATION_COLOR, ANNOTATION_THICKNESS, LABEL_OFFSET)
    }
}

impl FrameAnnotator for BoxAnnotator {
    fn annotate(&self, frame: &mut Frame, regions: &[Region]) -> Result<(), AnnotatorError> {
        if frame.format() != PixelFormat::Rgb {
            return Err(format!("annotation needs an RGB frame, got {:?}", frame.format()).into());
        }
        let (width, height) = (frame.width(), frame.height());
        let mut canvas = ImageBuffer::<Rgb<u8>, &mut [u8]>::from_raw(width, height, frame.data_mut())
            .ok_or("frame buffer does not match its dimensions")?;

        // Outward growth per ring; even widths put the extra ring outside.
        let first = -(((self.thickness - 1) / 2) as i32);
        let last = first + self.thickness as i32;

        for region in regions {
            for d in first..last {
                let w = region.width + 2 * d;
                let h = region.height + 2 * d;
                if w <= 0 || h <= 0 {
                    continue;
                }
                let rect = Rect::at(region.x - d, region.y - d).of_size(w as u32, h as u32);
                draw_hollow_rect_mut(&mut canvas, rect, self.color);
            }
            let origin = (
                region.x + self.label_offset.0,
                region.y + self.label_offset.1,
            );
            draw_label(&mut canvas, &self.label, origin, self.color, self.font);
        }
        Ok(())
    }
}
