//! Bitmap text drawn straight into `image` buffers.

use std::convert::Infallible;

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use image::{GenericImage, Rgb};

/// Default label font, about 11 px from cap to descender.
pub const LABEL_FONT: &MonoFont<'static> = &FONT_6X10;

/// Draws `text` with its baseline starting at `origin`.
///
/// Glyphs falling outside the image are clipped; the origin itself may lie
/// anywhere, including at negative coordinates.
pub fn draw_label<I>(image: &mut I, text: &str, origin: (i32, i32), color: Rgb<u8>, font: &MonoFont)
where
    I: GenericImage<Pixel = Rgb<u8>>,
{
    let style = MonoTextStyle::new(font, Rgb888::new(color[0], color[1], color[2]));
    let mut target = ImageDrawTarget { image };
    Text::new(text, Point::new(origin.0, origin.1), style)
        .draw(&mut target)
        .ok();
}

struct ImageDrawTarget<'a, I> {
    image: &'a mut I,
}

impl<I: GenericImage<Pixel = Rgb<u8>>> OriginDimensions for ImageDrawTarget<'_, I> {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

impl<I: GenericImage<Pixel = Rgb<u8>>> DrawTarget for ImageDrawTarget<'_, I> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<P>(&mut self, pixels: P) -> Result<(), Self::Error>
    where
        P: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let width = self.image.width() as i32;
        let height = self.image.height() as i32;
        for Pixel(coord, color) in pixels {
            if coord.x < 0 || coord.y < 0 || coord.x >= width || coord.y >= height {
                continue;
            }
            self.image.put_pixel(
                coord.x as u32,
                coord.y as u32,
                Rgb([color.r(), color.g(), color.b()]),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);

    fn painted(img: &RgbImage) -> Vec<(u32, u32)> {
        img.enumerate_pixels()
            .filter(|(_, _, p)| **p == YELLOW)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn test_text_sits_above_baseline() {
        let mut img = RgbImage::new(200, 60);
        draw_label(&mut img, "PLATE", (10, 40), YELLOW, LABEL_FONT);
        let px = painted(&img);
        assert!(!px.is_empty());
        assert!(px.iter().all(|&(x, y)| x >= 10 && y < 40 + 5));
        assert!(px.iter().any(|&(_, y)| y < 37));
    }

    #[test]
    fn test_label_font_is_compact() {
        let mut img = RgbImage::new(300, 60);
        draw_label(&mut img, "Number plate detected", (10, 40), YELLOW, LABEL_FONT);
        let px = painted(&img);
        let top = px.iter().map(|&(_, y)| y).min().unwrap();
        let bottom = px.iter().map(|&(_, y)| y).max().unwrap();
        let right = px.iter().map(|&(x, _)| x).max().unwrap();
        assert!(bottom - top < 12, "label spans {top}..={bottom}");
        assert!(right < 10 + 21 * 6);
    }

    #[test]
    fn test_text_outside_image_is_clipped() {
        let mut img = RgbImage::new(30, 30);
        draw_label(&mut img, "Number plate detected", (-20, 5), YELLOW, LABEL_FONT);
        draw_label(&mut img, "X", (500, 500), YELLOW, LABEL_FONT);
        assert_eq!(img.dimensions(), (30, 30));
    }

    #[test]
    fn test_empty_text_draws_nothing() {
        let mut img = RgbImage::new(20, 20);
        draw_label(&mut img, "", (5, 15), YELLOW, LABEL_FONT);
        assert!(painted(&img).is_empty());
    }
}
