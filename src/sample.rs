use image::RgbImage;

use crate::{cluster::Pixel, config::SampleWidth};

/// Number of leftmost columns to scan, never wider than the image.
pub fn region_width(image: &RgbImage, width: SampleWidth) -> u32 {
    let len = match width {
        // Tied to height, not width: captchas are wide and the left edge is
        // mostly background.
        SampleWidth::QuarterHeight => image.height() / 4,
        SampleWidth::Columns(n) => n,
    };
    len.min(image.width())
}

/// Pixels of the first `len` columns, column by column, top to bottom.
pub fn sample_columns(image: &RgbImage, len: u32) -> impl Iterator<Item = Pixel> + '_ {
    let height = image.height();
    let len = len.min(image.width());
    (0..len).flat_map(move |x| (0..height).map(move |y| *image.get_pixel(x, y)))
}
