use image::{Rgb, RgbImage};

use crate::cluster::{BLACK, Pixel, RefColor};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Class {
    /// Close to the interference-line color.
    Noise,
    /// Neither noise nor background.
    Text,
    /// Close to the background color and not to the noise color.
    Background,
}

pub fn classify(pixel: Pixel, background: RefColor, noise: RefColor, limit_d: f64) -> Class {
    if noise.is_similar(pixel, limit_d) {
        Class::Noise
    } else if !background.is_similar(pixel, limit_d) {
        Class::Text
    } else {
        Class::Background
    }
}

/// Paints noise as `background`, text as black and leaves the rest alone.
pub fn recolor(image: &mut RgbImage, background: RefColor, noise: RefColor, limit_d: f64) {
    recolor_with_fill(image, background, noise, limit_d, background.pixel());
}

/// Like [`recolor`], but noise is painted with `fill`.
pub fn recolor_with_fill(
    image: &mut RgbImage,
    background: RefColor,
    noise: RefColor,
    limit_d: f64,
    fill: Pixel,
) {
    for (_, _, px) in image.enumerate_pixels_mut() {
        match classify(*px, background, noise, limit_d) {
            Class::Noise => *px = fill,
            Class::Text => *px = BLACK,
            Class::Background => {}
        }
    }
}

/// The color the older tool actually wrote for `color`: its packing parsed as
/// `r << (16 + g) << (8 + b)` with 32-bit shift semantics, read back as
/// 0xRRGGBB. Channels above 255 take part unclamped.
pub fn legacy_packed(color: RefColor) -> Pixel {
    let [r, g, b] = color.0.map(|c| c as i32);
    let packed = r.wrapping_shl((16 + g) as u32).wrapping_shl((8 + b) as u32);
    Rgb([(packed >> 16) as u8, (packed >> 8) as u8, packed as u8])
}
