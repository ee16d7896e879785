use std::path::Path;

use image::{Rgb32FImage, RgbImage};
use ndarray::Array3;

use crate::consts::COLOR_CHANNEL_COUNT;
use crate::error::Result;

/// Load an image as RGB float pixels in [0.0, 1.0], shape `(height, width, 3)`.
pub fn load_rgb(path: &Path) -> Result<Array3<f32>> {
    let img = image::open(path)?;
    Ok(rgb32f_to_array(&img.to_rgb32f()))
}

/// Convert an 8-bit RGB buffer to the float layout used by preprocessing.
pub fn rgb8_to_array(img: &RgbImage) -> Array3<f32> {
    let (w, h) = img.dimensions();
    Array3::from_shape_fn((h as usize, w as usize, COLOR_CHANNEL_COUNT), |(row, col, ch)| {
        img.get_pixel(col as u32, row as u32).0[ch] as f32 / 255.0
    })
}

fn rgb32f_to_array(img: &Rgb32FImage) -> Array3<f32> {
    let (w, h) = img.dimensions();
    Array3::from_shape_fn((h as usize, w as usize, COLOR_CHANNEL_COUNT), |(row, col, ch)| {
        img.get_pixel(col as u32, row as u32).0[ch]
    })
}
