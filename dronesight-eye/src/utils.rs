//! Utility functions for vision preprocessing

use dronesight_core::{Error, RasterFrame, Result};
use image::{imageops::FilterType, RgbImage};

/// Resize a frame to `size` x `size` and lay it out as a normalized CHW
/// float tensor (RGB, values in [0, 1])
pub fn frame_to_chw_tensor(frame: &RasterFrame, size: u32) -> Result<Vec<f32>> {
    if size == 0 {
        return Err(Error::Detection("Target size cannot be zero".to_string()));
    }

    let plane = (size as usize)
        .checked_mul(size as usize)
        .ok_or_else(|| Error::Detection("Target size too large, would overflow".to_string()))?;

    let image = RgbImage::from_raw(frame.width(), frame.height(), frame.pixels().to_vec())
        .ok_or_else(|| Error::Detection("Frame buffer does not match its dimensions".to_string()))?;
    let resized = image::imageops::resize(&image, size, size, FilterType::Triangle);

    let mut tensor = vec![0.0f32; plane * 3];
    for (idx, pixel) in resized.pixels().enumerate() {
        for channel in 0..3 {
            tensor[channel * plane + idx] = pixel[channel] as f32 / 255.0;
        }
    }

    Ok(tensor)
}

/// Factors mapping model-input coordinates back onto the frame
pub fn input_scale(frame: &RasterFrame, size: u32) -> (f32, f32) {
    (
        frame.width() as f32 / size as f32,
        frame.height() as f32 / size as f32,
    )
}
