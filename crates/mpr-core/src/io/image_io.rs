use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};

use crate::display::RgbaImage;
use crate::error::{MprError, Result};
use crate::image_data::ImageData;

fn check_slice(slice: usize, total: usize) -> Result<()> {
    if slice >= total {
        return Err(MprError::SliceIndexOutOfRange {
            index: slice,
            total,
        });
    }
    Ok(())
}

/// Save one light-box slice of a composite as 8-bit RGBA PNG.
pub fn save_rgba_png(composite: &RgbaImage, slice: usize, path: &Path) -> Result<()> {
    check_slice(slice, composite.slices())?;
    let (w, h) = (composite.width(), composite.height());
    let pixels: Vec<u8> = composite.slice(slice).iter().copied().collect();
    let buffer = image::RgbaImage::from_raw(w as u32, h as u32, pixels).ok_or(
        MprError::InvalidDimensions {
            width: w,
            height: h,
            depth: 1,
        },
    )?;
    buffer.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save the first component of one slice of a raw layer image as 8-bit
/// grayscale PNG, stretched to the slice's value range.
pub fn save_layer_png(layer: &ImageData, slice: usize, path: &Path) -> Result<()> {
    check_slice(slice, layer.dimensions()[2])?;
    let values = layer.slice_values(slice, 0);
    let (h, w) = values.dim();
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = if hi > lo { hi - lo } else { 1.0 };

    let mut img = GrayImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let t = ((values[[row, col]] - lo) / range).clamp(0.0, 1.0);
            img.put_pixel(col as u32, row as u32, Luma([(t * 255.0).round() as u8]));
        }
    }
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
