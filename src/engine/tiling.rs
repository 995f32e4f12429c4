//! Tensor layout conversion and tiled forward-pass orchestration.
//!
//! The network operates on NCHW float tensors normalized to `[0, 1]`. Inputs
//! larger than one tile are processed as an overlapping grid: each tile is
//! run with a halo of context pixels, and only the unpadded interior of the
//! scaled output is stitched into the canvas, so tile seams never show.
//!
//! Everything here is pure with respect to the network: the forward pass is
//! an injected closure, which keeps the geometry testable without a device.

use image::RgbImage;
use ndarray::{s, Array4};

use crate::error::EngineError;

/// Convert an RGB8 image to a `[1, 3, H, W]` float tensor in `[0, 1]`.
pub fn image_to_nchw(image: &RgbImage) -> Array4<f32> {
    let (w, h) = image.dimensions();
    let (w, h) = (w as usize, h as usize);
    let mut nchw = Array4::<f32>::zeros((1, 3, h, w));

    for (x, y, pixel) in image.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        nchw[[0, 0, y, x]] = pixel.0[0] as f32 / 255.0;
        nchw[[0, 1, y, x]] = pixel.0[1] as f32 / 255.0;
        nchw[[0, 2, y, x]] = pixel.0[2] as f32 / 255.0;
    }

    nchw
}

/// Convert a `[1, 3, H, W]` float tensor in `[0, 1]` back to RGB8.
///
/// Values are denormalized with ×255 and clamped; networks routinely
/// overshoot the unit range slightly.
pub fn nchw_to_image(tensor: &Array4<f32>) -> Result<RgbImage, EngineError> {
    let shape = tensor.shape();
    if shape[0] != 1 || shape[1] != 3 {
        return Err(EngineError::Inference(format!(
            "expected [1, 3, H, W] output tensor, got {:?}",
            shape
        )));
    }
    let (h, w) = (shape[2], shape[3]);

    let mut image = RgbImage::new(w as u32, h as u32);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let (x, y) = (x as usize, y as usize);
        pixel.0 = [
            (tensor[[0, 0, y, x]] * 255.0).round().clamp(0.0, 255.0) as u8,
            (tensor[[0, 1, y, x]] * 255.0).round().clamp(0.0, 255.0) as u8,
            (tensor[[0, 2, y, x]] * 255.0).round().clamp(0.0, 255.0) as u8,
        ];
    }
    Ok(image)
}

/// Check that a forward pass produced exactly `input * scale` dimensions.
fn check_output_shape(
    output: &Array4<f32>,
    in_h: usize,
    in_w: usize,
    scale: usize,
) -> Result<(), EngineError> {
    let (got_h, got_w) = (output.shape()[2], output.shape()[3]);
    let (expected_h, expected_w) = (in_h * scale, in_w * scale);
    if got_h != expected_h || got_w != expected_w {
        return Err(EngineError::OutputShape {
            expected_h,
            expected_w,
            got_h,
            got_w,
        });
    }
    Ok(())
}

/// Run a scale-`s` forward pass over `input`, tiling when the image exceeds
/// `tile_size² ` pixels.
///
/// `forward` receives one NCHW tile at a time and must return a tensor of
/// exactly `tile * scale` dimensions. Tiles overlap by `overlap` context
/// pixels on each interior edge (clamped at image borders); the overlap
/// region is discarded when stitching.
pub fn enhance_nchw<F>(
    input: &Array4<f32>,
    scale: usize,
    tile_size: usize,
    overlap: usize,
    mut forward: F,
) -> Result<Array4<f32>, EngineError>
where
    F: FnMut(&Array4<f32>) -> Result<Array4<f32>, EngineError>,
{
    let h = input.shape()[2];
    let w = input.shape()[3];

    if h * w <= tile_size * tile_size {
        let output = forward(input)?;
        check_output_shape(&output, h, w, scale)?;
        return Ok(output);
    }

    let step = tile_size.saturating_sub(overlap * 2);
    if step == 0 {
        return Err(EngineError::Inference(format!(
            "tile size {} is too small for overlap {}",
            tile_size, overlap
        )));
    }

    let out_h = h * scale;
    let out_w = w * scale;
    let mut output = Array4::<f32>::zeros((1, 3, out_h, out_w));

    let mut y = 0usize;
    while y < h {
        let mut x = 0usize;
        while x < w {
            // Tile window including the halo, clamped to the image.
            let in_y0 = y.saturating_sub(overlap);
            let in_x0 = x.saturating_sub(overlap);
            let in_y1 = (y + tile_size).min(h);
            let in_x1 = (x + tile_size).min(w);

            let tile_h = in_y1 - in_y0;
            let tile_w = in_x1 - in_x0;

            let tile = input
                .slice(s![.., .., in_y0..in_y1, in_x0..in_x1])
                .to_owned();
            let tile_out = forward(&tile)?;
            check_output_shape(&tile_out, tile_h, tile_w, scale)?;

            // Interior of the scaled tile, halo discarded.
            let crop_y0 = (y - in_y0) * scale;
            let crop_x0 = (x - in_x0) * scale;
            let usable_h = (tile_h - (y - in_y0)).min(h - y);
            let usable_w = (tile_w - (x - in_x0)).min(w - x);

            let out_y0 = y * scale;
            let out_x0 = x * scale;
            let end_y = (out_y0 + usable_h * scale).min(out_h);
            let end_x = (out_x0 + usable_w * scale).min(out_w);

            output
                .slice_mut(s![.., .., out_y0..end_y, out_x0..end_x])
                .assign(&tile_out.slice(s![
                    ..,
                    ..,
                    crop_y0..crop_y0 + (end_y - out_y0),
                    crop_x0..crop_x0 + (end_x - out_x0)
                ]));

            x += step;
        }
        y += step;
    }

    Ok(output)
}

// =============================================================================
// Tests
// =============================================================================
