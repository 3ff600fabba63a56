use anyhow::{Context, Result, ensure};
use fast_image_resize as fir;
use image::RgbaImage;

/// Largest power-of-two subsampling factor that keeps `dimension` above
/// `target` after division.
#[must_use]
pub fn sample_size(dimension: u32, target: u32) -> u32 {
    let mut sample = 1u32;
    while sample < (1 << 30) && dimension / (sample << 1) > target {
        sample <<= 1;
    }
    sample
}

/// Size produced by decoding a `width`x`height` image toward a
/// `target_width`x`target_height` hint with power-of-two subsampling.
#[must_use]
pub fn subsampled_size(width: u32, height: u32, target_width: u32, target_height: u32) -> (u32, u32) {
    let sample = sample_size(width, target_width).max(sample_size(height, target_height));
    ((width / sample).max(1), (height / sample).max(1))
}

/// Shrink to exactly `width`x`height` by box averaging, as a subsampling
/// decoder would.
pub fn subsample(image: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage> {
    resample(image, width, height, fir::FilterType::Box)
}

/// Shrink `image` toward a target hint the way [`subsampled_size`] does.
pub fn subsample_toward(image: &RgbaImage, target_width: u32, target_height: u32) -> Result<RgbaImage> {
    let (width, height) = subsampled_size(image.width(), image.height(), target_width, target_height);
    subsample(image, width, height)
}

/// Bilinear scale to exactly `width`x`height`; used for blur bases whose
/// size is not a power-of-two fraction of the decode.
pub fn scale(image: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage> {
    resample(image, width, height, fir::FilterType::Bilinear)
}

fn resample(image: &RgbaImage, width: u32, height: u32, filter: fir::FilterType) -> Result<RgbaImage> {
    ensure!(width > 0 && height > 0, "cannot resample to {width}x{height}");
    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }
    let src = fir::images::ImageRef::new(
        image.width(),
        image.height(),
        image.as_raw(),
        fir::PixelType::U8x4,
    )
    .context("wrapping source pixels")?;
    let mut dst = fir::images::Image::new(width, height, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(filter));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src, &mut dst, &options)
        .with_context(|| format!("resampling to {width}x{height}"))?;
    RgbaImage::from_raw(width, height, dst.into_vec()).context("resampled buffer has the wrong length")
}
