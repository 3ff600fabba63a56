//! CPU half of loading a picture: decode, measure brightness and build the
//! blurred keyframes. Runs off the render thread; the result is uploaded
//! later by [`PictureSet::install`](crate::render::picture_set::PictureSet::install).

use image::RgbaImage;
use tracing::{debug, error, warn};

use crate::config::BlurBackend;
use crate::error::DecodeError;
use crate::processing::blur::{MAX_SUPPORTED_BLUR_PIXELS, blur_and_desaturate};
use crate::processing::darkness::{darkness, dim_amount};
use crate::processing::math::{accelerate_decelerate, floor_even, round_mult4};
use crate::processing::resize::scale;
use crate::source::ImageSource;

pub const DEFAULT_BLUR_AMOUNT: u32 = 250;
pub const MAX_BLUR_AMOUNT: u32 = 500;
pub const DEFAULT_GREY_AMOUNT: u32 = 0;
pub const MAX_GREY_AMOUNT: u32 = 500;
pub const DEFAULT_MAX_DIM: u32 = 128;

pub const DEMO_BLUR_AMOUNT: u32 = 250;
pub const DEMO_DIM: u32 = 64;
pub const DEMO_GREY_AMOUNT: u32 = 0;

/// Edge length of the brightness probe decode.
pub const PROBE_DIMENSION: u32 = 64;

/// Everything the worker needs to know about the renderer at request time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadParams {
    /// Number of blurred keyframes (`N`).
    pub keyframe_count: usize,
    pub surface_height: u32,
    pub max_prescaled_blur_pixels: u32,
    pub blurred_sample_size: u32,
    pub max_dim: u32,
    pub max_grey: u32,
    pub demo_mode: bool,
    pub blur_backend: BlurBackend,
}

/// Pixels for keyframes `1..=N`.
#[derive(Debug)]
pub enum BlurredKeyframes {
    /// Neither blur nor grey is configured; every keyframe shows the sharp image.
    SameAsSharp,
    /// One entry per blurred keyframe; `None` where building failed.
    Built(Vec<Option<RgbaImage>>),
}

#[derive(Debug)]
pub struct PreparedPicture {
    pub has_image: bool,
    pub aspect_ratio: f32,
    pub dim_amount: u32,
    pub sharp: Option<RgbaImage>,
    pub blurred: BlurredKeyframes,
}

impl PreparedPicture {
    /// A picture with nothing to show.
    #[must_use]
    pub fn empty(keyframe_count: usize) -> Self {
        Self {
            has_image: false,
            aspect_ratio: 1.0,
            dim_amount: DEFAULT_MAX_DIM,
            sharp: None,
            blurred: BlurredKeyframes::Built((0..keyframe_count).map(|_| None).collect()),
        }
    }
}

/// Blur radius for keyframe `frame`, eased up to the maximum at `N`.
#[must_use]
pub fn blur_radius_at_frame(max_prescaled_blur_pixels: u32, frame: f32, keyframe_count: usize) -> f32 {
    if keyframe_count == 0 {
        return 0.0;
    }
    max_prescaled_blur_pixels as f32 * accelerate_decelerate(frame / keyframe_count as f32)
}

/// Blur budget for a surface `surface_height` pixels tall.
///
/// Returns `(max_prescaled_blur_pixels, blurred_sample_size)`: blurred
/// keyframes are built at `surface_height / blurred_sample_size`, where a
/// blur of at most [`MAX_SUPPORTED_BLUR_PIXELS`] covers the requested
/// strength.
#[must_use]
pub fn blur_budget(surface_height: u32, blur_amount: u32) -> (u32, u32) {
    let max_blur_px = (surface_height as f32 * blur_amount as f32 * 0.0001) as u32;
    let mut sample_size = 4u32;
    while max_blur_px / sample_size > MAX_SUPPORTED_BLUR_PIXELS {
        sample_size <<= 1;
    }
    (max_blur_px / sample_size, sample_size)
}

/// Decode `source` and build all keyframe bitmaps for the given parameters.
#[must_use]
pub fn prepare_picture(source: &dyn ImageSource, params: &LoadParams) -> PreparedPicture {
    let n = params.keyframe_count;
    let (width, height) = source.size();
    if width == 0 || height == 0 {
        return PreparedPicture::empty(n);
    }
    let aspect_ratio = width as f32 / height as f32;

    let dim_amount = if params.demo_mode {
        DEMO_DIM
    } else {
        match source.decode_probe(PROBE_DIMENSION) {
            Ok(probe) => dim_amount(params.max_dim, darkness(&probe)),
            Err(err) => {
                warn!(error = %err, "brightness probe failed; assuming black");
                dim_amount(params.max_dim, 1.0)
            }
        }
    };

    let sharp = decode_sharp(source, aspect_ratio, params.surface_height);

    let blurred = if params.max_prescaled_blur_pixels == 0 && params.max_grey == 0 {
        BlurredKeyframes::SameAsSharp
    } else {
        BlurredKeyframes::Built(build_blurred(source, aspect_ratio, params))
    };

    PreparedPicture {
        has_image: true,
        aspect_ratio,
        dim_amount,
        sharp,
        blurred,
    }
}

/// Decode at surface height, halving the target each time memory runs out.
fn decode_sharp(source: &dyn ImageSource, aspect_ratio: f32, surface_height: u32) -> Option<RgbaImage> {
    let surface_height = surface_height.max(1);
    let mut sample_size = 1u32;
    loop {
        let target_h = surface_height / sample_size;
        if target_h == 0 {
            warn!(sample_size, "out of memory at every decode size; showing no sharp image");
            return None;
        }
        let target_w = (aspect_ratio * surface_height as f32 / sample_size as f32) as u32;
        match source.decode(target_w.max(1), target_h) {
            Ok(img) if img.width() > 0 && img.height() > 0 => {
                debug!(
                    width = img.width(),
                    height = img.height(),
                    sample_size,
                    "decoded sharp keyframe"
                );
                return Some(img);
            }
            Ok(_) => return None,
            Err(DecodeError::OutOfMemory { width, height }) => {
                debug!(width, height, sample_size, "decode out of memory; halving target");
                sample_size <<= 1;
            }
            Err(DecodeError::Failed(reason)) => {
                warn!(%reason, "sharp decode failed");
                return None;
            }
        }
    }
}

fn build_blurred(source: &dyn ImageSource, aspect_ratio: f32, params: &LoadParams) -> Vec<Option<RgbaImage>> {
    let n = params.keyframe_count;
    let target_height = if params.max_prescaled_blur_pixels > 0 {
        params.surface_height / params.blurred_sample_size.max(1)
    } else {
        params.surface_height
    };
    let scaled_h = floor_even(target_height).max(2);
    let scaled_w = round_mult4((scaled_h as f32 * aspect_ratio) as u32).max(4);

    let base = match source.decode(scaled_w, scaled_h) {
        Ok(img) if img.width() > 0 && img.height() > 0 => scale(&img, scaled_w, scaled_h),
        Ok(_) => Err(anyhow::anyhow!("empty decode")),
        Err(err) => Err(err.into()),
    };
    let base = match base {
        Ok(base) => base,
        Err(err) => {
            error!(error = %err, "failed to build blurred keyframes");
            return (0..n).map(|_| None).collect();
        }
    };

    (1..=n)
        .map(|frame| {
            let desaturate = params.max_grey as f32 / MAX_GREY_AMOUNT as f32 * frame as f32 / n as f32;
            let radius = if params.max_prescaled_blur_pixels > 0 {
                blur_radius_at_frame(params.max_prescaled_blur_pixels, frame as f32, n)
            } else {
                0.0
            };
            debug!(frame, radius, desaturate, width = scaled_w, height = scaled_h, "building keyframe");
            Some(blur_and_desaturate(&base, radius, desaturate, params.blur_backend))
        })
        .collect()
}
