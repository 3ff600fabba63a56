//! Pre-scaled blur and desaturation for blurred keyframes.

use image::{RgbaImage, imageops};

use crate::config::BlurBackend;

/// Largest blur radius, in pixels of the pre-scaled bitmap, a keyframe uses.
pub const MAX_SUPPORTED_BLUR_PIXELS: u32 = 25;

/// Rec. 601 luma weights used for desaturation.
const LUMA: [f32; 3] = [0.299, 0.587, 0.114];

/// Gaussian sigma that visually matches a box-style blur `radius`.
#[must_use]
pub fn sigma_for_radius(radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    0.4 * radius.min(MAX_SUPPORTED_BLUR_PIXELS as f32) + 0.6
}

/// Blur by `radius` pixels, then pull colors toward grey by `desaturate`
/// (clamped to `[0, 1]`).
#[must_use]
pub fn blur_and_desaturate(
    image: &RgbaImage,
    radius: f32,
    desaturate_amount: f32,
    backend: BlurBackend,
) -> RgbaImage {
    let mut out = apply_blur(image, sigma_for_radius(radius), backend);
    desaturate(&mut out, desaturate_amount);
    out
}

pub fn apply_blur(image: &RgbaImage, sigma: f32, backend: BlurBackend) -> RgbaImage {
    if sigma <= 0.0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    match backend {
        BlurBackend::Cpu => imageops::blur(image, sigma),
        BlurBackend::Neon => neon_blur(image, sigma).unwrap_or_else(|| imageops::blur(image, sigma)),
    }
}

/// Apply the saturation color matrix in place. `0` leaves the image alone,
/// `1` turns it fully grey. Alpha is untouched.
pub fn desaturate(image: &mut RgbaImage, amount: f32) {
    let amount = amount.clamp(0.0, 1.0);
    if amount == 0.0 {
        return;
    }
    let keep = 1.0 - amount;
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let rgb = [f32::from(r), f32::from(g), f32::from(b)];
        let luma = amount * (LUMA[0] * rgb[0] + LUMA[1] * rgb[1] + LUMA[2] * rgb[2]);
        let mix = |c: f32| (keep * c + luma).round().clamp(0.0, 255.0) as u8;
        pixel.0 = [mix(rgb[0]), mix(rgb[1]), mix(rgb[2]), a];
    }
}

#[cfg(target_arch = "aarch64")]
fn neon_blur(image: &RgbaImage, sigma: f32) -> Option<RgbaImage> {
    if !std::arch::is_aarch64_feature_detected!("neon") {
        return None;
    }

    let kernel = neon::Kernel::gaussian(sigma);
    if kernel.radius == 0 {
        return Some(image.clone());
    }

    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut plane: Vec<f32> = image.as_raw().iter().map(|&c| f32::from(c)).collect();
    let mut scratch = vec![0.0f32; plane.len()];

    // SAFETY: NEON support was checked above and both buffers hold
    // width * height RGBA lanes.
    unsafe {
        neon::convolve(&plane, &mut scratch, width, height, &kernel, true);
        neon::convolve(&scratch, &mut plane, width, height, &kernel, false);
    }

    let bytes = plane
        .iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    RgbaImage::from_raw(image.width(), image.height(), bytes)
}

#[cfg(not(target_arch = "aarch64"))]
fn neon_blur(_image: &RgbaImage, _sigma: f32) -> Option<RgbaImage> {
    None
}

#[cfg(target_arch = "aarch64")]
mod neon {
    use std::arch::aarch64::*;

    pub struct Kernel {
        pub weights: Vec<f32>,
        pub radius: usize,
    }

    impl Kernel {
        pub fn gaussian(sigma: f32) -> Self {
            let sigma = sigma.max(0.01);
            let radius = (sigma * 3.0).ceil() as usize;
            let denom = 2.0 * sigma * sigma;
            let mut weights: Vec<f32> = (0..=2 * radius)
                .map(|i| {
                    let x = i as f32 - radius as f32;
                    (-x * x / denom).exp()
                })
                .collect();
            let sum: f32 = weights.iter().sum();
            if sum > 0.0 {
                weights.iter_mut().for_each(|w| *w /= sum);
            }
            Self { weights, radius }
        }
    }

    /// One separable pass over interleaved RGBA floats with edge clamping.
    #[target_feature(enable = "neon")]
    pub unsafe fn convolve(
        src: &[f32],
        dst: &mut [f32],
        width: usize,
        height: usize,
        kernel: &Kernel,
        horizontal: bool,
    ) {
        let radius = kernel.radius as isize;
        for y in 0..height {
            for x in 0..width {
                let mut acc = vdupq_n_f32(0.0);
                for (tap, &weight) in kernel.weights.iter().enumerate() {
                    let delta = tap as isize - radius;
                    let (sx, sy) = if horizontal {
                        (clamp_index(x as isize + delta, width), y)
                    } else {
                        (x, clamp_index(y as isize + delta, height))
                    };
                    let lane = unsafe { vld1q_f32(src.as_ptr().add((sy * width + sx) * 4)) };
                    acc = vmlaq_f32(acc, lane, vdupq_n_f32(weight));
                }
                unsafe { vst1q_f32(dst.as_mut_ptr().add((y * width + x) * 4), acc) };
            }
        }
    }

    #[inline(always)]
    fn clamp_index(value: isize, len: usize) -> usize {
        value.clamp(0, len as isize - 1) as usize
    }
}
