use image::RgbaImage;

/// Fraction of the dim range that depends on image brightness.
pub const DIM_RANGE: f32 = 0.5;

/// Mean perceived luminance in `[0, 1)`, using integer-truncated
/// per-pixel luma like the preview probe expects. Empty images are `0.0`.
#[must_use]
pub fn mean_luminance(image: &RgbaImage) -> f32 {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return 0.0;
    }
    let total: u64 = image
        .pixels()
        .map(|p| {
            let [r, g, b, _] = p.0;
            (0.21 * f32::from(r) + 0.71 * f32::from(g) + 0.07 * f32::from(b)) as u64
        })
        .sum();
    (total / count) as f32 / 256.0
}

/// How dark an image looks: `1.0` for black, approaching `0.0` for white.
#[must_use]
pub fn darkness(image: &RgbaImage) -> f32 {
    1.0 - mean_luminance(image)
}

/// Overlay dim for an image of the given darkness. Darker images get less
/// dimming; the result stays within `[max_dim * (1 - DIM_RANGE), max_dim]`.
#[must_use]
pub fn dim_amount(max_dim: u32, darkness: f32) -> u32 {
    let brightness = (1.0 - darkness).clamp(0.0, 1.0);
    (max_dim as f32 * (1.0 - DIM_RANGE + DIM_RANGE * brightness.sqrt())) as u32
}
