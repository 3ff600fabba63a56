//! Which part of a picture's model space is visible on screen.
//!
//! A picture always occupies `[-1, 1]` on both axes of model space. The
//! viewport is the box of model space the orthographic projection maps onto
//! the surface.

use crate::processing::math::{interpolate, uninterpolate};
use crate::render::focus::FocusRect;

/// Horizontal panning never exceeds this many screen widths.
pub const MAX_PAN_SCREEN_WIDTHS: f32 = 1.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Default for ViewportRect {
    fn default() -> Self {
        Self {
            left: -1.0,
            top: 1.0,
            right: 1.0,
            bottom: -1.0,
        }
    }
}

impl ViewportRect {
    /// Aspect-fill viewport for `image_aspect` on a `screen_aspect` surface,
    /// panned horizontally by `normal_offset_x` in `[0, 1]`.
    ///
    /// Returns `None` when the screen has no aspect ratio yet.
    #[must_use]
    pub fn aspect_fill(screen_aspect: f32, image_aspect: f32, normal_offset_x: f32) -> Option<Self> {
        let screen_to_image = screen_aspect / image_aspect;
        if screen_to_image == 0.0 || !screen_to_image.is_finite() {
            return None;
        }
        let zoom = screen_to_image.max(1.0);
        let scaled = zoom / screen_to_image;
        let max_pan = MAX_PAN_SCREEN_WIDTHS.min(scaled);

        let left = interpolate(
            -1.0,
            1.0,
            interpolate(
                (1.0 - max_pan / scaled) / 2.0,
                (1.0 + (max_pan - 2.0) / scaled) / 2.0,
                normal_offset_x,
            ),
        );
        Some(Self {
            left,
            right: left + 2.0 / scaled,
            bottom: -1.0 / zoom,
            top: 1.0 / zoom,
        })
    }

    /// Move each edge toward `focus` by `amount` in `[0, 1]`.
    #[must_use]
    pub fn toward_focus(self, focus: FocusRect, amount: f32) -> Self {
        Self {
            left: interpolate(self.left, interpolate(-1.0, 1.0, focus.left), amount),
            top: interpolate(self.top, interpolate(1.0, -1.0, focus.top), amount),
            right: interpolate(self.right, interpolate(-1.0, 1.0, focus.right), amount),
            bottom: interpolate(self.bottom, interpolate(1.0, -1.0, focus.bottom), amount),
        }
    }

    /// This viewport expressed in normalized image coordinates.
    #[must_use]
    pub fn to_focus_rect(self) -> FocusRect {
        FocusRect {
            left: uninterpolate(-1.0, 1.0, self.left),
            top: uninterpolate(1.0, -1.0, self.top),
            right: uninterpolate(-1.0, 1.0, self.right),
            bottom: uninterpolate(1.0, -1.0, self.bottom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn matching_aspect_shows_everything() {
        let vp = ViewportRect::aspect_fill(1.5, 1.5, 0.5).unwrap();
        assert!(approx(vp.left, -1.0) && approx(vp.right, 1.0));
        assert!(approx(vp.bottom, -1.0) && approx(vp.top, 1.0));
    }

    #[test]
    fn wide_image_pans_within_bounds() {
        // Image four times wider than the screen: pan is capped at 1.8 widths.
        for offset in [0.0, 0.25, 0.5, 1.0] {
            let vp = ViewportRect::aspect_fill(0.5, 2.0, offset).unwrap();
            assert!(vp.left >= -1.0 - 1e-6 && vp.right <= 1.0 + 1e-6, "{vp:?}");
            assert!(approx(vp.right - vp.left, 0.5));
            assert!(approx(vp.top, 1.0));
        }
        let start = ViewportRect::aspect_fill(0.5, 2.0, 0.0).unwrap();
        let end = ViewportRect::aspect_fill(0.5, 2.0, 1.0).unwrap();
        assert!(approx(start.left, -0.45));
        assert!(approx(end.right, 0.45));
    }

    #[test]
    fn tall_image_crops_vertically() {
        let vp = ViewportRect::aspect_fill(1.0, 0.5, 0.5).unwrap();
        assert!(approx(vp.left, -1.0) && approx(vp.right, 1.0));
        assert!(approx(vp.top, 0.5) && approx(vp.bottom, -0.5));
    }

    #[test]
    fn zero_screen_aspect_is_skipped() {
        assert!(ViewportRect::aspect_fill(0.0, 1.0, 0.5).is_none());
    }

    #[test]
    fn focus_round_trip_and_full_interpolation() {
        let vp = ViewportRect::aspect_fill(1.0, 0.5, 0.5).unwrap();
        let focus = vp.to_focus_rect();
        assert!(approx(focus.top, 0.25) && approx(focus.bottom, 0.75));
        let moved = ViewportRect::default().toward_focus(focus, 1.0);
        assert!(approx(moved.top, vp.top) && approx(moved.bottom, vp.bottom));
        let unmoved = vp.toward_focus(FocusRect::new(0.0, 0.0, 0.5, 0.5), 0.0);
        assert_eq!(unmoved, vp);
    }
}
