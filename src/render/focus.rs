//! Focus viewports: the region of each picture the art-detail view zooms to.

use std::sync::{Arc, Mutex, PoisonError};

/// Rectangle in normalized image coordinates: `(0, 0)` is the top-left
/// corner of the image and `(1, 1)` the bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FocusRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl FocusRect {
    #[must_use]
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Zero width or height; such a rect is seeded from the live viewport.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0
    }

    /// The part of an image visible when it is scaled to fill a screen of
    /// `screen_aspect`, centered.
    #[must_use]
    pub fn default_for(image_aspect: f32, screen_aspect: f32) -> Self {
        if image_aspect > screen_aspect {
            let half = screen_aspect / image_aspect / 2.0;
            Self::new(0.5 - half, 0.0, 0.5 + half, 1.0)
        } else {
            let half = image_aspect / screen_aspect / 2.0;
            Self::new(0.0, 0.5 - half, 1.0, 0.5 + half)
        }
    }
}

/// Focus rects shared with whatever UI lets the user pick a detail region,
/// keyed by picture-set id.
pub trait FocusViewportStore: Send + Sync {
    fn get(&self, id: usize) -> FocusRect;
    fn set(&self, id: usize, rect: FocusRect);

    /// Clear `id` so it is seeded again on the next focused frame.
    fn reset(&self, id: usize) {
        self.set(id, FocusRect::default());
    }
}

/// In-process store for the two picture-set slots.
#[derive(Debug, Clone, Default)]
pub struct SharedFocusViewports {
    inner: Arc<Mutex<[FocusRect; 2]>>,
}

impl SharedFocusViewports {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FocusViewportStore for SharedFocusViewports {
    fn get(&self, id: usize) -> FocusRect {
        let rects = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        rects.get(id).copied().unwrap_or_default()
    }

    fn set(&self, id: usize, rect: FocusRect) {
        let mut rects = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = rects.get_mut(id) {
            *slot = rect;
        }
    }
}
