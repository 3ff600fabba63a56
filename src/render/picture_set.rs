//! One image's sharp and blurred keyframes plus the transform that places
//! them on screen.

use tracing::debug;

use crate::error::Error;
use crate::render::draw::{DrawList, IDENTITY, Mat4, multiply, ortho};
use crate::render::focus::FocusViewportStore;
use crate::render::prepare::{BlurredKeyframes, DEFAULT_MAX_DIM, PreparedPicture};
use crate::render::texture::TextureStore;
use crate::render::tiled_picture::TiledPicture;
use crate::render::viewport::ViewportRect;

/// Below this, `a1 * a2` counts as 1 when recomposing alphas.
const RECOMPOSE_EPSILON: f32 = 1e-4;

#[derive(Debug)]
enum Keyframe {
    Absent,
    Picture(TiledPicture),
    /// Draws keyframe 0.
    SameAsSharp,
}

/// Inputs to [`PictureSet::recompute_transform`] that belong to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformInputs {
    pub screen_aspect: f32,
    pub normal_offset_x: f32,
    /// How far unblurred the view is, `0` (fully blurred) to `1` (sharp).
    pub focus_amount: f32,
    pub focus_linked: bool,
    /// Whether a degenerate focus rect may be seeded from the viewport.
    pub may_write_focus: bool,
}

#[derive(Debug)]
pub struct PictureSet {
    id: usize,
    keyframes: Vec<Keyframe>,
    has_image: bool,
    aspect_ratio: f32,
    dim_amount: u32,
    viewport: ViewportRect,
    projection: Mat4,
}

impl PictureSet {
    #[must_use]
    pub fn new(id: usize, keyframe_count: usize) -> Self {
        Self {
            id,
            keyframes: (0..=keyframe_count).map(|_| Keyframe::Absent).collect(),
            has_image: false,
            aspect_ratio: 1.0,
            dim_amount: DEFAULT_MAX_DIM,
            viewport: ViewportRect::default(),
            projection: IDENTITY,
        }
    }

    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn has_image(&self) -> bool {
        self.has_image
    }

    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    #[must_use]
    pub fn dim_amount(&self) -> u32 {
        self.dim_amount
    }

    #[must_use]
    pub fn viewport(&self) -> ViewportRect {
        self.viewport
    }

    #[must_use]
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// Number of blurred keyframes (`N`).
    #[must_use]
    pub fn keyframe_count(&self) -> usize {
        self.keyframes.len() - 1
    }

    /// Picture drawn for keyframe `index`, following aliases.
    #[must_use]
    pub fn keyframe(&self, index: usize) -> Option<&TiledPicture> {
        match self.keyframes.get(index)? {
            Keyframe::Absent => None,
            Keyframe::Picture(picture) => Some(picture),
            Keyframe::SameAsSharp => match self.keyframes.first()? {
                Keyframe::Picture(picture) => Some(picture),
                _ => None,
            },
        }
    }

    /// Upload a prepared picture, replacing whatever this set showed before.
    ///
    /// # Errors
    /// Propagates texture upload failures (debug builds only).
    pub fn install(&mut self, prepared: PreparedPicture, store: &mut dyn TextureStore) -> Result<(), Error> {
        self.destroy_pictures(store);
        self.has_image = prepared.has_image;
        self.aspect_ratio = prepared.aspect_ratio;
        self.dim_amount = prepared.dim_amount;
        if !prepared.has_image {
            return Ok(());
        }

        if let Some(sharp) = prepared.sharp.as_ref()
            && let Some(picture) = TiledPicture::upload(sharp, store)?
        {
            self.keyframes[0] = Keyframe::Picture(picture);
        }

        match prepared.blurred {
            BlurredKeyframes::SameAsSharp => {
                for slot in self.keyframes.iter_mut().skip(1) {
                    *slot = Keyframe::SameAsSharp;
                }
            }
            BlurredKeyframes::Built(frames) => {
                for (slot, frame) in self.keyframes.iter_mut().skip(1).zip(frames) {
                    if let Some(frame) = frame
                        && let Some(picture) = TiledPicture::upload(&frame, store)?
                    {
                        *slot = Keyframe::Picture(picture);
                    }
                }
            }
        }
        debug!(
            id = self.id,
            aspect = self.aspect_ratio,
            dim = self.dim_amount,
            "installed picture set"
        );
        Ok(())
    }

    /// Release every keyframe's textures. The set keeps its id and metadata.
    pub fn destroy_pictures(&mut self, store: &mut dyn TextureStore) {
        for slot in &mut self.keyframes {
            if let Keyframe::Picture(picture) = std::mem::replace(slot, Keyframe::Absent) {
                picture.destroy(store);
            }
        }
    }

    /// Forget the image entirely, as if freshly created.
    pub fn reset(&mut self, store: &mut dyn TextureStore) {
        self.destroy_pictures(store);
        self.has_image = false;
        self.aspect_ratio = 1.0;
        self.dim_amount = DEFAULT_MAX_DIM;
    }

    /// Recompute the projection for the current screen, pan and focus.
    ///
    /// Skipped while the screen has no aspect ratio.
    pub fn recompute_transform(&mut self, inputs: &TransformInputs, focus: &dyn FocusViewportStore) {
        let Some(mut viewport) = ViewportRect::aspect_fill(
            inputs.screen_aspect,
            self.aspect_ratio,
            inputs.normal_offset_x,
        ) else {
            return;
        };

        if inputs.focus_linked && inputs.focus_amount > 0.0 {
            let rect = focus.get(self.id);
            if rect.is_degenerate() {
                if inputs.may_write_focus {
                    focus.set(self.id, viewport.to_focus_rect());
                }
            } else {
                viewport = viewport.toward_focus(rect, inputs.focus_amount);
            }
        }

        self.viewport = viewport;
        self.projection = ortho(
            viewport.left,
            viewport.right,
            viewport.bottom,
            viewport.top,
            1.0,
            10.0,
        );
    }

    /// Record the set at `global_alpha` with the blur position `blur_frame`
    /// in `[0, N]`, blending the two nearest keyframes.
    pub fn draw_frame(&self, list: &mut DrawList, view: &Mat4, global_alpha: f32, blur_frame: f32) {
        if global_alpha <= 0.0 || !self.has_image {
            return;
        }
        let n = self.keyframe_count();
        let blur_frame = blur_frame.clamp(0.0, n as f32);
        let mvp = multiply(&self.projection, view);

        let lo = blur_frame.floor() as usize;
        let hi = (blur_frame.ceil() as usize).min(n);
        let local_hi_alpha = blur_frame - lo as f32;

        if lo == hi {
            if let Some(picture) = self.keyframe(lo) {
                picture.draw(list, &mvp, global_alpha);
            }
            return;
        }

        let (Some(low), Some(high)) = (self.keyframe(lo), self.keyframe(hi)) else {
            return;
        };
        if global_alpha >= 1.0 {
            low.draw(list, &mvp, 1.0);
            high.draw(list, &mvp, local_hi_alpha);
        } else {
            let (lo_alpha, hi_alpha) = recompose_alphas(global_alpha, local_hi_alpha);
            low.draw(list, &mvp, lo_alpha);
            high.draw(list, &mvp, hi_alpha);
        }
    }
}

/// Alphas for drawing keyframe `lo` then `hi` so that, composited over an
/// opaque background, the pair looks like a single layer at `global_alpha`
/// whose contents are `hi` blended over `lo` at `local_hi_alpha`.
///
/// When `global_alpha * local_hi_alpha` is effectively 1 the formula has no
/// finite answer; `hi` alone at that alpha is drawn over an opaque `lo`.
#[must_use]
pub fn recompose_alphas(global_alpha: f32, local_hi_alpha: f32) -> (f32, f32) {
    let hi_alpha = global_alpha * local_hi_alpha;
    let denom = hi_alpha - 1.0;
    if denom.abs() < RECOMPOSE_EPSILON {
        return (1.0, hi_alpha.min(1.0));
    }
    let lo_alpha = global_alpha * (local_hi_alpha - 1.0) / denom;
    (lo_alpha.clamp(0.0, 1.0), hi_alpha.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::draw::camera_view;
    use crate::render::focus::{FocusRect, SharedFocusViewports};
    use crate::render::texture::TextureId;
    use image::{Rgba, RgbaImage};

    #[derive(Default)]
    struct Counting {
        next: u32,
        live: Vec<TextureId>,
    }

    impl TextureStore for Counting {
        fn max_texture_dimension(&self) -> u32 {
            2048
        }

        fn upload(&mut self, _image: &RgbaImage) -> Result<TextureId, Error> {
            self.next += 1;
            let id = TextureId(self.next);
            self.live.push(id);
            Ok(id)
        }

        fn release(&mut self, id: TextureId) {
            self.live.retain(|live| *live != id);
        }
    }

    fn prepared(blurred: BlurredKeyframes) -> PreparedPicture {
        PreparedPicture {
            has_image: true,
            aspect_ratio: 1.5,
            dim_amount: 90,
            sharp: Some(RgbaImage::from_pixel(6, 4, Rgba([1, 1, 1, 255]))),
            blurred,
        }
    }

    fn built(n: usize) -> BlurredKeyframes {
        BlurredKeyframes::Built(
            (0..n)
                .map(|_| Some(RgbaImage::from_pixel(4, 2, Rgba([2, 2, 2, 255]))))
                .collect(),
        )
    }

    fn alphas(list: &DrawList) -> Vec<(u32, f32)> {
        list.textures().map(|(id, alpha)| (id.0, alpha)).collect()
    }

    #[test]
    fn install_uploads_all_keyframes_and_destroy_releases() {
        let mut store = Counting::default();
        let mut set = PictureSet::new(0, 2);
        set.install(prepared(built(2)), &mut store).unwrap();
        assert_eq!(store.live.len(), 3);
        assert_eq!(set.dim_amount(), 90);
        set.install(prepared(built(2)), &mut store).unwrap();
        assert_eq!(store.live.len(), 3);
        set.destroy_pictures(&mut store);
        assert!(store.live.is_empty());
        assert!(set.keyframe(0).is_none());
    }

    #[test]
    fn aliased_keyframes_share_the_sharp_picture() {
        let mut store = Counting::default();
        let mut set = PictureSet::new(0, 2);
        set.install(prepared(BlurredKeyframes::SameAsSharp), &mut store).unwrap();
        assert_eq!(store.live.len(), 1);
        let sharp = set.keyframe(0).map(|p| p.textures().collect::<Vec<_>>());
        assert_eq!(set.keyframe(2).map(|p| p.textures().collect::<Vec<_>>()), sharp);
    }

    #[test]
    fn draw_branches_follow_blur_position() {
        let mut store = Counting::default();
        let mut set = PictureSet::new(0, 2);
        set.install(prepared(built(2)), &mut store).unwrap();
        let view = camera_view();

        let mut list = DrawList::new();
        set.draw_frame(&mut list, &view, 0.0, 1.0);
        assert!(list.is_empty());

        set.draw_frame(&mut list, &view, 1.0, 2.0);
        assert_eq!(alphas(&list), vec![(3, 1.0)]);

        list.clear();
        set.draw_frame(&mut list, &view, 1.0, 0.25);
        assert_eq!(alphas(&list), vec![(1, 1.0), (2, 0.25)]);

        list.clear();
        set.draw_frame(&mut list, &view, 0.5, 1.5);
        let drawn = alphas(&list);
        assert_eq!(drawn.len(), 2);
        assert_eq!((drawn[0].0, drawn[1].0), (2, 3));
        assert!((drawn[1].1 - 0.25).abs() < 1e-6);
    }

    #[test]
    fn missing_neighbour_skips_the_blend() {
        let mut store = Counting::default();
        let mut set = PictureSet::new(0, 2);
        let blurred = BlurredKeyframes::Built(vec![None, Some(RgbaImage::from_pixel(4, 2, Rgba([2, 2, 2, 255])))]);
        set.install(prepared(blurred), &mut store).unwrap();
        let mut list = DrawList::new();
        set.draw_frame(&mut list, &camera_view(), 1.0, 0.5);
        assert!(list.is_empty());
        set.draw_frame(&mut list, &camera_view(), 1.0, 2.0);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn recomposed_alphas_match_single_layer_compositing() {
        for &(a1, a2) in &[(0.5, 0.5), (0.2, 0.9), (0.9, 0.1), (0.75, 0.3)] {
            let (b1, b2) = recompose_alphas(a1, a2);
            // Background 0, lo = 1, hi = 0: expected = a1 * (1 - a2).
            let composed = b1 * (1.0 - b2);
            assert!((composed - a1 * (1.0 - a2)).abs() < 1e-5, "{a1} {a2}");
            // Background 0, lo = 0, hi = 1: expected = a1 * a2.
            assert!((b2 - a1 * a2).abs() < 1e-6);
        }
    }

    #[test]
    fn recomposed_alphas_hold_over_any_background() {
        let over = |dst: f32, src: f32, alpha: f32| src * alpha + dst * (1.0 - alpha);
        for &(a1, a2) in &[(0.5, 0.5), (0.2, 0.9), (0.9, 0.1), (0.6, 0.8)] {
            let (b1, b2) = recompose_alphas(a1, a2);
            assert!((b1 - a1 * (a2 - 1.0) / (a1 * a2 - 1.0)).abs() < 1e-6);
            assert!((b2 - a1 * a2).abs() < 1e-6);
            for &(bg, lo, hi) in &[(0.3, 0.8, 0.1), (1.0, 0.0, 0.5), (0.6, 0.2, 0.9)] {
                let two_layers = over(over(bg, lo, b1), hi, b2);
                let single = over(bg, over(lo, hi, a2), a1);
                assert!((two_layers - single).abs() < 1e-5, "{a1} {a2} over {bg}");
            }
        }
    }

    #[test]
    fn recompose_guards_the_singular_case() {
        let (b1, b2) = recompose_alphas(1.0, 1.0);
        assert_eq!((b1, b2), (1.0, 1.0));
        let (b1, b2) = recompose_alphas(0.99999, 0.99999);
        assert!(b1.is_finite() && b2.is_finite());
    }

    #[test]
    fn degenerate_focus_is_seeded_from_viewport() {
        let focus = SharedFocusViewports::new();
        let mut store = Counting::default();
        let mut set = PictureSet::new(1, 2);
        set.install(prepared(built(2)), &mut store).unwrap();
        let inputs = TransformInputs {
            screen_aspect: 0.75,
            normal_offset_x: 0.5,
            focus_amount: 1.0,
            focus_linked: true,
            may_write_focus: true,
        };
        set.recompute_transform(&inputs, &focus);
        let seeded = focus.get(1);
        assert!(!seeded.is_degenerate());
        assert!((seeded.width() - 0.5).abs() < 1e-5);

        focus.set(1, FocusRect::new(0.0, 0.0, 0.5, 0.5));
        set.recompute_transform(&inputs, &focus);
        let vp = set.viewport();
        assert!((vp.left + 1.0).abs() < 1e-5 && vp.right.abs() < 1e-5);
        assert!((vp.top - 1.0).abs() < 1e-5 && vp.bottom.abs() < 1e-5);
    }

    #[test]
    fn projection_skipped_without_screen_aspect() {
        let focus = SharedFocusViewports::new();
        let mut set = PictureSet::new(0, 1);
        let inputs = TransformInputs {
            screen_aspect: 0.0,
            normal_offset_x: 0.5,
            focus_amount: 0.0,
            focus_linked: false,
            may_write_focus: false,
        };
        set.recompute_transform(&inputs, &focus);
        assert_eq!(set.projection(), &IDENTITY);
    }
}
