//! The picture pipeline: two picture sets, the crossfade between them, the
//! blur animation and the dimming overlay.
//!
//! Everything here runs on the render thread. Decoding happens on the
//! [`LoadWorker`]; its result is picked up at the start of the next frame.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{BlurBackend, Configuration};
use crate::error::Error;
use crate::events::{ArtworkSize, RendererStatus, StatusSink, SwitchingPhotos};
use crate::processing::math::{constrain, interpolate};
use crate::render::animator::TickingAnimator;
use crate::render::draw::{DrawList, Mat4, camera_view};
use crate::render::focus::{FocusRect, FocusViewportStore};
use crate::render::loader::{LoadJob, LoadWorker};
use crate::render::overlay::SolidOverlay;
use crate::render::picture_set::{PictureSet, TransformInputs};
use crate::render::preferences::PreferenceSource;
use crate::render::prepare::{
    DEMO_BLUR_AMOUNT, DEMO_GREY_AMOUNT, LoadParams, MAX_BLUR_AMOUNT, MAX_GREY_AMOUNT, blur_budget,
};
use crate::render::texture::TextureStore;
use crate::source::ImageSource;

pub const CROSSFADE_DURATION: Duration = Duration::from_millis(750);
pub const BLUR_DURATION: Duration = Duration::from_millis(750);
/// Demo mode slows the blur animation down by this factor.
pub const DEMO_BLUR_SLOWDOWN: u32 = 5;

/// Asks the host to schedule another frame.
pub trait RenderCallbacks: Send + Sync {
    fn request_render(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineOptions {
    pub low_ram: bool,
    pub demo_mode: bool,
    /// Running as a settings preview: no status events, no focus writes.
    pub preview: bool,
    pub start_blurred: bool,
    pub blur_backend: BlurBackend,
}

impl PipelineOptions {
    #[must_use]
    pub fn from_config(cfg: &Configuration) -> Self {
        Self {
            low_ram: cfg.low_ram,
            demo_mode: cfg.demo_mode,
            preview: false,
            start_blurred: cfg.start_blurred,
            blur_backend: cfg.blur_backend,
        }
    }

    #[must_use]
    pub fn keyframe_count(&self) -> usize {
        if self.low_ram { 1 } else { 2 }
    }
}

/// Collaborators the pipeline reports to and reads from.
#[derive(Clone)]
pub struct PipelineContext {
    pub preferences: Arc<dyn PreferenceSource>,
    pub focus: Arc<dyn FocusViewportStore>,
    pub status: Arc<dyn StatusSink>,
    pub callbacks: Arc<dyn RenderCallbacks>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing shown and nothing loading.
    Idle,
    /// A picture is being prepared for the next slot.
    Loading,
    /// One picture on screen.
    Steady,
    /// Fading from the current picture to the next.
    Crossfading,
}

#[derive(Debug)]
struct CrossfadeEnd;

#[derive(Debug)]
struct BlurEnd {
    release_memory: bool,
}

pub struct PicturePipeline {
    options: PipelineOptions,
    ctx: PipelineContext,
    loader: LoadWorker,
    keyframe_count: usize,

    max_prescaled_blur_pixels: u32,
    blurred_sample_size: u32,
    max_dim: u32,
    max_grey: u32,

    view: Mat4,
    surface_height: u32,
    aspect_ratio: f32,
    surface_created: bool,
    overlay: Option<SolidOverlay>,

    current: PictureSet,
    next: PictureSet,
    current_source: Option<Arc<dyn ImageSource>>,
    next_source: Option<Arc<dyn ImageSource>>,
    queued: Option<Arc<dyn ImageSource>>,
    generation: u64,
    pending_generation: Option<u64>,

    normal_offset_x: f32,
    blurred: bool,
    focus_linked: bool,
    blur: TickingAnimator<BlurEnd>,
    crossfade: TickingAnimator<CrossfadeEnd>,
}

impl PicturePipeline {
    #[must_use]
    pub fn new(options: PipelineOptions, ctx: PipelineContext, loader: LoadWorker) -> Self {
        let n = options.keyframe_count();
        let blur_duration = if options.demo_mode {
            BLUR_DURATION * DEMO_BLUR_SLOWDOWN
        } else {
            BLUR_DURATION
        };
        let initial_blur = if options.start_blurred { n as f32 } else { 0.0 };
        let mut pipeline = Self {
            options,
            ctx,
            loader,
            keyframe_count: n,
            max_prescaled_blur_pixels: 0,
            blurred_sample_size: 4,
            max_dim: 0,
            max_grey: 0,
            view: camera_view(),
            surface_height: 0,
            aspect_ratio: 0.0,
            surface_created: false,
            overlay: None,
            current: PictureSet::new(0, n),
            next: PictureSet::new(1, n),
            current_source: None,
            next_source: None,
            queued: None,
            generation: 0,
            pending_generation: None,
            normal_offset_x: 0.5,
            blurred: options.start_blurred,
            focus_linked: false,
            blur: TickingAnimator::new(blur_duration, initial_blur),
            crossfade: TickingAnimator::new(CROSSFADE_DURATION, 0.0),
        };
        pipeline.recompute_max_prescaled_blur_pixels();
        pipeline.recompute_max_dim();
        pipeline.recompute_grey();
        pipeline
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        if self.crossfade.is_running() {
            PipelineState::Crossfading
        } else if self.pending_generation.is_some() {
            PipelineState::Loading
        } else if self.current.has_image() {
            PipelineState::Steady
        } else {
            PipelineState::Idle
        }
    }

    #[must_use]
    pub fn current(&self) -> &PictureSet {
        &self.current
    }

    #[must_use]
    pub fn next(&self) -> &PictureSet {
        &self.next
    }

    #[must_use]
    pub fn keyframe_count(&self) -> usize {
        self.keyframe_count
    }

    #[must_use]
    pub fn blur_value(&self) -> f32 {
        self.blur.current_value()
    }

    #[must_use]
    pub fn crossfade_value(&self) -> f32 {
        self.crossfade.current_value()
    }

    #[must_use]
    pub fn is_blurred(&self) -> bool {
        self.blurred
    }

    #[must_use]
    pub fn is_focus_linked(&self) -> bool {
        self.focus_linked
    }

    #[must_use]
    pub fn normal_offset_x(&self) -> f32 {
        self.normal_offset_x
    }

    #[must_use]
    pub fn max_prescaled_blur_pixels(&self) -> u32 {
        self.max_prescaled_blur_pixels
    }

    #[must_use]
    pub fn blurred_sample_size(&self) -> u32 {
        self.blurred_sample_size
    }

    #[must_use]
    pub fn max_dim(&self) -> u32 {
        self.max_dim
    }

    #[must_use]
    pub fn max_grey(&self) -> u32 {
        self.max_grey
    }

    #[must_use]
    pub fn overlay_color(&self) -> Option<[f32; 4]> {
        self.overlay.as_ref().map(SolidOverlay::color)
    }

    #[must_use]
    pub fn is_surface_created(&self) -> bool {
        self.surface_created
    }

    fn publishes_status(&self) -> bool {
        !self.options.demo_mode && !self.options.preview
    }

    fn publish(&self, status: RendererStatus) {
        if self.publishes_status() {
            self.ctx.status.publish(status);
        }
    }

    fn reset_focus_viewports(&self) {
        if self.publishes_status() {
            self.ctx.focus.reset(0);
            self.ctx.focus.reset(1);
        }
    }

    fn load_params(&self) -> LoadParams {
        LoadParams {
            keyframe_count: self.keyframe_count,
            surface_height: self.surface_height,
            max_prescaled_blur_pixels: self.max_prescaled_blur_pixels,
            blurred_sample_size: self.blurred_sample_size,
            max_dim: self.max_dim,
            max_grey: self.max_grey,
            demo_mode: self.options.demo_mode,
            blur_backend: self.options.blur_backend,
        }
    }

    /// The GPU context exists; programs are ready.
    ///
    /// Queued artwork starts loading here only when the surface size is
    /// already known, otherwise on the first [`Self::on_surface_changed`].
    pub fn on_surface_created(&mut self) {
        info!("render surface created");
        self.view = camera_view();
        self.overlay = Some(SolidOverlay::new());
        self.surface_created = true;
        if self.surface_height > 0 {
            self.start_queued();
        }
    }

    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        info!(width, height, "render surface changed");
        self.surface_height = height;
        self.aspect_ratio = if height > 0 {
            width as f32 / height as f32
        } else {
            0.0
        };
        self.reset_focus_viewports();
        self.recompute_transforms();
        self.recompute_max_prescaled_blur_pixels();
        if self.surface_created && !self.crossfade.is_running() {
            self.start_queued();
        }
    }

    fn start_queued(&mut self) {
        if let Some(source) = self.queued.take() {
            self.set_image(source);
        }
    }

    /// The GPU context is going away; release every texture.
    ///
    /// The artwork on screen is queued again so it reappears when a new
    /// surface is created.
    pub fn on_surface_destroyed(&mut self, store: &mut dyn TextureStore) {
        info!("render surface destroyed");
        self.current.destroy_pictures(store);
        self.next.destroy_pictures(store);
        self.overlay = None;
        self.surface_created = false;
        if self.queued.is_none() {
            self.queued = self.next_source.clone().or_else(|| self.current_source.clone());
        }
        self.pending_generation = None;
    }

    /// Show `source` next.
    ///
    /// While the surface is missing or a crossfade runs, the request is held
    /// back; a later request replaces an earlier held one.
    pub fn set_image(&mut self, source: Arc<dyn ImageSource>) {
        if !self.surface_created || self.crossfade.is_running() {
            debug!("holding artwork until the pipeline is ready");
            self.queued = Some(source);
            return;
        }

        let (width, height) = source.size();
        if width == 0 || height == 0 {
            warn!("ignoring artwork without pixels");
            return;
        }

        let next_id = self.next.id();
        self.publish(RendererStatus::SwitchingPhotos(SwitchingPhotos::InProgress(next_id)));
        self.publish(RendererStatus::ArtworkSize(ArtworkSize { width, height }));
        self.set_default_viewport(next_id, width as f32 / height as f32);

        self.generation += 1;
        self.pending_generation = Some(self.generation);
        self.next_source = Some(Arc::clone(&source));
        debug!(generation = self.generation, width, height, "requesting picture load");
        let params = self.load_params();
        self.loader.submit(self.generation, LoadJob { source, params });
    }

    /// Seed the focus viewport of set `id` with the centred region an image
    /// of `image_aspect` shows when it fills the screen.
    pub fn set_default_viewport(&self, id: usize, image_aspect: f32) {
        if self.publishes_status() {
            self.ctx
                .focus
                .set(id, FocusRect::default_for(image_aspect, self.aspect_ratio));
        }
    }

    /// Rebuild the artwork on screen, e.g. after a parameter change.
    pub fn reload_current_artwork(&mut self) {
        self.recompute_max_prescaled_blur_pixels();
        self.recompute_max_dim();
        self.recompute_grey();
        // The artwork being faded to counts as the one on screen.
        let source = if self.crossfade.is_running() || self.pending_generation.is_some() {
            self.next_source.clone()
        } else {
            self.current_source.clone()
        };
        if let Some(source) = source {
            self.set_image(source);
        }
    }

    /// Animate toward blurred or sharp.
    ///
    /// With `focus_linked`, unblurring also zooms toward each picture's
    /// focus viewport.
    pub fn set_blurred(&mut self, blurred: bool, focus_linked: bool, now: Instant) {
        if focus_linked && !blurred {
            self.reset_focus_viewports();
        }
        self.focus_linked = focus_linked;
        self.blurred = blurred;
        let target = if blurred { self.keyframe_count as f32 } else { 0.0 };
        self.blur.start_from_current(
            target,
            BlurEnd {
                release_memory: blurred && focus_linked,
            },
            now,
        );
        self.ctx.callbacks.request_render();
    }

    /// Pan position across a wide picture, `0` (left) to `1` (right).
    pub fn set_normal_offset_x(&mut self, offset: f32) {
        self.normal_offset_x = constrain(offset, 0.0, 1.0);
        self.recompute_transforms();
        if self.surface_created {
            self.ctx.callbacks.request_render();
        }
    }

    pub fn recompute_max_prescaled_blur_pixels(&mut self) {
        let blur_amount = if self.options.demo_mode {
            DEMO_BLUR_AMOUNT
        } else {
            self.ctx.preferences.parameters().blur_amount.min(MAX_BLUR_AMOUNT)
        };
        let (max_px, sample_size) = blur_budget(self.surface_height, blur_amount);
        self.max_prescaled_blur_pixels = max_px;
        self.blurred_sample_size = sample_size;
    }

    pub fn recompute_max_dim(&mut self) {
        self.max_dim = self.ctx.preferences.parameters().dim_amount;
    }

    pub fn recompute_grey(&mut self) {
        self.max_grey = if self.options.demo_mode {
            DEMO_GREY_AMOUNT
        } else {
            self.ctx.preferences.parameters().grey_amount.min(MAX_GREY_AMOUNT)
        };
    }

    fn transform_inputs(&self) -> TransformInputs {
        let n = self.keyframe_count as f32;
        TransformInputs {
            screen_aspect: self.aspect_ratio,
            normal_offset_x: self.normal_offset_x,
            focus_amount: (n - self.blur.current_value()) / n,
            focus_linked: self.focus_linked,
            may_write_focus: self.publishes_status(),
        }
    }

    fn recompute_transforms(&mut self) {
        let inputs = self.transform_inputs();
        self.current.recompute_transform(&inputs, self.ctx.focus.as_ref());
        self.next.recompute_transform(&inputs, self.ctx.focus.as_ref());
    }

    /// Upload a finished load into the next slot and start the crossfade.
    fn install_ready_picture(&mut self, store: &mut dyn TextureStore, now: Instant) -> Result<(), Error> {
        let Some(generation) = self.pending_generation else {
            return Ok(());
        };
        if !self.surface_created {
            return Ok(());
        }
        let Some(prepared) = self.loader.results().take_current(generation) else {
            return Ok(());
        };
        self.pending_generation = None;
        self.next.install(prepared, store)?;
        let inputs = self.transform_inputs();
        self.next.recompute_transform(&inputs, self.ctx.focus.as_ref());
        self.crossfade.start(0.0, 1.0, CrossfadeEnd, now);
        debug!(generation, "crossfade started");
        self.ctx.callbacks.request_render();
        Ok(())
    }

    fn finish_crossfade(&mut self, store: &mut dyn TextureStore) {
        std::mem::swap(&mut self.current, &mut self.next);
        self.current_source = self.next_source.take();
        self.ctx.callbacks.request_render();
        self.next.reset(store);
        self.publish(RendererStatus::SwitchingPhotos(SwitchingPhotos::Done(
            self.current.id(),
        )));
        store.trim();
        debug!(current = self.current.id(), "crossfade finished");
        self.start_queued();
    }

    /// Advance animations to `now` and record this frame into `list`.
    ///
    /// Returns whether an animation is still running.
    ///
    /// # Errors
    /// Propagates texture upload failures from installing a loaded picture
    /// (debug builds only).
    pub fn on_draw_frame(
        &mut self,
        store: &mut dyn TextureStore,
        list: &mut DrawList,
        now: Instant,
    ) -> Result<bool, Error> {
        self.install_ready_picture(store, now)?;

        let animating = self.crossfade.tick(now) | self.blur.tick(now);
        if self.crossfade.take_ended().is_some() {
            self.finish_crossfade(store);
        }
        if let Some(end) = self.blur.take_ended()
            && end.release_memory
        {
            store.trim();
        }
        if self.focus_linked {
            self.recompute_transforms();
        }

        let blur_frame = self.blur.current_value();
        let mut dim = self.current.dim_amount() as f32;
        self.current.draw_frame(list, &self.view, 1.0, blur_frame);
        if self.crossfade.is_running() {
            let progress = self.crossfade.current_value();
            dim = interpolate(dim, self.next.dim_amount() as f32, progress);
            self.next.draw_frame(list, &self.view, progress, blur_frame);
        }

        if let Some(overlay) = self.overlay.as_mut() {
            let alpha = (dim * blur_frame / self.keyframe_count as f32) as i32;
            overlay.set_color_argb(alpha.clamp(0, 255) as u8, 0, 0, 0);
            overlay.draw(list);
        }

        if animating {
            self.ctx.callbacks.request_render();
        }
        Ok(animating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullStatusSink;
    use crate::render::focus::SharedFocusViewports;
    use crate::render::preferences::{SharedPreferences, UserParameters};
    use crate::render::texture::TextureId;
    use crate::source::MemoryImageSource;
    use image::{Rgba, RgbaImage};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Renders(AtomicUsize);

    impl RenderCallbacks for Renders {
        fn request_render(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Recorded(Mutex<Vec<RendererStatus>>);

    impl StatusSink for Recorded {
        fn publish(&self, status: RendererStatus) {
            self.0.lock().unwrap().push(status);
        }
    }

    #[derive(Default)]
    struct Store {
        next: u32,
        live: usize,
        trims: usize,
    }

    impl TextureStore for Store {
        fn max_texture_dimension(&self) -> u32 {
            4096
        }
        fn upload(&mut self, _image: &RgbaImage) -> Result<TextureId, Error> {
            self.next += 1;
            self.live += 1;
            Ok(TextureId(self.next))
        }
        fn release(&mut self, _id: TextureId) {
            self.live -= 1;
        }
        fn trim(&mut self) {
            self.trims += 1;
        }
    }

    fn image(width: u32, height: u32) -> Arc<dyn ImageSource> {
        Arc::new(MemoryImageSource::new(RgbaImage::from_pixel(
            width,
            height,
            Rgba([90, 90, 90, 255]),
        )))
    }

    fn pipeline(options: PipelineOptions, status: Arc<dyn StatusSink>) -> (PicturePipeline, Arc<Renders>) {
        let renders = Arc::new(Renders::default());
        let ctx = PipelineContext {
            preferences: Arc::new(SharedPreferences::new(UserParameters::default())),
            focus: Arc::new(SharedFocusViewports::new()),
            status,
            callbacks: renders.clone(),
        };
        let mut p = PicturePipeline::new(options, ctx, LoadWorker::inline(None));
        p.on_surface_created();
        p.on_surface_changed(400, 200);
        (p, renders)
    }

    #[test]
    fn requests_before_surface_wait_for_its_size() {
        let renders = Arc::new(Renders::default());
        let ctx = PipelineContext {
            preferences: Arc::new(SharedPreferences::default()),
            focus: Arc::new(SharedFocusViewports::new()),
            status: Arc::new(NullStatusSink),
            callbacks: renders,
        };
        let mut p = PicturePipeline::new(PipelineOptions::default(), ctx, LoadWorker::inline(None));
        p.set_image(image(10, 10));
        assert_eq!(p.state(), PipelineState::Idle);
        p.on_surface_created();
        assert_eq!(p.state(), PipelineState::Idle);
        p.on_surface_changed(400, 200);
        assert_eq!(p.state(), PipelineState::Loading);
    }

    #[test]
    fn held_request_loads_with_surface_size_and_default_focus() {
        let focus = Arc::new(SharedFocusViewports::new());
        let ctx = PipelineContext {
            preferences: Arc::new(SharedPreferences::default()),
            focus: focus.clone(),
            status: Arc::new(NullStatusSink),
            callbacks: Arc::new(Renders::default()),
        };
        let mut p = PicturePipeline::new(PipelineOptions::default(), ctx, LoadWorker::inline(None));
        p.set_image(image(400, 100));
        p.on_surface_created();
        p.on_surface_changed(400, 200);

        // Image twice as wide as the screen: the centred half is in focus.
        let rect = focus.get(1);
        assert!((rect.left - 0.25).abs() < 1e-6, "{rect:?}");
        assert!((rect.right - 0.75).abs() < 1e-6, "{rect:?}");

        let mut store = Store::default();
        let mut list = DrawList::new();
        p.on_draw_frame(&mut store, &mut list, Instant::now()).unwrap();
        let sharp = p.next().keyframe(0).unwrap();
        assert_eq!(sharp.height(), 100);
    }

    #[test]
    fn crossfade_swaps_sets_and_publishes_done() {
        let status = Arc::new(Recorded::default());
        let (mut p, _) = pipeline(PipelineOptions::default(), status.clone());
        let mut store = Store::default();
        let mut list = DrawList::new();
        let t0 = Instant::now();

        p.set_image(image(40, 20));
        assert_eq!(p.next().id(), 1);
        assert!(p.on_draw_frame(&mut store, &mut list, t0).unwrap());
        assert_eq!(p.state(), PipelineState::Crossfading);

        list.clear();
        assert!(!p.on_draw_frame(&mut store, &mut list, t0 + CROSSFADE_DURATION).unwrap());
        assert_eq!(p.state(), PipelineState::Steady);
        assert_eq!(p.current().id(), 1);
        assert_eq!(p.next().id(), 0);
        assert!(p.current().has_image());
        assert!(!p.next().has_image());
        assert_eq!(store.trims, 1);

        let seen = status.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                RendererStatus::SwitchingPhotos(SwitchingPhotos::InProgress(1)),
                RendererStatus::ArtworkSize(ArtworkSize { width: 40, height: 20 }),
                RendererStatus::SwitchingPhotos(SwitchingPhotos::Done(1)),
            ]
        );
    }

    #[test]
    fn request_during_crossfade_runs_after_it() {
        let (mut p, _) = pipeline(PipelineOptions::default(), Arc::new(NullStatusSink));
        let mut store = Store::default();
        let mut list = DrawList::new();
        let t0 = Instant::now();

        p.set_image(image(40, 20));
        p.on_draw_frame(&mut store, &mut list, t0).unwrap();
        p.set_image(image(20, 40));
        assert_eq!(p.state(), PipelineState::Crossfading);

        p.on_draw_frame(&mut store, &mut list, t0 + CROSSFADE_DURATION).unwrap();
        assert_eq!(p.state(), PipelineState::Loading);
        p.on_draw_frame(&mut store, &mut list, t0 + CROSSFADE_DURATION).unwrap();
        assert_eq!(p.state(), PipelineState::Crossfading);
        assert!((p.next().aspect_ratio() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn demo_mode_publishes_nothing() {
        let status = Arc::new(Recorded::default());
        let options = PipelineOptions {
            demo_mode: true,
            ..PipelineOptions::default()
        };
        let (mut p, _) = pipeline(options, status.clone());
        let mut store = Store::default();
        let mut list = DrawList::new();
        let t0 = Instant::now();
        p.set_image(image(40, 20));
        p.on_draw_frame(&mut store, &mut list, t0).unwrap();
        p.on_draw_frame(&mut store, &mut list, t0 + CROSSFADE_DURATION).unwrap();
        assert!(status.0.lock().unwrap().is_empty());
        assert_eq!(p.current().dim_amount(), crate::render::prepare::DEMO_DIM);
    }

    #[test]
    fn overlay_alpha_follows_blur_and_dim() {
        let options = PipelineOptions {
            start_blurred: true,
            ..PipelineOptions::default()
        };
        let (mut p, _) = pipeline(options, Arc::new(NullStatusSink));
        let mut store = Store::default();
        let mut list = DrawList::new();
        let t0 = Instant::now();
        p.on_draw_frame(&mut store, &mut list, t0).unwrap();
        // Empty current set: default dim 128 at full blur.
        let alpha = p.overlay_color().unwrap()[3];
        assert!((alpha - 128.0 / 255.0).abs() < 1e-6);

        p.set_blurred(false, false, t0);
        list.clear();
        p.on_draw_frame(&mut store, &mut list, t0 + BLUR_DURATION).unwrap();
        assert_eq!(p.blur_value(), 0.0);
        assert_eq!(p.overlay_color().unwrap()[3], 0.0);
    }

    #[test]
    fn pan_is_constrained_and_requests_render() {
        let (mut p, renders) = pipeline(PipelineOptions::default(), Arc::new(NullStatusSink));
        let before = renders.0.load(Ordering::SeqCst);
        p.set_normal_offset_x(3.0);
        assert_eq!(p.normal_offset_x(), 1.0);
        p.set_normal_offset_x(-1.0);
        assert_eq!(p.normal_offset_x(), 0.0);
        assert_eq!(renders.0.load(Ordering::SeqCst), before + 2);
    }

    #[test]
    fn surface_height_sets_blur_budget() {
        let (mut p, _) = pipeline(PipelineOptions::default(), Arc::new(NullStatusSink));
        p.on_surface_changed(2000, 1000);
        assert_eq!(p.max_prescaled_blur_pixels(), 6);
        assert_eq!(p.blurred_sample_size(), 4);
    }

    #[test]
    fn destroyed_surface_releases_and_requeues() {
        let (mut p, _) = pipeline(PipelineOptions::default(), Arc::new(NullStatusSink));
        let mut store = Store::default();
        let mut list = DrawList::new();
        let t0 = Instant::now();
        p.set_image(image(40, 20));
        p.on_draw_frame(&mut store, &mut list, t0).unwrap();
        p.on_draw_frame(&mut store, &mut list, t0 + CROSSFADE_DURATION).unwrap();
        assert!(store.live > 0);

        p.on_surface_destroyed(&mut store);
        assert_eq!(store.live, 0);
        p.on_surface_created();
        assert_eq!(p.state(), PipelineState::Loading);
    }
}
