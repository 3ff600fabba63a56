use image::RgbaImage;

use crate::error::Error;

/// Opaque handle to an uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Owner of GPU texture memory.
///
/// All calls happen on the render thread.
pub trait TextureStore {
    /// Largest texture edge the device accepts.
    fn max_texture_dimension(&self) -> u32;

    /// Upload an RGBA image as a new texture.
    ///
    /// # Errors
    /// Returns [`Error::TextureUpload`] when the device rejects the texture.
    fn upload(&mut self, image: &RgbaImage) -> Result<TextureId, Error>;

    fn release(&mut self, id: TextureId);

    /// Hint that a burst of releases just finished and memory can be reclaimed.
    fn trim(&mut self) {}
}
