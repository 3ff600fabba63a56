//! A bitmap uploaded as one texture or a grid of tile textures.

use image::{RgbaImage, imageops};
use tracing::{debug, warn};

use crate::error::Error;
use crate::render::draw::{DrawCommand, DrawList, Mat4};
use crate::render::texture::{TextureId, TextureStore};
use crate::render::tiles::{TileLayout, tile_size_for};

#[derive(Debug)]
pub struct TiledPicture {
    layout: TileLayout,
    textures: Vec<Option<TextureId>>,
}

impl TiledPicture {
    /// Upload `image`, splitting it into tiles when it exceeds the tile size.
    ///
    /// Returns `Ok(None)` for an empty image. A rejected tile upload is an
    /// error in debug builds; release builds log it and leave the tile out.
    ///
    /// # Errors
    /// Returns [`Error::TextureUpload`] in debug builds when any tile fails.
    pub fn upload(image: &RgbaImage, store: &mut dyn TextureStore) -> Result<Option<Self>, Error> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(None);
        }

        let layout = TileLayout::new(width, height, tile_size_for(store.max_texture_dimension()));
        let mut textures = Vec::with_capacity(layout.tile_count());
        for (column, row) in layout.tiles() {
            let uploaded = if layout.is_single() {
                store.upload(image)
            } else {
                let rect = layout.source_rect(column, row);
                let tile = imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height)
                    .to_image();
                store.upload(&tile)
            };
            match uploaded {
                Ok(id) => textures.push(Some(id)),
                Err(err) if cfg!(debug_assertions) => {
                    for id in textures.into_iter().flatten() {
                        store.release(id);
                    }
                    return Err(err);
                }
                Err(err) => {
                    warn!(column, row, error = %err, "tile upload failed; drawing without it");
                    textures.push(None);
                }
            }
        }
        debug!(
            width,
            height,
            columns = layout.columns(),
            rows = layout.rows(),
            "uploaded picture"
        );
        Ok(Some(Self { layout, textures }))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.layout.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.layout.height()
    }

    /// Handles of every uploaded tile.
    pub fn textures(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.textures.iter().flatten().copied()
    }

    /// Record one textured quad per tile, all sharing `mvp` and `alpha`.
    pub fn draw(&self, list: &mut DrawList, mvp: &Mat4, alpha: f32) {
        for (column, row) in self.layout.tiles() {
            let Some(texture) = self.textures[self.layout.index(column, row)] else {
                continue;
            };
            list.push(DrawCommand::Picture {
                texture,
                quad: self.layout.quad(column, row),
                mvp: *mvp,
                alpha,
            });
        }
    }

    pub fn destroy(self, store: &mut dyn TextureStore) {
        for id in self.textures.into_iter().flatten() {
            store.release(id);
        }
    }
}
