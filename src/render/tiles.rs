//! Tile grid geometry for images larger than one texture.
//!
//! Rows are counted from the bottom of the image. Tiles are square; when the
//! height is not a multiple of the tile size, the top row absorbs the
//! remainder so every other row is full height.

use crate::processing::math::divide_round_up;
use crate::render::draw::Quad;

/// Soft cap on tile edge length even when the device allows more.
pub const MAX_TILE_SIZE: u32 = 512;

#[must_use]
pub fn tile_size_for(max_texture_dimension: u32) -> u32 {
    MAX_TILE_SIZE.min(max_texture_dimension).max(1)
}

/// Pixel rectangle in image coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLayout {
    width: u32,
    height: u32,
    tile_size: u32,
    columns: u32,
    rows: u32,
}

impl TileLayout {
    #[must_use]
    pub fn new(width: u32, height: u32, tile_size: u32) -> Self {
        let tile_size = tile_size.max(1);
        let columns = divide_round_up(width as i32, tile_size as i32).max(0) as u32;
        let rows = divide_round_up(height as i32, tile_size as i32).max(0) as u32;
        Self {
            width,
            height,
            tile_size,
            columns,
            rows,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    #[must_use]
    pub fn columns(&self) -> u32 {
        self.columns
    }

    #[must_use]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    #[must_use]
    pub fn is_single(&self) -> bool {
        self.columns == 1 && self.rows == 1
    }

    #[must_use]
    pub fn tile_count(&self) -> usize {
        (self.columns * self.rows) as usize
    }

    /// Flat index of tile (`column`, `row`), row-major from the bottom row.
    #[must_use]
    pub fn index(&self, column: u32, row: u32) -> usize {
        (row * self.columns + column) as usize
    }

    /// Iterate `(column, row)` in draw order.
    pub fn tiles(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.columns).map(move |column| (column, row)))
    }

    /// Source pixels covered by tile (`column`, `row`).
    #[must_use]
    pub fn source_rect(&self, column: u32, row: u32) -> TileRect {
        if self.is_single() {
            return TileRect {
                x: 0,
                y: 0,
                width: self.width,
                height: self.height,
            };
        }
        let t = self.tile_size as i64;
        let leftover = (self.height % self.tile_size) as i64;
        let shift = if leftover > 0 { leftover - t } else { 0 };

        let left = column as i64 * t;
        let right = left + t;
        let top = (self.rows as i64 - row as i64 - 1) * t + shift;
        let bottom = top + t;

        let left = left.clamp(0, self.width as i64);
        let right = right.clamp(0, self.width as i64);
        let top = top.clamp(0, self.height as i64);
        let bottom = bottom.clamp(0, self.height as i64);
        TileRect {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        }
    }

    /// Model-space quad for tile (`column`, `row`); the whole image spans
    /// `[-1, 1]` on both axes.
    #[must_use]
    pub fn quad(&self, column: u32, row: u32) -> Quad {
        let t = self.tile_size as f32;
        let w = self.width.max(1) as f32;
        let h = self.height.max(1) as f32;
        let edge = |start: u32, extent: f32| (-1.0 + 2.0 * start as f32 * t / extent).min(1.0);
        Quad {
            left: edge(column, w),
            right: edge(column + 1, w),
            bottom: edge(row, h),
            top: edge(row + 1, h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_image_is_a_single_tile() {
        let layout = TileLayout::new(300, 200, 512);
        assert!(layout.is_single());
        assert_eq!(
            layout.source_rect(0, 0),
            TileRect {
                x: 0,
                y: 0,
                width: 300,
                height: 200
            }
        );
        assert_eq!(layout.quad(0, 0), Quad::FULL);
    }

    #[test]
    fn remainder_goes_to_top_row() {
        let layout = TileLayout::new(1200, 1000, 512);
        assert_eq!((layout.columns(), layout.rows()), (3, 2));
        let bottom = layout.source_rect(0, 0);
        assert_eq!((bottom.y, bottom.height), (488, 512));
        let top = layout.source_rect(0, 1);
        assert_eq!((top.y, top.height), (0, 488));
        let right = layout.source_rect(2, 0);
        assert_eq!((right.x, right.width), (1024, 176));
    }

    #[test]
    fn quads_clamp_to_the_image_edge() {
        let layout = TileLayout::new(1200, 1000, 512);
        let q = layout.quad(2, 1);
        assert_eq!(q.right, 1.0);
        assert_eq!(q.top, 1.0);
        let q0 = layout.quad(0, 0);
        assert_eq!(q0.left, -1.0);
        assert_eq!(q0.bottom, -1.0);
        assert!((q0.top - (-1.0 + 2.0 * 512.0 / 1000.0)).abs() < 1e-6);
    }
}
