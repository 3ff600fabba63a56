use rust_blur_wallpaper::render::tiles::{TileLayout, tile_size_for};

fn assert_exact_cover(width: u32, height: u32, tile: u32) {
    let layout = TileLayout::new(width, height, tile);
    assert_eq!(layout.columns(), width.div_ceil(tile), "{width}x{height}/{tile}");
    assert_eq!(layout.rows(), height.div_ceil(tile), "{width}x{height}/{tile}");

    let mut hits = vec![0u8; (width * height) as usize];
    for (column, row) in layout.tiles() {
        let rect = layout.source_rect(column, row);
        assert!(rect.width > 0 && rect.height > 0);
        assert!(rect.x + rect.width <= width);
        assert!(rect.y + rect.height <= height);
        if row == 0 {
            assert_eq!(rect.height, tile.min(height), "bottom row must be full height");
            assert_eq!(rect.y + rect.height, height);
        }
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                hits[(y * width + x) as usize] += 1;
            }
        }
    }
    assert!(
        hits.iter().all(|&h| h == 1),
        "{width}x{height}/{tile} is not an exact cover"
    );
}

#[test]
fn tiles_cover_images_exactly_once() {
    for (w, h, t) in [
        (1, 1, 512),
        (512, 512, 512),
        (513, 512, 512),
        (512, 513, 512),
        (1200, 1000, 512),
        (37, 91, 16),
        (100, 3, 7),
        (64, 64, 8),
    ] {
        assert_exact_cover(w, h, t);
    }
}

#[test]
fn quads_tile_model_space() {
    let layout = TileLayout::new(1200, 1000, 512);
    let first = layout.quad(0, 0);
    assert!((first.left + 1.0).abs() < 1e-6);
    assert!((first.bottom + 1.0).abs() < 1e-6);

    let last = layout.quad(layout.columns() - 1, layout.rows() - 1);
    assert!((last.right - 1.0).abs() < 1e-6);
    assert!((last.top - 1.0).abs() < 1e-6);

    // Neighbouring quads share edges.
    let right = layout.quad(1, 0);
    assert!((first.right - right.left).abs() < 1e-6);
    let above = layout.quad(0, 1);
    assert!((first.top - above.bottom).abs() < 1e-6);
}

#[test]
fn tile_size_respects_device_limit() {
    assert_eq!(tile_size_for(8192), 512);
    assert_eq!(tile_size_for(256), 256);
    assert_eq!(tile_size_for(0), 1);
}
