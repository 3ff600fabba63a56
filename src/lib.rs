pub mod config;
pub mod error;
pub mod events;
pub mod scan;
pub mod source;
pub mod processing {
    pub mod blur;
    pub mod darkness;
    pub mod math;
    pub mod resize;
}
pub mod render {
    pub mod animator;
    pub mod draw;
    pub mod focus;
    pub mod gpu;
    pub mod loader;
    pub mod overlay;
    pub mod picture_set;
    pub mod pipeline;
    pub mod preferences;
    pub mod prepare;
    pub mod queue;
    pub mod texture;
    pub mod tiled_picture;
    pub mod tiles;
    pub mod viewport;
}
pub mod tasks {
    pub mod feeder;
    pub mod files;
    pub mod viewer;
}
