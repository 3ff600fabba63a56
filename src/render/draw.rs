//! Backend-neutral draw recording.
//!
//! Pictures and overlays append [`DrawCommand`]s to a [`DrawList`]; the GPU
//! backend replays the list in order with alpha blending. Tests inspect the
//! list directly.

use crate::render::texture::TextureId;

/// Column-major 4x4 matrix, matching WGSL `mat4x4<f32>` layout.
pub type Mat4 = [[f32; 4]; 4];

pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Orthographic projection mapping the given view box to clip space with a
/// `[0, 1]` depth range.
#[must_use]
pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let rw = 1.0 / (right - left);
    let rh = 1.0 / (top - bottom);
    let rd = 1.0 / (far - near);
    [
        [2.0 * rw, 0.0, 0.0, 0.0],
        [0.0, 2.0 * rh, 0.0, 0.0],
        [0.0, 0.0, -rd, 0.0],
        [-(right + left) * rw, -(top + bottom) * rh, -near * rd, 1.0],
    ]
}

/// Camera at `z = 1` looking down the negative z axis with +y up.
#[must_use]
pub fn camera_view() -> Mat4 {
    let mut view = IDENTITY;
    view[3][2] = -1.0;
    view
}

#[must_use]
pub fn multiply(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0; 4]; 4];
    for (col, out_col) in out.iter_mut().enumerate() {
        for (row, cell) in out_col.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[k][row] * b[col][k]).sum();
        }
    }
    out
}

/// Transform a point and apply the perspective divide.
#[must_use]
pub fn transform_point(m: &Mat4, x: f32, y: f32, z: f32) -> [f32; 3] {
    let v = [x, y, z, 1.0];
    let mut out = [0.0; 4];
    for (row, cell) in out.iter_mut().enumerate() {
        *cell = (0..4).map(|k| m[k][row] * v[k]).sum();
    }
    let w = if out[3] == 0.0 { 1.0 } else { out[3] };
    [out[0] / w, out[1] / w, out[2] / w]
}

/// Axis-aligned rectangle in model space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Quad {
    pub const FULL: Self = Self {
        left: -1.0,
        top: 1.0,
        right: 1.0,
        bottom: -1.0,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// A textured quad; `alpha` replaces the sampled texel alpha.
    Picture {
        texture: TextureId,
        quad: Quad,
        mvp: Mat4,
        alpha: f32,
    },
    /// A full-model-space quad in a single straight-alpha RGBA color.
    Solid { mvp: Mat4, color: [f32; 4] },
}

#[derive(Debug, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Textures referenced by picture commands, in draw order.
    pub fn textures(&self) -> impl Iterator<Item = (TextureId, f32)> + '_ {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Picture { texture, alpha, .. } => Some((*texture, *alpha)),
            DrawCommand::Solid { .. } => None,
        })
    }
}
