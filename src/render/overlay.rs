use crate::render::draw::{DrawCommand, DrawList, IDENTITY, Mat4};

/// Full-surface quad in a single color, used to dim whatever is beneath it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidOverlay {
    color: [f32; 4],
}

impl Default for SolidOverlay {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

impl SolidOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    /// Set the color from 8-bit channels.
    pub fn set_color_argb(&mut self, alpha: u8, red: u8, green: u8, blue: u8) {
        self.color = [
            f32::from(red) / 255.0,
            f32::from(green) / 255.0,
            f32::from(blue) / 255.0,
            f32::from(alpha) / 255.0,
        ];
    }

    /// Record the overlay covering the whole surface.
    pub fn draw(&self, list: &mut DrawList) {
        self.draw_with(list, &IDENTITY);
    }

    pub fn draw_with(&self, list: &mut DrawList, mvp: &Mat4) {
        list.push(DrawCommand::Solid {
            mvp: *mvp,
            color: self.color,
        });
    }
}
