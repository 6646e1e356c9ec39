//! Drawing surface primitives

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Packed `0xRRGGBBAA` color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color(0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | a as u32)
    }

    pub fn channels(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    pub fn with_alpha(self, alpha: u8) -> Self {
        Color((self.0 & 0xffff_ff00) | alpha as u32)
    }

    /// Linear `[r, g, b, a]` in 0..=1 for vertex colors
    pub fn to_f32(self) -> [f32; 4] {
        self.channels().map(|c| c as f32 / 255.0)
    }

    /// CSS `rgba()` string for canvas fill/stroke styles
    pub fn to_css(self) -> String {
        let [r, g, b, a] = self.channels();
        format!("rgba({r},{g},{b},{:.3})", a as f32 / 255.0)
    }
}

/// Default palette per entity kind
pub mod colors {
    use super::Color;

    pub const BACKGROUND: Color = Color::rgb(5, 5, 13);
    pub const SHIP: Color = Color::rgb(51, 204, 102);
    pub const PROJECTILE: Color = Color::rgb(255, 255, 255);
    pub const OBSTACLE: Color = Color::rgb(179, 179, 204);
    pub const PARTICLE: Color = Color::rgb(255, 102, 51);
    pub const POWER_UP: Color = Color::rgb(230, 217, 77);
    pub const ENEMY: Color = Color::rgb(102, 179, 255);
}

/// Host drawing context
///
/// Rectangles are given by their top-left corner and size, as canvas APIs take them.
pub trait Surface {
    fn clear(&mut self, color: Color);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);
    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Color);
    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Color);
    fn stroke_rect(&mut self, origin: Vec2, size: Vec2, width: f32, color: Color);
    /// Finish the frame
    fn present(&mut self);
}

/// One recorded primitive
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    FillCircle { center: Vec2, radius: f32, color: Color },
    StrokeCircle { center: Vec2, radius: f32, width: f32, color: Color },
    FillRect { origin: Vec2, size: Vec2, color: Color },
    StrokeRect { origin: Vec2, size: Vec2, width: f32, color: Color },
}

/// Surface that records commands instead of drawing
///
/// Only the frame in progress and the last presented frame are kept.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pending: Vec<DrawCommand>,
    presented: Vec<DrawCommand>,
    frames: u64,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands of the last presented frame
    pub fn frame(&self) -> &[DrawCommand] {
        &self.presented
    }

    /// Commands issued since the last present
    pub fn pending(&self) -> &[DrawCommand] {
        &self.pending
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self, color: Color) {
        self.pending.clear();
        self.pending.push(DrawCommand::Clear(color));
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.pending.push(DrawCommand::FillCircle { center, radius, color });
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Color) {
        self.pending.push(DrawCommand::StrokeCircle {
            center,
            radius,
            width,
            color,
        });
    }

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Color) {
        self.pending.push(DrawCommand::FillRect { origin, size, color });
    }

    fn stroke_rect(&mut self, origin: Vec2, size: Vec2, width: f32, color: Color) {
        self.pending.push(DrawCommand::StrokeRect {
            origin,
            size,
            width,
            color,
        });
    }

    fn present(&mut self) {
        self.presented = std::mem::take(&mut self.pending);
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_packing() {
        let c = Color::rgba(255, 128, 0, 51);
        assert_eq!(c.0, 0xff80_0033);
        assert_eq!(c.channels(), [255, 128, 0, 51]);
        assert_eq!(c.with_alpha(255), Color::rgb(255, 128, 0));
        assert_eq!(Color::WHITE.to_f32(), [1.0; 4]);
        assert_eq!(Color::rgb(1, 2, 3).to_css(), "rgba(1,2,3,1.000)");
    }

    #[test]
    fn test_recording_keeps_one_frame() {
        let mut surface = RecordingSurface::new();
        surface.clear(Color::BLACK);
        surface.fill_circle(Vec2::ZERO, 1.0, Color::WHITE);
        surface.present();
        assert_eq!(surface.frame().len(), 2);
        assert!(surface.pending().is_empty());

        // A frame abandoned before present never leaks into the next one
        surface.fill_rect(Vec2::ZERO, Vec2::ONE, Color::WHITE);
        surface.clear(Color::BLACK);
        surface.present();
        assert_eq!(surface.frame(), &[DrawCommand::Clear(Color::BLACK)]);
        assert_eq!(surface.frames(), 2);
    }
}
