//! Entity-to-surface adapter

use glam::Vec2;

use super::surface::{Color, Surface, colors};
use crate::sim::entity::{Entity, Kind, Shape};

/// How one entity is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub fill: Option<Color>,
    /// Outline color and line width
    pub stroke: Option<(Color, f32)>,
}

impl Style {
    pub const HIDDEN: Style = Style { fill: None, stroke: None };

    pub fn fill(color: Color) -> Self {
        Self {
            fill: Some(color),
            stroke: None,
        }
    }

    pub fn outline(color: Color, width: f32) -> Self {
        Self {
            fill: None,
            stroke: Some((color, width)),
        }
    }

    pub fn with_stroke(mut self, color: Color, width: f32) -> Self {
        self.stroke = Some((color, width));
        self
    }
}

/// Default style: filled with the kind's palette color
pub fn kind_style<P>(entity: &Entity<P>) -> Style {
    Style::fill(match entity.kind {
        Kind::Ship => colors::SHIP,
        Kind::Projectile => colors::PROJECTILE,
        Kind::Obstacle => colors::OBSTACLE,
        Kind::Particle => colors::PARTICLE,
        Kind::PowerUp => colors::POWER_UP,
        Kind::Enemy => colors::ENEMY,
    })
}

/// Size multiplier for pseudo-3D depth
#[inline]
pub fn depth_scale(z: Option<f32>) -> f32 {
    match z {
        Some(z) if z.is_finite() && z > -1.0 => 1.0 / (1.0 + z),
        _ => 1.0,
    }
}

/// What the engine draws through
///
/// Implementations must not carry drawing state from one frame to the next.
pub trait RenderAdapter<P> {
    fn clear(&mut self);
    fn draw_entity(&mut self, entity: &Entity<P>);
    fn present(&mut self);
}

/// Draws entity shapes onto any [`Surface`]
pub struct ShapeRenderer<S, F> {
    surface: S,
    style: F,
    background: Color,
}

impl<S: Surface, F> ShapeRenderer<S, F> {
    pub fn new(surface: S, style: F) -> Self {
        Self {
            surface,
            style,
            background: colors::BACKGROUND,
        }
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

impl<P, S, F> RenderAdapter<P> for ShapeRenderer<S, F>
where
    S: Surface,
    F: Fn(&Entity<P>) -> Style,
{
    fn clear(&mut self) {
        self.surface.clear(self.background);
    }

    fn draw_entity(&mut self, entity: &Entity<P>) {
        let style = (self.style)(entity);
        let scale = depth_scale(entity.z);
        match entity.shape {
            Shape::Circle { radius } => {
                let radius = radius * scale;
                if let Some(color) = style.fill {
                    self.surface.fill_circle(entity.pos, radius, color);
                }
                if let Some((color, width)) = style.stroke {
                    self.surface.stroke_circle(entity.pos, radius, width, color);
                }
            }
            Shape::Rect { width, height } => {
                let size = Vec2::new(width, height) * scale;
                let origin = entity.pos - size / 2.0;
                if let Some(color) = style.fill {
                    self.surface.fill_rect(origin, size, color);
                }
                if let Some((color, line)) = style.stroke {
                    self.surface.stroke_rect(origin, size, line, color);
                }
            }
        }
    }

    fn present(&mut self) {
        self.surface.present();
    }
}
