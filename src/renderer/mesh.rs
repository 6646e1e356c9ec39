//! Triangle-list tessellation for GPU hosts
//!
//! [`MeshSurface`] turns surface primitives into a flat vertex list a GPU
//! host can upload as-is (see [`MeshSurface::bytes`]).

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use super::surface::{Color, Surface};

/// Segments used for circles and rings
pub const CIRCLE_SEGMENTS: u32 = 24;

/// Simple 2D vertex with position and color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }
}

/// Generate vertices for a filled circle
pub fn circle(center: Vec2, radius: f32, color: [f32; 4], segments: u32) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity((segments * 3) as usize);

    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * 2.0 * PI;
        let theta2 = ((i + 1) as f32 / segments as f32) * 2.0 * PI;

        // Triangle from center to edge
        vertices.push(Vertex::new(center.x, center.y, color));
        vertices.push(Vertex::new(
            center.x + radius * theta1.cos(),
            center.y + radius * theta1.sin(),
            color,
        ));
        vertices.push(Vertex::new(
            center.x + radius * theta2.cos(),
            center.y + radius * theta2.sin(),
            color,
        ));
    }

    vertices
}

/// Generate vertices for a ring (hollow circle)
pub fn ring(center: Vec2, inner_radius: f32, outer_radius: f32, color: [f32; 4], segments: u32) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity((segments * 6) as usize);
    let at = |r: f32, theta: f32| center + Vec2::new(r * theta.cos(), r * theta.sin());

    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * 2.0 * PI;
        let theta2 = ((i + 1) as f32 / segments as f32) * 2.0 * PI;
        quad(
            &mut vertices,
            [
                at(inner_radius, theta1),
                at(outer_radius, theta1),
                at(inner_radius, theta2),
                at(outer_radius, theta2),
            ],
            color,
        );
    }

    vertices
}

/// Two triangles over `[a0, a1, b0, b1]`
fn quad(out: &mut Vec<Vertex>, [a0, a1, b0, b1]: [Vec2; 4], color: [f32; 4]) {
    out.push(Vertex::new(a0.x, a0.y, color));
    out.push(Vertex::new(a1.x, a1.y, color));
    out.push(Vertex::new(b0.x, b0.y, color));

    out.push(Vertex::new(b0.x, b0.y, color));
    out.push(Vertex::new(a1.x, a1.y, color));
    out.push(Vertex::new(b1.x, b1.y, color));
}

fn rect(out: &mut Vec<Vertex>, min: Vec2, max: Vec2, color: [f32; 4]) {
    quad(
        out,
        [min, Vec2::new(max.x, min.y), Vec2::new(min.x, max.y), max],
        color,
    );
}

/// Surface that tessellates into a per-frame vertex list
#[derive(Debug, Clone, Default)]
pub struct MeshSurface {
    pending: Vec<Vertex>,
    presented: Vec<Vertex>,
    clear_color: [f32; 4],
}

impl MeshSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vertices of the last presented frame
    pub fn vertices(&self) -> &[Vertex] {
        &self.presented
    }

    /// Raw bytes of the last presented frame, ready for a vertex buffer
    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.presented)
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }
}

impl Surface for MeshSurface {
    fn clear(&mut self, color: Color) {
        self.pending.clear();
        self.clear_color = color.to_f32();
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.pending
            .extend(circle(center, radius, color.to_f32(), CIRCLE_SEGMENTS));
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Color) {
        let half = width / 2.0;
        self.pending.extend(ring(
            center,
            (radius - half).max(0.0),
            radius + half,
            color.to_f32(),
            CIRCLE_SEGMENTS,
        ));
    }

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Color) {
        rect(&mut self.pending, origin, origin + size, color.to_f32());
    }

    fn stroke_rect(&mut self, origin: Vec2, size: Vec2, width: f32, color: Color) {
        let c = color.to_f32();
        let half = Vec2::splat(width / 2.0);
        let (min, max) = (origin - half, origin + size + half);
        let (inner_min, inner_max) = (origin + half, origin + size - half);
        // Top, bottom, left, right bands
        rect(&mut self.pending, min, Vec2::new(max.x, inner_min.y), c);
        rect(&mut self.pending, Vec2::new(min.x, inner_max.y), max, c);
        rect(&mut self.pending, Vec2::new(min.x, inner_min.y), Vec2::new(inner_min.x, inner_max.y), c);
        rect(&mut self.pending, Vec2::new(inner_max.x, inner_min.y), Vec2::new(max.x, inner_max.y), c);
    }

    fn present(&mut self) {
        self.presented = std::mem::take(&mut self.pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_vertex_count() {
        let verts = circle(Vec2::ZERO, 10.0, [1.0; 4], 16);
        assert_eq!(verts.len(), 48);
        for v in verts.iter().skip(1).step_by(3) {
            let r = Vec2::from(v.position).length();
            assert!((r - 10.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_frame_is_replaced_not_accumulated() {
        let mut mesh = MeshSurface::new();
        mesh.clear(Color::BLACK);
        mesh.fill_rect(Vec2::ZERO, Vec2::splat(4.0), Color::WHITE);
        mesh.present();
        assert_eq!(mesh.vertices().len(), 6);
        assert_eq!(mesh.bytes().len(), 6 * std::mem::size_of::<Vertex>());

        mesh.clear(Color::WHITE);
        mesh.fill_circle(Vec2::ZERO, 1.0, Color::BLACK);
        mesh.present();
        assert_eq!(mesh.vertices().len(), CIRCLE_SEGMENTS as usize * 3);
        assert_eq!(mesh.clear_color(), [1.0; 4]);
    }

    #[test]
    fn test_stroke_rect_bands() {
        let mut mesh = MeshSurface::new();
        mesh.stroke_rect(Vec2::ZERO, Vec2::new(10.0, 10.0), 2.0, Color::WHITE);
        mesh.present();
        assert_eq!(mesh.vertices().len(), 24);
        let xs: Vec<f32> = mesh.vertices().iter().map(|v| v.position[0]).collect();
        assert!(xs.iter().all(|&x| (-1.0..=11.0).contains(&x)));
    }
}
