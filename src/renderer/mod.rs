//! Rendering module
//!
//! The simulation never touches a drawing API directly: it hands entities to a
//! [`RenderAdapter`], which draws through a host [`Surface`].

pub mod adapter;
pub mod mesh;
pub mod surface;

pub use adapter::{RenderAdapter, ShapeRenderer, Style, depth_scale, kind_style};
pub use mesh::{MeshSurface, Vertex};
pub use surface::{Color, DrawCommand, RecordingSurface, Surface};

use crate::sim::world::World;

/// Draw one frame of `world`: live entities only, in store order
pub fn render<P, R: RenderAdapter<P> + ?Sized>(world: &World<P>, adapter: &mut R) -> usize {
    adapter.clear();
    let mut drawn = 0;
    for entity in world.store.iter() {
        adapter.draw_entity(entity);
        drawn += 1;
    }
    adapter.present();
    drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::collision::Resolver;
    use crate::sim::director::DirectorConfig;
    use crate::sim::entity::{Entity, Kind};
    use crate::sim::physics::PhysicsConfig;
    use glam::Vec2;

    #[test]
    fn test_removed_entities_are_not_drawn() {
        let mut world: World = World::new(PhysicsConfig::default(), Resolver::default(), DirectorConfig::default());
        let gone = world.store.add(Entity::circle(Kind::Enemy, Vec2::new(10.0, 10.0), 4.0, ()));
        world.store.add(Entity::circle(Kind::Ship, Vec2::new(20.0, 20.0), 6.0, ()));
        world.store.remove(gone);

        let mut renderer = ShapeRenderer::new(RecordingSurface::new(), kind_style::<()>);
        assert_eq!(render(&world, &mut renderer), 1);

        let frame = renderer.surface().frame();
        assert_eq!(frame.len(), 2);
        assert!(matches!(frame[0], DrawCommand::Clear(_)));
        assert!(matches!(frame[1], DrawCommand::FillCircle { radius, .. } if radius == 6.0));
    }

    #[test]
    fn test_render_through_mesh() {
        let mut world: World = World::new(PhysicsConfig::default(), Resolver::default(), DirectorConfig::default());
        world.store.add(Entity::rect(Kind::Obstacle, Vec2::new(100.0, 100.0), 10.0, 10.0, ()));
        let mut renderer = ShapeRenderer::new(MeshSurface::new(), kind_style::<()>);
        render(&world, &mut renderer);
        assert_eq!(renderer.surface().vertices().len(), 6);
    }
}
