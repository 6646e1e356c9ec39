//! Meteor Storm: a small reference game built on the engine
//!
//! The ship sits near the bottom of the playfield and shoots meteors that
//! the director drops in waves. Large meteors split when destroyed.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::config::EngineConfig;
use crate::sim::collision::{Contact, PairRule, Resolver};
use crate::sim::director::SpawnRequest;
use crate::sim::entity::{Entity, EntityId, Kind, Lifetime};
use crate::sim::physics::Boundary;
use crate::sim::tick::InputSnapshot;
use crate::sim::world::{Game, World};

pub const SHIP_RADIUS: f32 = 12.0;
pub const SHIP_SPEED: f32 = 260.0;
pub const SHOT_SPEED: f32 = 480.0;
pub const SHOT_COOLDOWN: f32 = 0.2;
pub const METEOR_RADIUS: f32 = 22.0;
pub const METEOR_SPEED: f32 = 70.0;
pub const START_LIVES: u8 = 3;
/// Seconds of invulnerability after losing a life
pub const RESPAWN_SHIELD: f32 = 2.0;
const DEBRIS_PER_HIT: usize = 6;

/// Per-entity game data
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Tag {
    #[default]
    Plain,
    /// Size tier; tier 1 meteors do not split
    Meteor { tier: u8 },
}

#[derive(Debug, Clone)]
pub struct MeteorStorm {
    pub score: u64,
    pub lives: u8,
    shield: f32,
    cooldown: f32,
    seed: u64,
    rng: Pcg32,
}

impl MeteorStorm {
    pub fn new(seed: u64) -> Self {
        Self {
            score: 0,
            lives: START_LIVES,
            shield: 0.0,
            cooldown: 0.0,
            seed,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Shots hit the nearest meteor; the ship collides with all of them
    pub fn resolver() -> Resolver {
        Resolver::new(vec![
            PairRule::nearest(Kind::Projectile, Kind::Enemy),
            PairRule::all(Kind::Ship, Kind::Enemy),
        ])
    }

    pub fn config() -> EngineConfig {
        EngineConfig::default()
    }

    pub fn is_shielded(&self) -> bool {
        self.shield > 0.0
    }

    fn meteor(pos: Vec2, vel: Vec2, tier: u8) -> Entity<Tag> {
        Entity::circle(Kind::Enemy, pos, METEOR_RADIUS * tier as f32 / 2.0, Tag::Meteor { tier })
            .with_vel(vel)
            .with_health(tier as i32)
    }

    fn debris(&mut self, world: &mut World<Tag>, at: Vec2) {
        for _ in 0..DEBRIS_PER_HIT {
            let angle = self.rng.random::<f32>() * std::f32::consts::TAU;
            let speed = 40.0 + self.rng.random::<f32>() * 80.0;
            let spark = Entity::circle(Kind::Particle, at, 1.5, Tag::Plain)
                .with_vel(Vec2::from_angle(angle) * speed)
                .with_lifetime(Lifetime::Ticks(20));
            // Over budget: the effect is simply skipped
            if world.store.try_add(spark).is_none() {
                break;
            }
        }
    }

    fn hit_meteor(&mut self, world: &mut World<Tag>, shot: EntityId, meteor: EntityId) {
        world.store.remove(shot);
        let Some(target) = world.store.get_mut(meteor) else {
            return;
        };
        // Destroyed earlier this tick, pruned at its end
        if target.is_dead() || !target.damage(1) {
            return;
        }
        let (pos, vel, tier) = match target.payload {
            Tag::Meteor { tier } => (target.pos, target.vel, tier),
            Tag::Plain => (target.pos, target.vel, 1),
        };
        self.score += 100 / tier.max(1) as u64;
        self.debris(world, pos);
        if tier > 1 {
            for side in [-1.0, 1.0] {
                let drift = Vec2::new(side * 40.0, 0.0);
                world.store.add(Self::meteor(pos + drift * 0.25, vel + drift, tier - 1));
            }
        }
    }

    fn hit_ship(&mut self, world: &mut World<Tag>, meteor: EntityId) {
        if self.is_shielded() || world.store.get(meteor).is_none() {
            return;
        }
        world.store.remove(meteor);
        self.lives = self.lives.saturating_sub(1);
        log::info!("Ship hit, {} lives left", self.lives);
        if self.lives == 0 {
            world.game_over();
        } else {
            self.shield = RESPAWN_SHIELD;
        }
    }
}

impl Default for MeteorStorm {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Game for MeteorStorm {
    type Payload = Tag;

    fn spawn(&mut self, request: SpawnRequest, world: &mut World<Tag>) {
        let width = world.bounds().width;
        let x = METEOR_RADIUS + self.rng.random::<f32>() * (width - 2.0 * METEOR_RADIUS).max(0.0);
        let drift = (self.rng.random::<f32>() - 0.5) * 40.0;
        let speed = METEOR_SPEED + request.wave as f32 * 5.0;
        world
            .store
            .add(Self::meteor(Vec2::new(x, -METEOR_RADIUS), Vec2::new(drift, speed), 2));
    }

    fn control(&mut self, input: &InputSnapshot, world: &mut World<Tag>, dt: f32) {
        self.shield = (self.shield - dt).max(0.0);
        self.cooldown = (self.cooldown - dt).max(0.0);

        let steer = Vec2::new(
            input.axis(&["arrowleft", "a"], &["arrowright", "d"]),
            input.axis(&["arrowup", "w"], &["arrowdown", "s"]),
        );
        let mut muzzle = None;
        world.store.for_each_kind_mut(Kind::Ship, |ship| {
            ship.vel = steer * SHIP_SPEED;
            muzzle = Some(ship.pos - Vec2::new(0.0, SHIP_RADIUS));
        });

        if let Some(at) = muzzle {
            if self.cooldown <= 0.0 && (input.is_pressed(" ") || input.is_button_down(0)) {
                self.cooldown = SHOT_COOLDOWN;
                world.store.add(
                    Entity::circle(Kind::Projectile, at, 2.5, Tag::Plain)
                        .with_vel(Vec2::new(0.0, -SHOT_SPEED))
                        .with_lifetime(Lifetime::Seconds(2.0)),
                );
            }
        }
    }

    fn on_contact(&mut self, contact: &Contact, world: &mut World<Tag>) {
        if let (Some(shot), Some(meteor)) = (contact.side(Kind::Projectile), contact.side(Kind::Enemy)) {
            self.hit_meteor(world, shot, meteor);
        } else if let (Some(_), Some(meteor)) = (contact.side(Kind::Ship), contact.side(Kind::Enemy)) {
            self.hit_ship(world, meteor);
        }
    }

    fn on_reset(&mut self, world: &mut World<Tag>) {
        *self = Self::new(self.seed);
        let bounds = world.bounds();
        world.store.add(
            Entity::circle(
                Kind::Ship,
                Vec2::new(bounds.width / 2.0, bounds.height - 3.0 * SHIP_RADIUS),
                SHIP_RADIUS,
                Tag::Plain,
            )
            .with_boundary(Boundary::Clamp),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::director::WavePhase;
    use crate::sim::tick::tick;
    use crate::sim::world::Phase;

    const DT: f32 = 1.0 / 60.0;

    fn setup() -> (World<Tag>, MeteorStorm) {
        let mut world = World::from_config(&MeteorStorm::config(), MeteorStorm::resolver());
        let mut game = MeteorStorm::new(7);
        game.on_reset(&mut world);
        (world, game)
    }

    fn ship_pos(world: &World<Tag>) -> Vec2 {
        world.store.iter_kind(Kind::Ship).next().map(|s| s.pos).unwrap()
    }

    #[test]
    fn test_ship_moves_and_stays_on_field() {
        let (mut world, mut game) = setup();
        let start = ship_pos(&world);
        let input = InputSnapshot::with_keys(&["ArrowRight"]);
        tick(&mut world, &mut game, &input, DT);
        assert!(ship_pos(&world).x > start.x);

        for _ in 0..600 {
            tick(&mut world, &mut game, &input, DT);
        }
        assert!(ship_pos(&world).x <= world.bounds().width);
    }

    #[test]
    fn test_fire_respects_cooldown() {
        let (mut world, mut game) = setup();
        let input = InputSnapshot::with_keys(&[" "]);
        for _ in 0..6 {
            tick(&mut world, &mut game, &input, DT);
        }
        // 0.1s of holding fire: one shot
        assert_eq!(world.store.count(Kind::Projectile), 1);
    }

    #[test]
    fn test_large_meteor_splits() {
        let (mut world, mut game) = setup();
        let meteor = world
            .store
            .add(MeteorStorm::meteor(Vec2::new(100.0, 100.0), Vec2::ZERO, 2));
        for _ in 0..2 {
            let shot = world.store.add(Entity::circle(Kind::Projectile, Vec2::new(100.0, 100.0), 2.0, Tag::Plain));
            game.hit_meteor(&mut world, shot, meteor);
        }
        world.store.remove_where(|e| e.is_dead());
        world.store.flush();

        assert_eq!(game.score, 50);
        let tiers: Vec<Tag> = world.store.iter_kind(Kind::Enemy).map(|e| e.payload).collect();
        assert_eq!(tiers, vec![Tag::Meteor { tier: 1 }, Tag::Meteor { tier: 1 }]);
        assert!(world.store.count(Kind::Particle) > 0);
    }

    #[test]
    fn test_collisions_cost_lives_until_game_over() {
        let (mut world, mut game) = setup();
        let at = ship_pos(&world);
        for expected in (0..START_LIVES).rev() {
            game.shield = 0.0;
            let meteor = world.store.add(MeteorStorm::meteor(at, Vec2::ZERO, 2));
            game.hit_ship(&mut world, meteor);
            assert_eq!(game.lives, expected);
        }
        assert_eq!(world.phase, Phase::GameOver);
    }

    #[test]
    fn test_shield_absorbs_hits() {
        let (mut world, mut game) = setup();
        let meteor = world.store.add(MeteorStorm::meteor(Vec2::ZERO, Vec2::ZERO, 1));
        game.shield = 1.0;
        game.hit_ship(&mut world, meteor);
        assert_eq!(game.lives, START_LIVES);
        assert!(world.store.get(meteor).is_some());
    }

    #[test]
    fn test_waves_spawn_meteors() {
        let (mut world, mut game) = setup();
        let idle = InputSnapshot::default();
        for _ in 0..240 {
            tick(&mut world, &mut game, &idle, DT);
        }
        assert_eq!(world.director.phase(), WavePhase::Spawning);
        assert!(world.director.spawned() > 0);
    }

    #[test]
    fn test_same_seed_same_game() {
        let run = || {
            let (mut world, mut game) = setup();
            let input = InputSnapshot::with_keys(&[" ", "a"]);
            for _ in 0..900 {
                tick(&mut world, &mut game, &input, DT);
            }
            let positions: Vec<Vec2> = world.store.iter().map(|e| e.pos).collect();
            (game.score, world.tick, positions)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_reset_restores_ship_and_lives() {
        let (mut world, mut game) = setup();
        game.lives = 1;
        game.score = 900;
        world.reset();
        game.on_reset(&mut world);
        assert_eq!(game.lives, START_LIVES);
        assert_eq!(game.score, 0);
        assert_eq!(world.store.count(Kind::Ship), 1);
    }
}
