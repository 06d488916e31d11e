//! Visual reactions to server events: hit flashes, debris bursts and the
//! death screen. Nothing here feeds back into gameplay.

use crate::mirror::Mirror;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{EntityId, GameEvent, Rgb, Vec3};
use std::collections::HashMap;

pub const FLASH_DURATION: f32 = 0.15;
pub const DEBRIS_PIECES: usize = 8;
/// Radius of the sphere debris pieces start in.
pub const DEBRIS_SPREAD: f32 = 0.5;
pub const DEBRIS_FORCE: f32 = 5.0;
pub const DEBRIS_LIFETIME: f32 = 3.0;
pub const GRAVITY: f32 = 9.81;

#[derive(Debug, Clone, PartialEq)]
pub struct Debris {
    pub position: Vec3,
    pub velocity: Vec3,
    pub age: f32,
    pub color: Rgb,
}

impl Debris {
    fn update(&mut self, dt: f32) {
        self.age += dt;
        self.velocity.y -= GRAVITY * dt;
        self.position = self.position.add(&self.velocity.scale(dt));

        if self.position.y < 0.0 {
            self.position.y = 0.0;
            self.velocity = Vec3::ground(self.velocity.x, self.velocity.z).scale(0.5);
        }
    }

    pub fn is_expired(&self) -> bool {
        self.age >= DEBRIS_LIFETIME
    }
}

pub struct Effects {
    flashes: HashMap<EntityId, f32>,
    debris: Vec<Debris>,
    death_screen: bool,
    rng: StdRng,
}

impl Effects {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            flashes: HashMap::new(),
            debris: Vec::new(),
            death_screen: false,
            rng,
        }
    }

    /// Reacts to one server event. Must run before the mirror applies it so
    /// a destroyed hostile's colour is still known.
    pub fn handle_event(&mut self, event: &GameEvent, mirror: &Mirror) {
        match event {
            GameEvent::HitPulse { entity, .. } => {
                self.flashes.insert(*entity, FLASH_DURATION);
            }
            GameEvent::Destroyed { entity, position } => {
                let color = mirror.base_color(entity).unwrap_or(Rgb::PURPLE);
                self.spawn_debris(*position, color);
                self.flashes.remove(entity);
            }
            GameEvent::Despawned { entity } => {
                self.flashes.remove(entity);
            }
            GameEvent::Died { entity } if mirror.local_entity() == Some(*entity) => {
                self.death_screen = true;
            }
            GameEvent::Respawned { entity, .. } if mirror.local_entity() == Some(*entity) => {
                self.death_screen = false;
            }
            _ => {}
        }
    }

    fn random_unit(&mut self) -> Vec3 {
        loop {
            let candidate = Vec3::new(
                self.rng.gen_range(-1.0..=1.0),
                self.rng.gen_range(-1.0..=1.0),
                self.rng.gen_range(-1.0..=1.0),
            );
            let length_squared = candidate.magnitude_squared();
            if length_squared > 1e-4 && length_squared <= 1.0 {
                return candidate.normalize();
            }
        }
    }

    fn spawn_debris(&mut self, origin: Vec3, color: Rgb) {
        for _ in 0..DEBRIS_PIECES {
            let offset = self
                .random_unit()
                .scale(self.rng.gen_range(0.0..=DEBRIS_SPREAD));
            let velocity = self.random_unit().scale(DEBRIS_FORCE);
            self.debris.push(Debris {
                position: origin.add(&offset),
                velocity,
                age: 0.0,
                color,
            });
        }
    }

    /// Advances timers and debris, and keeps the death screen in line with
    /// the mirrored local player (covers joining while already dead).
    pub fn update(&mut self, dt: f32, mirror: &Mirror) {
        self.flashes.retain(|_, remaining| {
            *remaining -= dt;
            *remaining > 0.0
        });

        for piece in &mut self.debris {
            piece.update(dt);
        }
        self.debris.retain(|piece| !piece.is_expired());

        if mirror.local_player().is_some() {
            self.death_screen = mirror.is_local_dead();
        }
    }

    pub fn is_flashing(&self, entity: &EntityId) -> bool {
        self.flashes.contains_key(entity)
    }

    /// White while a hit flash is running, the base colour otherwise.
    pub fn display_color(&self, entity: &EntityId, base: Rgb) -> Rgb {
        if self.is_flashing(entity) {
            Rgb::WHITE
        } else {
            base
        }
    }

    pub fn debris(&self) -> &[Debris] {
        &self.debris
    }

    pub fn death_screen_visible(&self) -> bool {
        self.death_screen
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{EnemySnapshot, PlayerSnapshot};

    fn effects() -> Effects {
        Effects::with_rng(StdRng::seed_from_u64(3))
    }

    fn mirror_with_local(hp: i32) -> Mirror {
        let mut mirror = Mirror::new();
        mirror.set_local(1, 10);
        mirror.apply_snapshot(
            1,
            vec![PlayerSnapshot {
                id: 10,
                owner: 1,
                position: Vec3::ZERO,
                facing: Vec3::FORWARD,
                current_hp: hp,
                max_hp: 100,
                is_dead: hp == 0,
                color: Rgb::new(0.1, 0.8, 0.3),
            }],
            vec![EnemySnapshot {
                id: 20,
                position: Vec3::ground(3.0, 0.0),
                current_hp: 100,
                max_hp_display: 100,
            }],
        );
        mirror
    }

    #[test]
    fn test_hit_flash_expires() {
        let mirror = mirror_with_local(100);
        let mut effects = effects();
        effects.handle_event(
            &GameEvent::HitPulse {
                entity: 20,
                attacker: 10,
            },
            &mirror,
        );

        assert_eq!(effects.display_color(&20, Rgb::RED), Rgb::WHITE);
        effects.update(0.1, &mirror);
        assert!(effects.is_flashing(&20));
        effects.update(0.1, &mirror);
        assert!(!effects.is_flashing(&20));
        assert_eq!(effects.display_color(&20, Rgb::RED), Rgb::RED);
    }

    #[test]
    fn test_destroyed_spawns_debris_burst() {
        let mirror = mirror_with_local(100);
        let mut effects = effects();
        let origin = Vec3::ground(3.0, 0.0);
        effects.handle_event(
            &GameEvent::Destroyed {
                entity: 20,
                position: origin,
            },
            &mirror,
        );

        assert_eq!(effects.debris().len(), DEBRIS_PIECES);
        for piece in effects.debris() {
            assert!(piece.position.distance(&origin) <= DEBRIS_SPREAD + 1e-4);
            assert!((piece.velocity.magnitude() - DEBRIS_FORCE).abs() < 1e-3);
            assert_eq!(piece.color, Rgb::RED);
        }
    }

    #[test]
    fn test_debris_falls_and_expires() {
        let mirror = mirror_with_local(100);
        let mut effects = effects();
        effects.handle_event(
            &GameEvent::Destroyed {
                entity: 20,
                position: Vec3::new(0.0, 10.0, 0.0),
            },
            &mirror,
        );

        effects.update(0.5, &mirror);
        for piece in effects.debris() {
            assert!(piece.position.y >= 0.0);
        }

        for _ in 0..6 {
            effects.update(0.5, &mirror);
        }
        assert!(effects.debris().is_empty());
    }

    #[test]
    fn test_death_screen_follows_local_player() {
        let mut mirror = mirror_with_local(100);
        let mut effects = effects();

        let died = GameEvent::Died { entity: 10 };
        effects.handle_event(&died, &mirror);
        mirror.apply_events(2, &[died]);
        assert!(effects.death_screen_visible());

        let respawned = GameEvent::Respawned {
            entity: 10,
            position: Vec3::ZERO,
            current_hp: 100,
        };
        effects.handle_event(&respawned, &mirror);
        mirror.apply_events(3, &[respawned]);
        effects.update(0.016, &mirror);
        assert!(!effects.death_screen_visible());
    }

    #[test]
    fn test_other_players_death_ignored() {
        let mirror = mirror_with_local(100);
        let mut effects = effects();
        effects.handle_event(&GameEvent::Died { entity: 99 }, &mirror);
        assert!(!effects.death_screen_visible());
    }

    #[test]
    fn test_joining_dead_shows_death_screen() {
        let mirror = mirror_with_local(0);
        let mut effects = effects();
        effects.update(0.016, &mirror);
        assert!(effects.death_screen_visible());
    }
}
