//! Periodic hostile spawning in a ring around the player cohort.

use crate::config::SpawnerConfig;
use crate::entity::Enemy;
use crate::events::GameObserver;
use crate::registry::Registry;
use log::debug;
use rand::Rng;
use shared::{EntityId, EntityKind, GameEvent, Vec3};
use std::f32::consts::TAU;

/// Samples a point on the ground plane in the annulus `[min_radius, max_radius]` around `center`.
pub fn sample_ring_position<R: Rng>(
    center: &Vec3,
    min_radius: f32,
    max_radius: f32,
    rng: &mut R,
) -> Vec3 {
    let theta = rng.gen_range(0.0..TAU);
    let r = rng.gen_range(min_radius..=max_radius);
    Vec3::ground(center.x + r * theta.cos(), center.z + r * theta.sin())
}

pub struct Spawner {
    config: SpawnerConfig,
    timer: f32,
}

impl Spawner {
    pub fn new(config: SpawnerConfig) -> Self {
        Self { config, timer: 0.0 }
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    /// Advances the spawn timer and spawns one hostile when the interval elapses.
    pub fn update<R: Rng>(
        &mut self,
        dt: f32,
        registry: &mut Registry,
        rng: &mut R,
        observer: &mut dyn GameObserver,
    ) -> Option<EntityId> {
        self.timer += dt;
        if self.timer < self.config.spawn_interval {
            return None;
        }
        self.timer = 0.0;

        if let Some(cap) = self.config.max_enemies {
            if registry.enemy_count() >= cap {
                debug!("Enemy cap {} reached, skipping spawn", cap);
                return None;
            }
        }

        let center = registry.player_centroid();
        let position =
            sample_ring_position(&center, self.config.min_radius, self.config.max_radius, rng);
        let hp = rng.gen_range(self.config.min_hp..=self.config.max_hp);

        Some(spawn_enemy(registry, position, hp, self.config.max_hp, observer))
    }
}

/// Registers a hostile and announces it.
pub fn spawn_enemy(
    registry: &mut Registry,
    position: Vec3,
    hp: i32,
    max_hp_display: i32,
    observer: &mut dyn GameObserver,
) -> EntityId {
    let id = registry.allocate_id();
    registry.insert_enemy(Enemy::new(id, position, hp, max_hp_display));
    debug!(
        "Spawned enemy {} at ({:.1}, {:.1}) with {} HP",
        id, position.x, position.z, hp
    );
    observer.notify(GameEvent::Spawned {
        entity: id,
        kind: EntityKind::Enemy,
        position,
        current_hp: hp,
        max_hp: max_hp_display,
    });
    id
}
