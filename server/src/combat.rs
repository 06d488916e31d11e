//! Melee cone attacks, hostile contact damage, and the shared damage rule.
//!
//! Damage application is idempotent around death: an entity at zero HP (or
//! already removed) ignores further damage, so two attacks landing on the same
//! target in one tick can never kill it twice.

use crate::entity::{enemies_touch, enemy_touches_player};
use crate::events::GameObserver;
use crate::registry::Registry;
use log::{debug, info};
use shared::{hp_ratio, lerp, EntityId, GameEvent, Vec3};
use std::collections::BTreeSet;

/// Rounding slack on the cosine comparison, a few ULPs around 1.0.
const CONE_EPSILON: f32 = 4.0 * f32::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Target missing, already dead, or a negative amount.
    Rejected,
    Damaged { remaining: i32 },
    Killed,
}

/// Whether `target` lies inside the attack fan of width `attack_angle` degrees
/// centred on `facing`, within `range` of `origin`.
pub fn in_attack_cone(
    origin: &Vec3,
    facing: &Vec3,
    target: &Vec3,
    range: f32,
    attack_angle: f32,
) -> bool {
    let offset = target.sub(origin);
    let distance_squared = offset.magnitude_squared();
    if distance_squared > range * range {
        return false;
    }
    if distance_squared == 0.0 {
        return true;
    }

    let threshold = (attack_angle.to_radians() / 2.0).cos();
    let alignment = facing.normalize().dot(&offset.normalize()).clamp(-1.0, 1.0);
    alignment >= threshold - CONE_EPSILON
}

/// Contact damage of a hostile: weak when wounded, up to double when healthy.
pub fn contact_damage(base_damage: i32, current_hp: i32, max_hp_display: i32) -> i32 {
    let ratio = hp_ratio(current_hp, max_hp_display);
    (base_damage as f32 * lerp(0.5, 2.0, ratio)).round() as i32
}

/// Applies `amount` damage to any entity and performs its death transition.
pub fn apply_damage(
    registry: &mut Registry,
    target: EntityId,
    amount: i32,
    observer: &mut dyn GameObserver,
) -> DamageOutcome {
    if amount < 0 {
        return DamageOutcome::Rejected;
    }

    if let Some(enemy) = registry.enemy_mut(&target) {
        if enemy.current_hp <= 0 {
            return DamageOutcome::Rejected;
        }
        enemy.current_hp = (enemy.current_hp - amount).max(0);
        let remaining = enemy.current_hp;
        let position = enemy.position;
        observer.notify(GameEvent::HpChanged {
            entity: target,
            current_hp: remaining,
            max_hp: enemy.max_hp_display,
        });

        if remaining > 0 {
            return DamageOutcome::Damaged { remaining };
        }

        debug!("Enemy {} destroyed", target);
        observer.notify(GameEvent::Destroyed {
            entity: target,
            position,
        });
        registry.remove_enemy(&target);
        return DamageOutcome::Killed;
    }

    if let Some(player) = registry.player_mut(&target) {
        if player.is_dead || player.current_hp <= 0 {
            return DamageOutcome::Rejected;
        }
        player.current_hp = (player.current_hp - amount).max(0);
        let remaining = player.current_hp;
        observer.notify(GameEvent::HpChanged {
            entity: target,
            current_hp: remaining,
            max_hp: player.max_hp(),
        });

        if remaining > 0 {
            return DamageOutcome::Damaged { remaining };
        }

        player.is_dead = true;
        player.move_intent = Vec3::ZERO;
        info!("Player {} (client {}) died", target, player.owner);
        observer.notify(GameEvent::Died { entity: target });
        return DamageOutcome::Killed;
    }

    DamageOutcome::Rejected
}

/// Resolves one melee swing from `attacker`. Returns the ids that were hit.
///
/// Cooldown gating is the caller's job; this only scans and applies damage.
pub fn resolve_attack(
    registry: &mut Registry,
    attacker: EntityId,
    observer: &mut dyn GameObserver,
) -> Vec<EntityId> {
    let Some(player) = registry.player(&attacker) else {
        return Vec::new();
    };
    if !player.is_alive() {
        return Vec::new();
    }

    let origin = player.position;
    let facing = player.facing;
    let stats = player.stats.clone();

    let candidates: Vec<(EntityId, Vec3)> = registry
        .enemies()
        .map(|enemy| (enemy.id, enemy.position))
        .chain(
            registry
                .players()
                .filter(|other| other.id != attacker && other.is_alive())
                .map(|other| (other.id, other.position)),
        )
        .collect();

    let hits: Vec<EntityId> = candidates
        .into_iter()
        .filter(|(_, position)| {
            in_attack_cone(
                &origin,
                &facing,
                position,
                stats.attack_range,
                stats.attack_angle,
            )
        })
        .map(|(id, _)| id)
        .collect();

    for target in &hits {
        observer.notify(GameEvent::HitPulse {
            entity: *target,
            attacker,
        });
        apply_damage(registry, *target, stats.attack_damage, observer);
    }

    hits
}

/// Tracks which hostile/target pairs are touching so contact damage fires once
/// per contact, on entry.
#[derive(Debug, Default)]
pub struct ContactTracker {
    touching: BTreeSet<(EntityId, EntityId)>,
}

impl ContactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_touching(&self, enemy: EntityId, other: EntityId) -> bool {
        self.touching.contains(&(enemy, other))
    }

    /// Detects new contacts and applies each hostile's contact damage once.
    /// Returns the pairs `(hostile, victim)` that started touching this tick.
    pub fn resolve(
        &mut self,
        registry: &mut Registry,
        base_damage: i32,
        damages_enemies: bool,
        observer: &mut dyn GameObserver,
    ) -> Vec<(EntityId, EntityId)> {
        let mut current = BTreeSet::new();

        for enemy in registry.enemies() {
            for player in registry.players().filter(|p| p.is_alive()) {
                if enemy_touches_player(enemy, player) {
                    current.insert((enemy.id, player.id));
                }
            }
            if damages_enemies {
                for other in registry.enemies().filter(|other| other.id != enemy.id) {
                    if enemies_touch(enemy, other) {
                        current.insert((enemy.id, other.id));
                    }
                }
            }
        }

        let entered: Vec<(EntityId, EntityId)> =
            current.difference(&self.touching).copied().collect();

        for (enemy_id, victim) in &entered {
            // A hostile killed earlier in this pass deals nothing.
            let Some(enemy) = registry.enemy(enemy_id) else {
                continue;
            };
            let damage = contact_damage(base_damage, enemy.current_hp, enemy.max_hp_display);
            debug!(
                "Enemy {} touched {} for {} damage (ratio {:.2})",
                enemy_id,
                victim,
                damage,
                enemy.hp_ratio()
            );
            apply_damage(registry, *victim, damage, observer);
        }

        current.retain(|(enemy, victim)| {
            registry.contains(enemy) && registry.damageable_position(victim).is_some()
        });
        self.touching = current;
        entered
    }
}
