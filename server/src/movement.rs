//! Per-tick positional updates: input-driven players and seeking hostiles.

use crate::registry::Registry;
use shared::{hp_ratio, lerp, Vec3};

/// Hostile speed factor: healthy hostiles are slow, wounded ones fast.
pub fn speed_multiplier(current_hp: i32, max_hp_display: i32) -> f32 {
    lerp(1.5, 0.5, hp_ratio(current_hp, max_hp_display))
}

/// Direction a player faces after moving with `intent`; unchanged for a zero intent.
pub fn facing_from_intent(intent: &Vec3, current: &Vec3) -> Vec3 {
    let flat = intent.flatten();
    if flat.magnitude_squared() > 1e-6 {
        flat.normalize()
    } else {
        *current
    }
}

pub fn clamp_to_arena(position: &Vec3, arena_radius: Option<f32>) -> Vec3 {
    match arena_radius {
        Some(radius) => {
            let flat = position.flatten();
            let distance = flat.magnitude();
            if distance > radius && distance > 0.0 {
                let clamped = flat.scale(radius / distance);
                Vec3::new(clamped.x, position.y, clamped.z)
            } else {
                *position
            }
        }
        None => *position,
    }
}

/// Moves every alive player by `intent * speed * dt`.
pub fn move_players(registry: &mut Registry, speed: f32, arena_radius: Option<f32>, dt: f32) {
    for player in registry.players_mut() {
        if !player.is_alive() {
            continue;
        }
        let step = player.move_intent.scale(speed * dt);
        player.position = clamp_to_arena(&player.position.add(&step), arena_radius);
    }
}

/// Moves every hostile toward its nearest alive player without overshooting.
pub fn move_enemies(registry: &mut Registry, base_speed: f32, dt: f32) {
    for id in registry.enemy_ids() {
        let (position, current_hp, max_hp_display) = match registry.enemy(&id) {
            Some(enemy) => (enemy.position, enemy.current_hp, enemy.max_hp_display),
            None => continue,
        };

        let Some((_, target)) = registry.nearest_alive_player(&position) else {
            continue;
        };

        let step = base_speed * speed_multiplier(current_hp, max_hp_display) * dt;
        if let Some(enemy) = registry.enemy_mut(&id) {
            enemy.position = position.move_towards(&target, step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CombatStats;
    use crate::entity::{Enemy, Player};
    use assert_approx_eq::assert_approx_eq;
    use shared::Rgb;

    fn registry_with_player(position: Vec3) -> (Registry, u32) {
        let mut registry = Registry::new();
        let id = registry.allocate_id();
        registry.insert_player(Player::new(id, 1, position, Rgb::WHITE, CombatStats::default()));
        (registry, id)
    }

    #[test]
    fn test_speed_multiplier_bounds() {
        assert_approx_eq!(speed_multiplier(100, 100), 0.5);
        assert_approx_eq!(speed_multiplier(0, 100), 1.5);
        assert_approx_eq!(speed_multiplier(50, 100), 1.0);
    }

    #[test]
    fn test_speed_multiplier_strictly_decreasing() {
        let mut previous = f32::MAX;
        for hp in 0..=100 {
            let m = speed_multiplier(hp, 100);
            assert!(m < previous, "not decreasing at hp {}", hp);
            previous = m;
        }
    }

    #[test]
    fn test_player_moves_by_intent() {
        let (mut registry, id) = registry_with_player(Vec3::ZERO);
        registry.player_mut(&id).unwrap().move_intent = Vec3::ground(1.0, 0.0);

        move_players(&mut registry, 5.0, None, 0.5);
        assert_approx_eq!(registry.player(&id).unwrap().position.x, 2.5);
    }

    #[test]
    fn test_dead_player_does_not_move() {
        let (mut registry, id) = registry_with_player(Vec3::ZERO);
        let player = registry.player_mut(&id).unwrap();
        player.move_intent = Vec3::ground(1.0, 1.0);
        player.current_hp = 0;
        player.is_dead = true;

        move_players(&mut registry, 5.0, None, 1.0);
        assert_eq!(registry.player(&id).unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn test_arena_clamp() {
        let (mut registry, id) = registry_with_player(Vec3::ground(9.0, 0.0));
        registry.player_mut(&id).unwrap().move_intent = Vec3::ground(1.0, 0.0);

        move_players(&mut registry, 5.0, Some(10.0), 1.0);
        assert_approx_eq!(registry.player(&id).unwrap().position.x, 10.0);
    }

    #[test]
    fn test_full_hp_enemy_moves_at_half_speed() {
        let (mut registry, _) = registry_with_player(Vec3::ground(0.0, 100.0));
        let enemy_id = registry.allocate_id();
        registry.insert_enemy(Enemy::new(enemy_id, Vec3::ZERO, 100, 100));

        move_enemies(&mut registry, 5.0, 1.0);
        assert_approx_eq!(registry.enemy(&enemy_id).unwrap().position.z, 2.5);
    }

    #[test]
    fn test_empty_hp_ratio_enemy_moves_fast() {
        let (mut registry, _) = registry_with_player(Vec3::ground(0.0, 100.0));
        let enemy_id = registry.allocate_id();
        registry.insert_enemy(Enemy::new(enemy_id, Vec3::ZERO, 0, 100));

        move_enemies(&mut registry, 5.0, 1.0);
        assert_approx_eq!(registry.enemy(&enemy_id).unwrap().position.z, 7.5);
    }

    #[test]
    fn test_enemy_does_not_overshoot_target() {
        let (mut registry, _) = registry_with_player(Vec3::ground(1.0, 0.0));
        let enemy_id = registry.allocate_id();
        registry.insert_enemy(Enemy::new(enemy_id, Vec3::ZERO, 10, 100));

        move_enemies(&mut registry, 50.0, 1.0);
        assert_eq!(registry.enemy(&enemy_id).unwrap().position, Vec3::ground(1.0, 0.0));
    }

    #[test]
    fn test_enemy_idles_without_targets() {
        let mut registry = Registry::new();
        let enemy_id = registry.allocate_id();
        registry.insert_enemy(Enemy::new(enemy_id, Vec3::ground(4.0, 4.0), 10, 100));

        move_enemies(&mut registry, 5.0, 1.0);
        assert_eq!(registry.enemy(&enemy_id).unwrap().position, Vec3::ground(4.0, 4.0));
    }

    #[test]
    fn test_facing_follows_intent() {
        let facing = facing_from_intent(&Vec3::ground(1.0, 1.0), &Vec3::FORWARD);
        assert_approx_eq!(facing.magnitude(), 1.0);
        assert_approx_eq!(facing.x, facing.z);

        assert_eq!(facing_from_intent(&Vec3::ZERO, &Vec3::FORWARD), Vec3::FORWARD);
    }
}
