use crate::config::CombatStats;
use shared::{
    hp_ratio, ClientId, EnemySnapshot, EntityId, PlayerSnapshot, Rgb, Vec3, ENEMY_RADIUS,
    PLAYER_RADIUS,
};

/// A connected player's avatar.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: EntityId,
    pub owner: ClientId,
    pub position: Vec3,
    /// Unit vector on the ground plane; the centre of the attack fan.
    pub facing: Vec3,
    pub move_intent: Vec3,
    pub current_hp: i32,
    pub is_dead: bool,
    pub color: Rgb,
    pub stats: CombatStats,
    /// Simulation-clock time of the last accepted attack.
    pub last_attack_at: Option<f64>,
}

impl Player {
    pub fn new(id: EntityId, owner: ClientId, position: Vec3, color: Rgb, stats: CombatStats) -> Self {
        Self {
            id,
            owner,
            position,
            facing: Vec3::FORWARD,
            move_intent: Vec3::ZERO,
            current_hp: stats.max_hp,
            is_dead: false,
            color,
            stats,
            last_attack_at: None,
        }
    }

    pub fn max_hp(&self) -> i32 {
        self.stats.max_hp
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead && self.current_hp > 0
    }

    pub fn can_attack(&self, now: f64) -> bool {
        match self.last_attack_at {
            Some(last) => now - last >= self.stats.attack_cooldown as f64,
            None => true,
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            owner: self.owner,
            position: self.position,
            facing: self.facing,
            current_hp: self.current_hp,
            max_hp: self.max_hp(),
            is_dead: self.is_dead,
            color: self.color,
        }
    }
}

/// A hostile. Removed from the registry on death; there is no dead state.
#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: EntityId,
    pub position: Vec3,
    pub current_hp: i32,
    /// Global configured bound, not this hostile's rolled HP.
    pub max_hp_display: i32,
}

impl Enemy {
    pub fn new(id: EntityId, position: Vec3, hp: i32, max_hp_display: i32) -> Self {
        Self {
            id,
            position,
            current_hp: hp,
            max_hp_display,
        }
    }

    pub fn hp_ratio(&self) -> f32 {
        hp_ratio(self.current_hp, self.max_hp_display)
    }

    pub fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            position: self.position,
            current_hp: self.current_hp,
            max_hp_display: self.max_hp_display,
        }
    }
}

/// Whether two bodies of the given radii touch.
pub fn in_contact(a: &Vec3, a_radius: f32, b: &Vec3, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a.distance_squared(b) <= reach * reach
}

pub fn enemy_touches_player(enemy: &Enemy, player: &Player) -> bool {
    in_contact(&enemy.position, ENEMY_RADIUS, &player.position, PLAYER_RADIUS)
}

pub fn enemies_touch(a: &Enemy, b: &Enemy) -> bool {
    in_contact(&a.position, ENEMY_RADIUS, &b.position, ENEMY_RADIUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_creation() {
        let player = Player::new(7, 3, Vec3::ground(1.0, 2.0), Rgb::WHITE, CombatStats::default());
        assert_eq!(player.id, 7);
        assert_eq!(player.owner, 3);
        assert_eq!(player.current_hp, 100);
        assert_eq!(player.facing, Vec3::FORWARD);
        assert!(player.is_alive());
        assert!(player.can_attack(0.0));
    }

    #[test]
    fn test_attack_cooldown_window() {
        let mut player = Player::new(1, 1, Vec3::ZERO, Rgb::WHITE, CombatStats::default());
        player.last_attack_at = Some(1.0);

        assert!(!player.can_attack(1.2));
        assert!(player.can_attack(1.5));
        assert!(player.can_attack(3.0));
    }

    #[test]
    fn test_contact_boundary() {
        let a = Vec3::ground(0.0, 0.0);
        let b = Vec3::ground(1.0, 0.0);
        assert!(in_contact(&a, 0.5, &b, 0.5));
        assert!(!in_contact(&a, 0.4, &b, 0.5));
    }

    #[test]
    fn test_enemy_snapshot() {
        let enemy = Enemy::new(4, Vec3::ground(2.0, 3.0), 25, 100);
        let snapshot = enemy.snapshot();
        assert_eq!(snapshot.current_hp, 25);
        assert_eq!(snapshot.max_hp_display, 100);
        assert_eq!(enemy.hp_ratio(), 0.25);
    }
}
