//! Authoritative record of every live entity.
//!
//! Players and hostiles share one id space. Ids come from a monotonically
//! increasing counter and are never reused, so a stale request naming a removed
//! entity can never land on a newer one.

use crate::entity::{Enemy, Player};
use shared::{ClientId, EntityId, Vec3};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Registry {
    next_id: EntityId,
    players: BTreeMap<EntityId, Player>,
    enemies: BTreeMap<EntityId, Enemy>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            players: BTreeMap::new(),
            enemies: BTreeMap::new(),
        }
    }

    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert_player(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    pub fn insert_enemy(&mut self, enemy: Enemy) {
        self.enemies.insert(enemy.id, enemy);
    }

    pub fn remove_player(&mut self, id: &EntityId) -> Option<Player> {
        self.players.remove(id)
    }

    pub fn remove_enemy(&mut self, id: &EntityId) -> Option<Enemy> {
        self.enemies.remove(id)
    }

    pub fn player(&self, id: &EntityId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: &EntityId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn enemy(&self, id: &EntityId) -> Option<&Enemy> {
        self.enemies.get(id)
    }

    pub fn enemy_mut(&mut self, id: &EntityId) -> Option<&mut Enemy> {
        self.enemies.get_mut(id)
    }

    pub fn player_id_by_owner(&self, owner: &ClientId) -> Option<EntityId> {
        self.players
            .values()
            .find(|player| player.owner == *owner)
            .map(|player| player.id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    pub fn enemies(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.values()
    }

    pub fn enemies_mut(&mut self) -> impl Iterator<Item = &mut Enemy> {
        self.enemies.values_mut()
    }

    pub fn enemy_ids(&self) -> Vec<EntityId> {
        self.enemies.keys().copied().collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn enemy_count(&self) -> usize {
        self.enemies.len()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.players.contains_key(id) || self.enemies.contains_key(id)
    }

    /// Position of a live, damageable entity: any hostile, or a player that is alive.
    pub fn damageable_position(&self, id: &EntityId) -> Option<Vec3> {
        if let Some(enemy) = self.enemies.get(id) {
            return Some(enemy.position);
        }
        self.players
            .get(id)
            .filter(|player| player.is_alive())
            .map(|player| player.position)
    }

    /// Centroid of every connected player, dead or alive; the origin when empty.
    pub fn player_centroid(&self) -> Vec3 {
        if self.players.is_empty() {
            return Vec3::ZERO;
        }
        let sum = self
            .players
            .values()
            .fold(Vec3::ZERO, |acc, player| acc.add(&player.position));
        sum.scale(1.0 / self.players.len() as f32)
    }

    /// Nearest alive player by squared distance.
    pub fn nearest_alive_player(&self, from: &Vec3) -> Option<(EntityId, Vec3)> {
        let mut best: Option<(EntityId, Vec3)> = None;
        let mut min_dist = f32::MAX;

        for player in self.players.values().filter(|p| p.is_alive()) {
            let d = player.position.distance_squared(from);
            if d < min_dist {
                min_dist = d;
                best = Some((player.id, player.position));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CombatStats;
    use shared::Rgb;

    fn add_player(registry: &mut Registry, owner: ClientId, position: Vec3) -> EntityId {
        let id = registry.allocate_id();
        registry.insert_player(Player::new(
            id,
            owner,
            position,
            Rgb::WHITE,
            CombatStats::default(),
        ));
        id
    }

    #[test]
    fn test_ids_are_unique_and_not_reused() {
        let mut registry = Registry::new();
        let a = add_player(&mut registry, 1, Vec3::ZERO);
        registry.remove_player(&a);
        let b = add_player(&mut registry, 2, Vec3::ZERO);
        assert_ne!(a, b);
        assert_eq!(registry.player_count(), 1);
    }

    #[test]
    fn test_centroid_empty_is_origin() {
        let registry = Registry::new();
        assert_eq!(registry.player_centroid(), Vec3::ZERO);
    }

    #[test]
    fn test_centroid_of_players() {
        let mut registry = Registry::new();
        add_player(&mut registry, 1, Vec3::ground(2.0, 0.0));
        add_player(&mut registry, 2, Vec3::ground(0.0, 4.0));
        assert_eq!(registry.player_centroid(), Vec3::ground(1.0, 2.0));
    }

    #[test]
    fn test_nearest_alive_player_skips_dead() {
        let mut registry = Registry::new();
        let near = add_player(&mut registry, 1, Vec3::ground(1.0, 0.0));
        let far = add_player(&mut registry, 2, Vec3::ground(10.0, 0.0));

        let origin = Vec3::ZERO;
        assert_eq!(registry.nearest_alive_player(&origin).map(|(id, _)| id), Some(near));

        let player = registry.player_mut(&near).unwrap();
        player.current_hp = 0;
        player.is_dead = true;
        assert_eq!(registry.nearest_alive_player(&origin).map(|(id, _)| id), Some(far));
    }

    #[test]
    fn test_lookup_by_owner() {
        let mut registry = Registry::new();
        let id = add_player(&mut registry, 42, Vec3::ZERO);
        assert_eq!(registry.player_id_by_owner(&42), Some(id));
        assert_eq!(registry.player_id_by_owner(&7), None);
    }

    #[test]
    fn test_damageable_position() {
        let mut registry = Registry::new();
        let player = add_player(&mut registry, 1, Vec3::ground(3.0, 0.0));
        let enemy_id = registry.allocate_id();
        registry.insert_enemy(Enemy::new(enemy_id, Vec3::ground(5.0, 5.0), 50, 100));

        assert_eq!(registry.damageable_position(&enemy_id), Some(Vec3::ground(5.0, 5.0)));
        assert_eq!(registry.damageable_position(&player), Some(Vec3::ground(3.0, 0.0)));

        registry.player_mut(&player).unwrap().is_dead = true;
        assert_eq!(registry.damageable_position(&player), None);
        assert_eq!(registry.damageable_position(&999), None);
    }
}
