//! Read-only replica of the server's world
//!
//! The mirror never simulates anything. Snapshots replace its contents
//! wholesale and event batches patch it between snapshots, so health bars and
//! removals show up as soon as the server reports them.

use log::debug;
use shared::{
    ClientId, EnemySnapshot, EntityId, EntityKind, GameEvent, PlayerSnapshot, Rgb,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct Mirror {
    tick: Option<u32>,
    local_client: Option<ClientId>,
    local_entity: Option<EntityId>,
    players: BTreeMap<EntityId, PlayerSnapshot>,
    enemies: BTreeMap<EntityId, EnemySnapshot>,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_local(&mut self, client_id: ClientId, entity_id: EntityId) {
        self.local_client = Some(client_id);
        self.local_entity = Some(entity_id);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn tick(&self) -> Option<u32> {
        self.tick
    }

    pub fn local_entity(&self) -> Option<EntityId> {
        self.local_entity
    }

    fn is_stale(&self, tick: u32) -> bool {
        matches!(self.tick, Some(current) if tick < current)
    }

    /// Replaces the world with a snapshot. Older snapshots than the last one
    /// applied are ignored; returns whether it was applied.
    pub fn apply_snapshot(
        &mut self,
        tick: u32,
        players: Vec<PlayerSnapshot>,
        enemies: Vec<EnemySnapshot>,
    ) -> bool {
        if self.is_stale(tick) {
            debug!("Ignoring stale snapshot {} (have {:?})", tick, self.tick);
            return false;
        }

        self.tick = Some(tick);
        self.players = players.into_iter().map(|p| (p.id, p)).collect();
        self.enemies = enemies.into_iter().map(|e| (e.id, e)).collect();

        // Entity ids can change across a reconnect; the owner cannot.
        if let Some(owner) = self.local_client {
            if let Some(player) = self.players.values().find(|p| p.owner == owner) {
                self.local_entity = Some(player.id);
            }
        }
        true
    }

    /// Applies an event batch for `tick`. Batches older than the current
    /// snapshot are already reflected in it and are skipped.
    pub fn apply_events(&mut self, tick: u32, events: &[GameEvent]) -> bool {
        if self.is_stale(tick) {
            return false;
        }
        for event in events {
            self.apply_event(event);
        }
        true
    }

    fn apply_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::Spawned {
                entity,
                kind: EntityKind::Enemy,
                position,
                current_hp,
                max_hp,
            } => {
                self.enemies.entry(*entity).or_insert(EnemySnapshot {
                    id: *entity,
                    position: *position,
                    current_hp: *current_hp,
                    max_hp_display: *max_hp,
                });
            }
            // Owner and colour only arrive with the next snapshot.
            GameEvent::Spawned {
                kind: EntityKind::Player,
                ..
            } => {}
            GameEvent::HpChanged {
                entity,
                current_hp,
                max_hp,
            } => {
                if let Some(enemy) = self.enemies.get_mut(entity) {
                    enemy.current_hp = *current_hp;
                } else if let Some(player) = self.players.get_mut(entity) {
                    player.current_hp = *current_hp;
                    player.max_hp = *max_hp;
                }
            }
            GameEvent::Died { entity } => {
                if let Some(player) = self.players.get_mut(entity) {
                    player.current_hp = 0;
                    player.is_dead = true;
                }
            }
            GameEvent::Respawned {
                entity,
                position,
                current_hp,
            } => {
                if let Some(player) = self.players.get_mut(entity) {
                    player.position = *position;
                    player.current_hp = *current_hp;
                    player.max_hp = player.max_hp.max(*current_hp);
                    player.is_dead = false;
                }
            }
            GameEvent::Destroyed { entity, .. } | GameEvent::Despawned { entity } => {
                self.enemies.remove(entity);
                self.players.remove(entity);
            }
            GameEvent::HitPulse { .. } => {}
        }
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerSnapshot> {
        self.players.values()
    }

    pub fn enemies(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.enemies.values()
    }

    pub fn player(&self, id: &EntityId) -> Option<&PlayerSnapshot> {
        self.players.get(id)
    }

    pub fn enemy(&self, id: &EntityId) -> Option<&EnemySnapshot> {
        self.enemies.get(id)
    }

    pub fn local_player(&self) -> Option<&PlayerSnapshot> {
        self.local_entity.and_then(|id| self.players.get(&id))
    }

    pub fn is_local_dead(&self) -> bool {
        self.local_player().map_or(false, |player| player.is_dead)
    }

    /// Display colour of any mirrored entity before effects are applied.
    pub fn base_color(&self, id: &EntityId) -> Option<Rgb> {
        if let Some(enemy) = self.enemies.get(id) {
            return Some(enemy.color());
        }
        self.players.get(id).map(|player| player.color)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn enemy_count(&self) -> usize {
        self.enemies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Vec3;

    fn player(id: EntityId, owner: ClientId, hp: i32) -> PlayerSnapshot {
        PlayerSnapshot {
            id,
            owner,
            position: Vec3::ZERO,
            facing: Vec3::FORWARD,
            current_hp: hp,
            max_hp: 100,
            is_dead: hp == 0,
            color: Rgb::new(0.2, 0.4, 0.6),
        }
    }

    fn enemy(id: EntityId, hp: i32) -> EnemySnapshot {
        EnemySnapshot {
            id,
            position: Vec3::ground(5.0, 5.0),
            current_hp: hp,
            max_hp_display: 100,
        }
    }

    #[test]
    fn test_snapshot_replaces_world() {
        let mut mirror = Mirror::new();
        mirror.apply_snapshot(1, vec![player(1, 1, 100)], vec![enemy(2, 50)]);
        mirror.apply_snapshot(2, vec![player(1, 1, 90)], vec![]);

        assert_eq!(mirror.tick(), Some(2));
        assert_eq!(mirror.player(&1).unwrap().current_hp, 90);
        assert_eq!(mirror.enemy_count(), 0);
    }

    #[test]
    fn test_older_snapshot_ignored() {
        let mut mirror = Mirror::new();
        assert!(mirror.apply_snapshot(5, vec![player(1, 1, 80)], vec![]));
        assert!(!mirror.apply_snapshot(4, vec![player(1, 1, 100)], vec![]));
        assert_eq!(mirror.player(&1).unwrap().current_hp, 80);
    }

    #[test]
    fn test_events_patch_between_snapshots() {
        let mut mirror = Mirror::new();
        mirror.apply_snapshot(1, vec![player(1, 1, 100)], vec![enemy(2, 50)]);

        mirror.apply_events(
            2,
            &[
                GameEvent::HpChanged {
                    entity: 2,
                    current_hp: 30,
                    max_hp: 100,
                },
                GameEvent::Spawned {
                    entity: 3,
                    kind: EntityKind::Enemy,
                    position: Vec3::ground(1.0, 1.0),
                    current_hp: 70,
                    max_hp: 100,
                },
            ],
        );

        assert_eq!(mirror.enemy(&2).unwrap().current_hp, 30);
        assert_eq!(mirror.enemy(&3).unwrap().current_hp, 70);
    }

    #[test]
    fn test_destroyed_enemy_removed() {
        let mut mirror = Mirror::new();
        mirror.apply_snapshot(1, vec![], vec![enemy(2, 10)]);
        mirror.apply_events(
            2,
            &[GameEvent::Destroyed {
                entity: 2,
                position: Vec3::ground(5.0, 5.0),
            }],
        );
        assert!(mirror.enemy(&2).is_none());
    }

    #[test]
    fn test_local_death_and_respawn() {
        let mut mirror = Mirror::new();
        mirror.set_local(1, 4);
        mirror.apply_snapshot(1, vec![player(4, 1, 20)], vec![]);
        assert!(!mirror.is_local_dead());

        mirror.apply_events(2, &[GameEvent::Died { entity: 4 }]);
        assert!(mirror.is_local_dead());
        assert_eq!(mirror.local_player().unwrap().current_hp, 0);

        mirror.apply_events(
            3,
            &[GameEvent::Respawned {
                entity: 4,
                position: Vec3::ground(1.0, 2.0),
                current_hp: 100,
            }],
        );
        let local = mirror.local_player().unwrap();
        assert!(!local.is_dead);
        assert_eq!(local.current_hp, 100);
        assert_eq!(local.position, Vec3::ground(1.0, 2.0));
    }

    #[test]
    fn test_local_entity_follows_owner() {
        let mut mirror = Mirror::new();
        mirror.set_local(7, 1);
        mirror.apply_snapshot(1, vec![player(9, 7, 100)], vec![]);
        assert_eq!(mirror.local_entity(), Some(9));
    }

    #[test]
    fn test_stale_events_skipped() {
        let mut mirror = Mirror::new();
        mirror.apply_snapshot(10, vec![], vec![enemy(2, 50)]);
        assert!(!mirror.apply_events(
            9,
            &[GameEvent::Despawned { entity: 2 }]
        ));
        assert!(mirror.enemy(&2).is_some());
    }
}
