//! The authoritative game state and its per-tick simulation.
//!
//! Every gameplay mutation goes through [`GameState`]: requests from clients
//! (`apply_input`, `request_attack`, `request_respawn`) are handled as they
//! arrive, and [`GameState::tick`] advances spawning, movement and contact
//! damage by an explicit `dt`. Observers are notified synchronously after each
//! committed change.

use crate::combat::{self, ContactTracker, DamageOutcome};
use crate::config::{ServerConfig, StatsSource};
use crate::entity::Player;
use crate::events::{EventQueue, GameObserver};
use crate::movement;
use crate::registry::Registry;
use crate::spawner::{self, Spawner};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::Rng;
use shared::{
    ClientId, EnemySnapshot, EntityId, EntityKind, GameEvent, InputState, PlayerSnapshot, Rgb,
    Vec3,
};

pub struct GameState<O: GameObserver = EventQueue> {
    pub tick: u32,
    /// Simulation clock in seconds, the sum of every `dt` ticked so far.
    clock: f64,
    config: ServerConfig,
    registry: Registry,
    spawner: Spawner,
    contacts: ContactTracker,
    stats_source: Box<dyn StatsSource>,
    rng: StdRng,
    observer: O,
}

impl<O: GameObserver> GameState<O> {
    pub fn new(
        config: ServerConfig,
        stats_source: Box<dyn StatsSource>,
        rng: StdRng,
        observer: O,
    ) -> Self {
        Self {
            tick: 0,
            clock: 0.0,
            spawner: Spawner::new(config.spawner.clone()),
            config,
            registry: Registry::new(),
            contacts: ContactTracker::new(),
            stats_source,
            rng,
            observer,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Creates the avatar for a client whose handshake just completed.
    pub fn add_player(&mut self, owner: ClientId) -> EntityId {
        if let Some(existing) = self.registry.player_id_by_owner(&owner) {
            return existing;
        }

        let stats = self.stats_source.load_stats();
        let color = Rgb::new(self.rng.gen(), self.rng.gen(), self.rng.gen());
        let position = self.config.player.spawn_point;
        let id = self.registry.allocate_id();
        let player = Player::new(id, owner, position, color, stats);
        let max_hp = player.max_hp();
        self.registry.insert_player(player);

        info!(
            "Added player {} for client {} at ({:.1}, {:.1})",
            id, owner, position.x, position.z
        );
        self.observer.notify(GameEvent::Spawned {
            entity: id,
            kind: EntityKind::Player,
            position,
            current_hp: max_hp,
            max_hp,
        });
        id
    }

    /// Removes a client's avatar when its connection ends.
    pub fn remove_player(&mut self, owner: &ClientId) -> bool {
        let Some(id) = self.registry.player_id_by_owner(owner) else {
            return false;
        };
        self.registry.remove_player(&id);
        info!("Removed player {} (client {})", id, owner);
        self.observer.notify(GameEvent::Despawned { entity: id });
        true
    }

    /// Stores a movement request. Dead or unknown players are ignored.
    ///
    /// Facing follows the pointer aim when one is given, else the movement direction.
    pub fn apply_input(&mut self, owner: ClientId, input: &InputState) -> bool {
        let Some(id) = self.registry.player_id_by_owner(&owner) else {
            return false;
        };
        let Some(player) = self.registry.player_mut(&id) else {
            return false;
        };
        if !player.is_alive() {
            return false;
        }

        let intent = input.axes();
        player.facing = input
            .aim_direction()
            .unwrap_or_else(|| movement::facing_from_intent(&intent, &player.facing));
        player.move_intent = intent;
        true
    }

    /// Handles an attack trigger. `None` when rejected (unknown, dead, on cooldown);
    /// otherwise the ids that were hit.
    pub fn request_attack(&mut self, owner: ClientId) -> Option<Vec<EntityId>> {
        let id = self.registry.player_id_by_owner(&owner)?;
        let now = self.clock;
        let player = self.registry.player_mut(&id)?;
        if !player.is_alive() || !player.can_attack(now) {
            debug!("Attack from client {} rejected", owner);
            return None;
        }
        player.last_attack_at = Some(now);

        let hits = combat::resolve_attack(&mut self.registry, id, &mut self.observer);
        debug!("Player {} attacked, {} hit(s)", id, hits.len());
        Some(hits)
    }

    /// Brings a dead player back: fresh stats, full HP, spawn point.
    /// Requests for alive or unknown players are ignored.
    pub fn request_respawn(&mut self, owner: ClientId) -> bool {
        let Some(id) = self.registry.player_id_by_owner(&owner) else {
            return false;
        };
        if self.registry.player(&id).map_or(true, |player| !player.is_dead) {
            debug!("Respawn from client {} ignored, player is alive", owner);
            return false;
        }

        let stats = self.stats_source.load_stats();
        let spawn_point = self.config.player.spawn_point;
        let Some(player) = self.registry.player_mut(&id) else {
            return false;
        };

        player.stats = stats;
        player.current_hp = player.stats.max_hp;
        player.is_dead = false;
        player.position = spawn_point;
        player.move_intent = Vec3::ZERO;
        player.last_attack_at = None;
        let current_hp = player.current_hp;

        info!("Player {} (client {}) respawned", id, owner);
        self.observer.notify(GameEvent::Respawned {
            entity: id,
            position: spawn_point,
            current_hp,
        });
        true
    }

    pub fn apply_damage(&mut self, target: EntityId, amount: i32) -> DamageOutcome {
        combat::apply_damage(&mut self.registry, target, amount, &mut self.observer)
    }

    /// Places a hostile directly, bypassing the spawn timer.
    pub fn spawn_enemy(&mut self, position: Vec3, hp: i32) -> EntityId {
        spawner::spawn_enemy(
            &mut self.registry,
            position,
            hp,
            self.config.spawner.max_hp,
            &mut self.observer,
        )
    }

    /// Advances the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        self.spawner
            .update(dt, &mut self.registry, &mut self.rng, &mut self.observer);

        movement::move_players(
            &mut self.registry,
            self.config.player.speed,
            self.config.player.arena_radius,
            dt,
        );
        movement::move_enemies(&mut self.registry, self.config.enemy.base_speed, dt);

        self.contacts.resolve(
            &mut self.registry,
            self.config.enemy.base_damage,
            self.config.enemy.contact_damages_enemies,
            &mut self.observer,
        );

        self.despawn_stray_enemies();

        self.clock += dt as f64;
        self.tick = self.tick.wrapping_add(1);
    }

    /// Removes hostiles farther than the configured distance from every player.
    fn despawn_stray_enemies(&mut self) {
        let Some(limit) = self.config.enemy.despawn_distance else {
            return;
        };
        if self.registry.player_count() == 0 {
            return;
        }

        let limit_squared = limit * limit;
        let stray: Vec<EntityId> = self
            .registry
            .enemies()
            .filter(|enemy| {
                self.registry
                    .players()
                    .all(|player| player.position.distance_squared(&enemy.position) > limit_squared)
            })
            .map(|enemy| enemy.id)
            .collect();

        for id in stray {
            self.registry.remove_enemy(&id);
            debug!("Despawned stray enemy {}", id);
            self.observer.notify(GameEvent::Despawned { entity: id });
        }
    }

    pub fn player_snapshots(&self) -> Vec<PlayerSnapshot> {
        self.registry.players().map(Player::snapshot).collect()
    }

    pub fn enemy_snapshots(&self) -> Vec<EnemySnapshot> {
        self.registry.enemies().map(|enemy| enemy.snapshot()).collect()
    }

    pub fn player_id(&self, owner: &ClientId) -> Option<EntityId> {
        self.registry.player_id_by_owner(owner)
    }

    pub fn player(&self, owner: &ClientId) -> Option<&Player> {
        self.registry
            .player_id_by_owner(owner)
            .and_then(|id| self.registry.player(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CombatStats;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    fn quiet_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        // Keep the spawner out of the way unless a test wants it.
        config.spawner.spawn_interval = 1.0e9;
        config.player.spawn_point = Vec3::ground(0.0, 0.0);
        config
    }

    fn game_with(config: ServerConfig) -> GameState {
        GameState::new(
            config,
            Box::new(CombatStats::default()),
            StdRng::seed_from_u64(42),
            EventQueue::new(),
        )
    }

    /// Returns a different max HP every time it is read.
    struct TunableStats {
        max_hp: Arc<AtomicI32>,
    }

    impl StatsSource for TunableStats {
        fn load_stats(&self) -> CombatStats {
            CombatStats {
                max_hp: self.max_hp.load(Ordering::SeqCst),
                ..CombatStats::default()
            }
        }
    }

    #[test]
    fn test_add_player_emits_spawned() {
        let mut game = game_with(quiet_config());
        let id = game.add_player(1);

        assert_eq!(game.player_id(&1), Some(id));
        match &game.observer().events()[0] {
            GameEvent::Spawned { entity, kind, current_hp, .. } => {
                assert_eq!(*entity, id);
                assert_eq!(*kind, EntityKind::Player);
                assert_eq!(*current_hp, 100);
            }
            other => panic!("Unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_add_player_twice_keeps_one_avatar() {
        let mut game = game_with(quiet_config());
        let first = game.add_player(1);
        let second = game.add_player(1);
        assert_eq!(first, second);
        assert_eq!(game.registry().player_count(), 1);
    }

    #[test]
    fn test_remove_player_emits_despawned() {
        let mut game = game_with(quiet_config());
        let id = game.add_player(5);
        game.observer_mut().drain();

        assert!(game.remove_player(&5));
        assert!(!game.remove_player(&5));
        assert_eq!(game.observer().events(), &[GameEvent::Despawned { entity: id }]);
    }

    #[test]
    fn test_input_moves_player_on_tick() {
        let mut game = game_with(quiet_config());
        game.add_player(1);
        game.apply_input(
            1,
            &InputState {
                sequence: 1,
                move_x: 1.0,
                move_z: 0.0,
                aim_yaw: None,
            },
        );

        game.tick(0.1);
        let player = game.player(&1).unwrap();
        assert!((player.position.x - 0.5).abs() < 1e-5);
        assert_eq!(player.facing, Vec3::ground(1.0, 0.0));
    }

    #[test]
    fn test_stationary_player_turns_to_aim_and_hits_behind() {
        let mut config = quiet_config();
        config.enemy.base_speed = 0.0;
        let mut game = game_with(config);
        game.add_player(1);
        let behind = game.spawn_enemy(Vec3::ground(0.0, -2.0), 50);

        assert_eq!(game.request_attack(1), Some(vec![]));
        game.tick(0.5);

        let mut aim = InputState::idle(1);
        aim.aim_yaw = Some(std::f32::consts::PI);
        assert!(game.apply_input(1, &aim));

        let player = game.player(&1).unwrap();
        assert_eq!(player.position, Vec3::ZERO);
        assert!(player.facing.z < -0.99);

        assert_eq!(game.request_attack(1), Some(vec![behind]));
        assert_eq!(game.registry().enemy(&behind).unwrap().current_hp, 30);
    }

    #[test]
    fn test_aim_overrides_movement_facing() {
        let mut game = game_with(quiet_config());
        game.add_player(1);
        game.apply_input(
            1,
            &InputState {
                sequence: 1,
                move_x: 1.0,
                move_z: 0.0,
                aim_yaw: Some(0.0),
            },
        );
        assert_eq!(game.player(&1).unwrap().facing, Vec3::FORWARD);

        game.apply_input(
            1,
            &InputState {
                sequence: 2,
                move_x: 1.0,
                move_z: 0.0,
                aim_yaw: None,
            },
        );
        assert_eq!(game.player(&1).unwrap().facing, Vec3::ground(1.0, 0.0));
    }

    #[test]
    fn test_attack_cooldown_uses_simulation_clock() {
        let mut game = game_with(quiet_config());
        game.add_player(1);

        assert!(game.request_attack(1).is_some());
        assert!(game.request_attack(1).is_none());

        game.tick(0.25);
        assert!(game.request_attack(1).is_none());

        game.tick(0.25);
        assert!(game.request_attack(1).is_some());
    }

    #[test]
    fn test_attack_from_unknown_client_rejected() {
        let mut game = game_with(quiet_config());
        assert!(game.request_attack(99).is_none());
        assert!(!game.request_respawn(99));
        assert!(!game.apply_input(99, &InputState::idle(1)));
    }

    #[test]
    fn test_attack_damages_enemy_in_front() {
        let mut game = game_with(quiet_config());
        game.add_player(1);
        let enemy = game.spawn_enemy(Vec3::ground(0.0, 2.0), 50);

        let hits = game.request_attack(1).unwrap();
        assert_eq!(hits, vec![enemy]);
        assert_eq!(game.registry().enemy(&enemy).unwrap().current_hp, 30);
    }

    #[test]
    fn test_respawn_restores_full_state_atomically() {
        let mut config = quiet_config();
        config.player.spawn_point = Vec3::ground(3.0, -2.0);
        let mut game = game_with(config);
        let id = game.add_player(1);

        game.apply_input(
            1,
            &InputState {
                sequence: 1,
                move_x: 1.0,
                move_z: 1.0,
                aim_yaw: None,
            },
        );
        game.tick(1.0);
        assert_eq!(game.apply_damage(id, 1_000), DamageOutcome::Killed);

        let dead = game.player(&1).unwrap();
        assert!(dead.is_dead);
        assert_eq!(dead.current_hp, 0);
        assert_eq!(dead.move_intent, Vec3::ZERO);

        game.observer_mut().drain();
        assert!(game.request_respawn(1));

        let alive = game.player(&1).unwrap();
        assert_eq!(alive.current_hp, alive.max_hp());
        assert!(!alive.is_dead);
        assert_eq!(alive.position, Vec3::ground(3.0, -2.0));
        assert_eq!(
            game.observer().events(),
            &[GameEvent::Respawned {
                entity: id,
                position: Vec3::ground(3.0, -2.0),
                current_hp: 100
            }]
        );
    }

    #[test]
    fn test_respawn_of_alive_player_is_noop() {
        let mut game = game_with(quiet_config());
        game.add_player(1);
        game.observer_mut().drain();

        assert!(!game.request_respawn(1));
        assert!(game.observer().is_empty());
    }

    #[test]
    fn test_respawn_reloads_stats() {
        let max_hp = Arc::new(AtomicI32::new(100));
        let mut game: GameState = GameState::new(
            quiet_config(),
            Box::new(TunableStats {
                max_hp: Arc::clone(&max_hp),
            }),
            StdRng::seed_from_u64(1),
            EventQueue::new(),
        );
        let id = game.add_player(1);
        game.apply_damage(id, 100);

        max_hp.store(150, Ordering::SeqCst);
        assert!(game.request_respawn(1));
        assert_eq!(game.player(&1).unwrap().current_hp, 150);
        assert_eq!(game.player(&1).unwrap().max_hp(), 150);
    }

    #[test]
    fn test_dead_player_ignores_input_and_attack() {
        let mut game = game_with(quiet_config());
        let id = game.add_player(1);
        game.apply_damage(id, 100);

        assert!(!game.apply_input(1, &InputState::idle(2)));
        assert!(game.request_attack(1).is_none());
    }

    #[test]
    fn test_enemy_chases_and_hits_player() {
        let mut config = quiet_config();
        config.enemy.base_speed = 10.0;
        let mut game = game_with(config);
        let id = game.add_player(1);
        game.spawn_enemy(Vec3::ground(0.0, 3.0), 100);

        for _ in 0..10 {
            game.tick(0.1);
        }

        // One contact entry at ratio 1.0: 2x base damage.
        assert_eq!(game.registry().player(&id).unwrap().current_hp, 80);
    }

    #[test]
    fn test_spawner_runs_inside_tick() {
        let mut config = ServerConfig::default();
        config.spawner.spawn_interval = 0.5;
        let mut game = game_with(config);
        game.add_player(1);

        for _ in 0..4 {
            game.tick(0.25);
        }
        assert_eq!(game.registry().enemy_count(), 2);
    }

    #[test]
    fn test_stray_enemies_despawn_when_configured() {
        let mut config = quiet_config();
        config.enemy.despawn_distance = Some(30.0);
        config.enemy.base_speed = 0.0;
        let mut game = game_with(config);
        game.add_player(1);
        let near = game.spawn_enemy(Vec3::ground(10.0, 0.0), 50);
        let far = game.spawn_enemy(Vec3::ground(100.0, 0.0), 50);

        game.tick(0.016);
        assert!(game.registry().enemy(&near).is_some());
        assert!(game.registry().enemy(&far).is_none());
        assert!(game
            .observer()
            .events()
            .contains(&GameEvent::Despawned { entity: far }));
    }

    #[test]
    fn test_clock_and_tick_advance() {
        let mut game = game_with(quiet_config());
        game.tick(0.5);
        game.tick(0.25);
        assert_eq!(game.tick, 2);
        assert!((game.clock() - 0.75).abs() < 1e-9);
    }
}
