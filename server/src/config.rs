//! Tunable knobs for the authoritative simulation.
//!
//! Two RON files feed the server:
//! - the combat stats file, re-read every time a player is (re)initialised so
//!   values can be tuned while the server is running;
//! - the optional server config, read once at startup.
//!
//! A missing file means compiled-in defaults. A file that cannot be read or
//! parsed is logged and also falls back to defaults.

use crate::error::ConfigError;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::Vec3;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-player combat and health stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatStats {
    pub max_hp: i32,
    pub attack_range: f32,
    /// Full width of the attack fan, in degrees.
    pub attack_angle: f32,
    pub attack_damage: i32,
    /// Seconds between accepted attacks.
    pub attack_cooldown: f32,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            max_hp: 100,
            attack_range: 2.5,
            attack_angle: 90.0,
            attack_damage: 20,
            attack_cooldown: 0.5,
        }
    }
}

impl CombatStats {
    fn sanitized(mut self) -> Self {
        if self.max_hp <= 0 {
            warn!("max_hp must be positive (got {}), using default", self.max_hp);
            self.max_hp = CombatStats::default().max_hp;
        }
        self.attack_range = self.attack_range.max(0.0);
        self.attack_angle = self.attack_angle.clamp(0.0, 360.0);
        self.attack_damage = self.attack_damage.max(0);
        self.attack_cooldown = self.attack_cooldown.max(0.0);
        self
    }
}

/// Where player stats come from when a player is spawned or respawned.
pub trait StatsSource: Send + Sync {
    fn load_stats(&self) -> CombatStats;
}

/// Fixed stats, never reloaded.
impl StatsSource for CombatStats {
    fn load_stats(&self) -> CombatStats {
        self.clone()
    }
}

/// Stats read from a RON file on every load.
#[derive(Debug, Clone)]
pub struct StatsFile {
    path: PathBuf,
}

impl StatsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatsSource for StatsFile {
    fn load_stats(&self) -> CombatStats {
        load_or_default::<CombatStats>(&self.path).sanitized()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Seconds between spawns.
    pub spawn_interval: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub min_hp: i32,
    /// Upper HP bound; also the display maximum every hostile scales against.
    pub max_hp: i32,
    /// Cap on concurrently alive hostiles. `None` means unbounded.
    pub max_enemies: Option<usize>,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            spawn_interval: 2.0,
            min_radius: 10.0,
            max_radius: 20.0,
            min_hp: 10,
            max_hp: 100,
            max_enemies: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub base_speed: f32,
    pub base_damage: i32,
    /// Whether contact between two hostiles damages them.
    pub contact_damages_enemies: bool,
    /// Hostiles farther than this from every player are removed.
    pub despawn_distance: Option<f32>,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            base_speed: 5.0,
            base_damage: 10,
            contact_damages_enemies: true,
            despawn_distance: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub speed: f32,
    pub spawn_point: Vec3,
    /// Players are kept inside this disc around the origin when set.
    pub arena_radius: Option<f32>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            spawn_point: Vec3::ZERO,
            arena_radius: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub spawner: SpawnerConfig,
    pub enemy: EnemyConfig,
    pub player: PlayerConfig,
}

impl ServerConfig {
    /// Loads the config at `path`, or defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(path) => load_or_default::<ServerConfig>(path).sanitized(),
            None => ServerConfig::default(),
        }
    }

    /// Repairs inverted or negative ranges so sampling never panics.
    pub fn sanitized(mut self) -> Self {
        let spawner = &mut self.spawner;
        if spawner.min_radius > spawner.max_radius {
            warn!(
                "Spawner radii inverted ({} > {}), swapping",
                spawner.min_radius, spawner.max_radius
            );
            std::mem::swap(&mut spawner.min_radius, &mut spawner.max_radius);
        }
        spawner.min_radius = spawner.min_radius.max(0.0);
        spawner.max_radius = spawner.max_radius.max(spawner.min_radius);

        if spawner.min_hp > spawner.max_hp {
            warn!(
                "Spawner HP range inverted ({} > {}), swapping",
                spawner.min_hp, spawner.max_hp
            );
            std::mem::swap(&mut spawner.min_hp, &mut spawner.max_hp);
        }
        spawner.min_hp = spawner.min_hp.max(1);
        spawner.max_hp = spawner.max_hp.max(spawner.min_hp);
        spawner.spawn_interval = spawner.spawn_interval.max(0.0);

        self.enemy.base_speed = self.enemy.base_speed.max(0.0);
        self.enemy.base_damage = self.enemy.base_damage.max(0);
        self.player.speed = self.player.speed.max(0.0);
        self
    }
}

/// Reads and parses a RON file.
pub fn load_ron<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(ConfigError::FileNotFound(display));
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: display.clone(),
        source,
    })?;

    ron::from_str::<T>(&contents).map_err(|e| ConfigError::ParseError {
        path: display,
        details: e.to_string(),
    })
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match load_ron::<T>(path) {
        Ok(value) => value,
        Err(ConfigError::FileNotFound(path)) => {
            debug!("{} not found, using defaults", path);
            T::default()
        }
        Err(e) => {
            warn!("{}; using defaults", e);
            T::default()
        }
    }
}
