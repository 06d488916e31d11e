mod math;

pub use math::{lerp, Vec3};

use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 2;
/// Largest payload a single UDP datagram can carry.
pub const MAX_PACKET_SIZE: usize = 65_507;

pub const PLAYER_RADIUS: f32 = 0.5;
pub const ENEMY_RADIUS: f32 = 0.5;

pub type EntityId = u32;
pub type ClientId = u32;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
        join_code: String,
    },
    Input {
        sequence: u32,
        move_x: f32,
        move_z: f32,
        /// Pointer aim as a yaw around +Y, zero facing +Z. `None` lets movement steer.
        aim_yaw: Option<f32>,
    },
    Attack {
        sequence: u32,
    },
    Respawn,
    Disconnect,

    Connected {
        client_id: ClientId,
        entity_id: EntityId,
        join_code: String,
    },
    Snapshot {
        tick: u32,
        players: Vec<PlayerSnapshot>,
        enemies: Vec<EnemySnapshot>,
    },
    Events {
        tick: u32,
        events: Vec<GameEvent>,
    },
    Disconnected {
        reason: String,
    },
}

/// Display colour with components in `[0, 1]`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const RED: Rgb = Rgb {
        r: 1.0,
        g: 0.0,
        b: 0.0,
    };
    pub const PURPLE: Rgb = Rgb {
        r: 0.5,
        g: 0.0,
        b: 0.5,
    };
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn lerp(&self, other: &Rgb, t: f32) -> Rgb {
        Rgb {
            r: lerp(self.r, other.r, t),
            g: lerp(self.g, other.g, t),
            b: lerp(self.b, other.b, t),
        }
    }
}

/// `current / max`, or zero when `max` is not positive.
pub fn hp_ratio(current_hp: i32, max_hp: i32) -> f32 {
    if max_hp <= 0 {
        return 0.0;
    }
    current_hp as f32 / max_hp as f32
}

/// Hostile tint: purple when nearly dead, red at full display HP.
pub fn enemy_color(current_hp: i32, max_hp_display: i32) -> Rgb {
    Rgb::PURPLE.lerp(&Rgb::RED, hp_ratio(current_hp, max_hp_display))
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Enemy,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: EntityId,
    pub owner: ClientId,
    pub position: Vec3,
    pub facing: Vec3,
    pub current_hp: i32,
    pub max_hp: i32,
    pub is_dead: bool,
    pub color: Rgb,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EnemySnapshot {
    pub id: EntityId,
    pub position: Vec3,
    pub current_hp: i32,
    pub max_hp_display: i32,
}

impl EnemySnapshot {
    pub fn color(&self) -> Rgb {
        enemy_color(self.current_hp, self.max_hp_display)
    }
}

/// State-change notifications produced by the authority, in commit order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum GameEvent {
    Spawned {
        entity: EntityId,
        kind: EntityKind,
        position: Vec3,
        current_hp: i32,
        max_hp: i32,
    },
    HpChanged {
        entity: EntityId,
        current_hp: i32,
        max_hp: i32,
    },
    Died {
        entity: EntityId,
    },
    Respawned {
        entity: EntityId,
        position: Vec3,
        current_hp: i32,
    },
    /// Hostile killed; carries the position for the debris burst.
    Destroyed {
        entity: EntityId,
        position: Vec3,
    },
    HitPulse {
        entity: EntityId,
        attacker: EntityId,
    },
    /// Removed without dying (disconnect, cleanup policy).
    Despawned {
        entity: EntityId,
    },
}

impl GameEvent {
    pub fn entity(&self) -> EntityId {
        match self {
            GameEvent::Spawned { entity, .. }
            | GameEvent::HpChanged { entity, .. }
            | GameEvent::Died { entity }
            | GameEvent::Respawned { entity, .. }
            | GameEvent::Destroyed { entity, .. }
            | GameEvent::HitPulse { entity, .. }
            | GameEvent::Despawned { entity } => *entity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputState {
    pub sequence: u32,
    pub move_x: f32,
    pub move_z: f32,
    pub aim_yaw: Option<f32>,
}

impl InputState {
    pub fn idle(sequence: u32) -> Self {
        Self {
            sequence,
            move_x: 0.0,
            move_z: 0.0,
            aim_yaw: None,
        }
    }

    /// Facing requested by the pointer, if any. Non-finite yaws are ignored.
    pub fn aim_direction(&self) -> Option<Vec3> {
        self.aim_yaw
            .filter(|yaw| yaw.is_finite())
            .map(Vec3::from_yaw)
    }

    /// Movement axes on the ground plane, each clamped to `[-1, 1]`.
    pub fn axes(&self) -> Vec3 {
        let clamp = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        Vec3::ground(clamp(self.move_x), clamp(self.move_z))
    }
}
