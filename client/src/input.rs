//! Client input management with sequencing and change detection

use macroquad::prelude::*;
use shared::InputState;
use std::time::{Duration, Instant};

/// Keep-alive period: inputs go out at least this often even when unchanged.
pub const INPUT_SEND_INTERVAL: Duration = Duration::from_millis(16);

/// Pointer closer than this to the player (in pixels) gives no aim.
pub const AIM_DEAD_ZONE: f32 = 4.0;

/// Yaw from the player's screen position toward the pointer. Screen up is +Z.
pub fn pointer_yaw(origin: (f32, f32), pointer: (f32, f32)) -> Option<f32> {
    let dx = pointer.0 - origin.0;
    let dz = origin.1 - pointer.1;
    if dx * dx + dz * dz < AIM_DEAD_ZONE * AIM_DEAD_ZONE {
        return None;
    }
    Some(dx.atan2(dz))
}

/// Raw key state for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KeySample {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub attack: bool,
    pub respawn: bool,
    /// Mouse position in screen pixels.
    pub pointer: (f32, f32),
}

impl KeySample {
    /// Reads the keyboard and mouse through macroquad.
    pub fn capture() -> Self {
        Self {
            up: is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
            down: is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
            left: is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
            right: is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
            attack: is_key_down(KeyCode::Space) || is_mouse_button_down(MouseButton::Left),
            respawn: is_key_down(KeyCode::R),
            pointer: mouse_position(),
        }
    }

    /// Ground-plane axes in {-1, 0, 1}; up is +Z.
    pub fn axes(&self) -> (f32, f32) {
        let axis = |positive: bool, negative: bool| match (positive, negative) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        };
        (axis(self.right, self.left), axis(self.up, self.down))
    }
}

/// What one frame of input asks the session to send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    pub movement: Option<InputState>,
    /// Sequence number of a freshly pressed attack.
    pub attack: Option<u32>,
    pub respawn_pressed: bool,
}

/// Turns per-frame key samples into sequenced network requests
pub struct InputManager {
    next_sequence: u32,
    next_attack_sequence: u32,
    current_input: InputState,
    last_input_sent: Option<Instant>,

    // The pointer steers facing from the moment it moves until a movement
    // key changes without it.
    last_pointer: Option<(f32, f32)>,
    aiming: bool,

    // Previous frame key states for edge detection
    prev_attack: bool,
    prev_respawn: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            next_sequence: 1,
            next_attack_sequence: 1,
            current_input: InputState::idle(0),
            last_input_sent: None,
            last_pointer: None,
            aiming: false,
            prev_attack: false,
            prev_respawn: false,
        }
    }

    /// Samples the real devices and processes them. `aim_origin` is the local
    /// player's screen position, when it is on screen.
    pub fn update(&mut self, aim_origin: Option<(f32, f32)>) -> FrameInput {
        self.update_from(KeySample::capture(), aim_origin, Instant::now())
    }

    /// Processes one frame of key state.
    ///
    /// Movement is emitted when it changed or the keep-alive period elapsed.
    /// Attack and respawn fire on the press edge only.
    pub fn update_from(
        &mut self,
        sample: KeySample,
        aim_origin: Option<(f32, f32)>,
        now: Instant,
    ) -> FrameInput {
        let mut frame = FrameInput::default();

        if sample.attack && !self.prev_attack {
            frame.attack = Some(self.next_attack_sequence);
            self.next_attack_sequence += 1;
        }
        frame.respawn_pressed = sample.respawn && !self.prev_respawn;
        self.prev_attack = sample.attack;
        self.prev_respawn = sample.respawn;

        let (move_x, move_z) = sample.axes();
        let movement_changed =
            move_x != self.current_input.move_x || move_z != self.current_input.move_z;

        let pointer_moved = self
            .last_pointer
            .map_or(false, |last| last != sample.pointer);
        self.last_pointer = Some(sample.pointer);
        if pointer_moved {
            self.aiming = true;
        } else if movement_changed && (move_x != 0.0 || move_z != 0.0) {
            self.aiming = false;
        }

        let aim_yaw = if self.aiming {
            aim_origin.and_then(|origin| pointer_yaw(origin, sample.pointer))
        } else {
            None
        };
        let input_changed = movement_changed || aim_yaw != self.current_input.aim_yaw;
        let time_to_send = self
            .last_input_sent
            .map_or(true, |sent| now.duration_since(sent) >= INPUT_SEND_INTERVAL);

        if input_changed || time_to_send {
            self.current_input = InputState {
                sequence: self.next_sequence,
                move_x,
                move_z,
                aim_yaw,
            };
            self.next_sequence += 1;
            self.last_input_sent = Some(now);
            frame.movement = Some(self.current_input.clone());
        }

        frame
    }

    pub fn get_current_input(&self) -> &InputState {
        &self.current_input
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
