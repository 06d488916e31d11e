//! Per-frame glue between the session, the mirror, effects and the renderer.

use crate::input::{FrameInput, InputManager};
use crate::mirror::Mirror;
use crate::presentation::Effects;
use crate::rendering::{HudInfo, Renderer};
use crate::session::{SessionCommand, SessionConfig, SessionHandle, SessionStatus, SessionUpdate};
use log::info;
use macroquad::prelude::{get_frame_time, is_key_pressed, next_frame, screen_height, screen_width, KeyCode};

/// Everything the window knows about the world, fed only by session updates.
pub struct ClientView {
    pub status: SessionStatus,
    pub mirror: Mirror,
    pub effects: Effects,
    requested_code: String,
}

impl ClientView {
    pub fn new(effects: Effects, requested_code: impl Into<String>) -> Self {
        Self {
            status: SessionStatus::Idle,
            mirror: Mirror::new(),
            effects,
            requested_code: requested_code.into(),
        }
    }

    pub fn apply(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Status(status) => {
                match &status {
                    SessionStatus::Connected {
                        client_id,
                        entity_id,
                        ..
                    } => {
                        self.mirror.clear();
                        self.mirror.set_local(*client_id, *entity_id);
                    }
                    SessionStatus::Disconnected(_) | SessionStatus::Failed(_) => {
                        self.mirror.clear();
                    }
                    SessionStatus::Idle | SessionStatus::Connecting => {}
                }
                self.status = status;
            }
            SessionUpdate::Snapshot {
                tick,
                players,
                enemies,
            } => {
                self.mirror.apply_snapshot(tick, players, enemies);
            }
            SessionUpdate::Events { tick, events } => {
                for event in &events {
                    self.effects.handle_event(event, &self.mirror);
                }
                self.mirror.apply_events(tick, &events);
            }
        }
    }

    /// Commands to send for one frame of input. Nothing goes out until the
    /// session is connected; respawn is only asked for on the death screen.
    pub fn commands_for(&self, frame: FrameInput) -> Vec<SessionCommand> {
        if !self.status.is_connected() {
            return Vec::new();
        }

        let mut commands = Vec::new();
        if let Some(input) = frame.movement {
            commands.push(SessionCommand::Input(input));
        }
        if let Some(sequence) = frame.attack {
            if !self.effects.death_screen_visible() {
                commands.push(SessionCommand::Attack { sequence });
            }
        }
        if frame.respawn_pressed && self.effects.death_screen_visible() {
            commands.push(SessionCommand::Respawn);
        }
        commands
    }

    pub fn hud(&self) -> HudInfo {
        let join_code = match &self.status {
            SessionStatus::Connected { join_code, .. } => join_code.clone(),
            _ => self.requested_code.clone(),
        };
        HudInfo {
            status_text: self.status.text(),
            join_code,
            death_screen: self.effects.death_screen_visible(),
        }
    }
}

pub struct App {
    session: SessionHandle,
    view: ClientView,
    input: InputManager,
    renderer: Renderer,
}

impl App {
    pub fn new(config: SessionConfig, width: usize, height: usize) -> Self {
        let requested_code = config.join_code.clone();
        Self {
            session: SessionHandle::spawn(config),
            view: ClientView::new(Effects::new(), requested_code),
            input: InputManager::new(),
            renderer: Renderer::new(width, height),
        }
    }

    /// Runs the frame loop until the window closes or Escape is pressed.
    pub async fn run(mut self) {
        loop {
            if is_key_pressed(KeyCode::Escape) {
                break;
            }

            for update in self.session.poll() {
                self.view.apply(update);
            }

            let aim_origin = self
                .view
                .mirror
                .local_player()
                .filter(|player| !player.is_dead)
                .map(|player| self.renderer.world_to_screen(&player.position));
            let frame = self.input.update(aim_origin);
            for command in self.view.commands_for(frame) {
                self.session.send(command);
            }

            let dt = get_frame_time();
            self.view.effects.update(dt, &self.view.mirror);
            self.renderer.resize(screen_width(), screen_height());
            self.renderer
                .follow(self.view.mirror.local_player().map(|p| p.position), dt);
            self.renderer
                .render(&self.view.mirror, &self.view.effects, &self.view.hud());

            next_frame().await;
        }

        info!("Closing client");
        self.session.shutdown();
    }
}
