use crate::mirror::Mirror;
use crate::presentation::Effects;
use macroquad::prelude::{
    clear_background, draw_circle, draw_circle_lines, draw_line, draw_rectangle,
    draw_rectangle_lines, draw_text, measure_text, Color, GRAY, WHITE,
};
use shared::{hp_ratio, Rgb, Vec3, ENEMY_RADIUS, PLAYER_RADIUS};

/// Pixels per world unit.
pub const PIXELS_PER_UNIT: f32 = 24.0;
/// Fraction of the distance to the target the camera closes per second.
pub const CAMERA_FOLLOW_RATE: f32 = 5.0;
const GRID_SPACING: f32 = 5.0;

pub fn to_color(rgb: Rgb) -> Color {
    Color::new(rgb.r, rgb.g, rgb.b, 1.0)
}

/// Everything the HUD shows besides the world.
#[derive(Debug, Clone)]
pub struct HudInfo {
    pub status_text: String,
    pub join_code: String,
    pub death_screen: bool,
}

/// Top-down view with a camera that eases toward the local player.
pub struct Renderer {
    width: f32,
    height: f32,
    camera: Vec3,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Renderer {
            width: width as f32,
            height: height as f32,
            camera: Vec3::ZERO,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn camera(&self) -> Vec3 {
        self.camera
    }

    pub fn follow(&mut self, target: Option<Vec3>, dt: f32) {
        if let Some(target) = target {
            let t = (CAMERA_FOLLOW_RATE * dt).clamp(0.0, 1.0);
            self.camera = self.camera.add(&target.flatten().sub(&self.camera).scale(t));
        }
    }

    /// Screen position of a ground-plane point; +Z points up the screen.
    pub fn world_to_screen(&self, position: &Vec3) -> (f32, f32) {
        (
            self.width / 2.0 + (position.x - self.camera.x) * PIXELS_PER_UNIT,
            self.height / 2.0 - (position.z - self.camera.z) * PIXELS_PER_UNIT,
        )
    }

    pub fn render(&mut self, mirror: &Mirror, effects: &Effects, hud: &HudInfo) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        self.draw_grid();

        for enemy in mirror.enemies() {
            let color = effects.display_color(&enemy.id, enemy.color());
            let (x, y) = self.world_to_screen(&enemy.position);
            draw_circle(x, y, ENEMY_RADIUS * PIXELS_PER_UNIT, to_color(color));
            self.draw_hp_bar(x, y, hp_ratio(enemy.current_hp, enemy.max_hp_display));
        }

        let local = mirror.local_entity();
        for player in mirror.players() {
            let (x, y) = self.world_to_screen(&player.position);
            let radius = PLAYER_RADIUS * PIXELS_PER_UNIT;
            let mut color = to_color(effects.display_color(&player.id, player.color));
            if player.is_dead {
                color.a = 0.3;
            }

            draw_circle(x, y, radius, color);
            if Some(player.id) == local {
                draw_circle_lines(x, y, radius + 2.0, 2.0, WHITE);
            }

            let tip = player.position.add(&player.facing.scale(PLAYER_RADIUS * 1.6));
            let (tx, ty) = self.world_to_screen(&tip);
            draw_line(x, y, tx, ty, 2.0, WHITE);

            self.draw_hp_bar(x, y, hp_ratio(player.current_hp, player.max_hp));
        }

        for piece in effects.debris() {
            let (x, y) = self.world_to_screen(&piece.position);
            // Height lifts pieces up the screen so bursts read in top-down.
            let lifted = y - piece.position.y * PIXELS_PER_UNIT * 0.5;
            draw_rectangle(x - 2.0, lifted - 2.0, 4.0, 4.0, to_color(piece.color));
        }

        self.draw_hud(mirror, hud);

        if hud.death_screen {
            self.draw_death_screen();
        }
    }

    fn draw_grid(&self) {
        let line_color = Color::from_rgba(51, 51, 51, 255);
        let step = GRID_SPACING * PIXELS_PER_UNIT;
        let (origin_x, origin_y) = self.world_to_screen(&Vec3::ZERO);

        let mut x = origin_x.rem_euclid(step);
        while x < self.width {
            draw_line(x, 0.0, x, self.height, 1.0, line_color);
            x += step;
        }
        let mut y = origin_y.rem_euclid(step);
        while y < self.height {
            draw_line(0.0, y, self.width, y, 1.0, line_color);
            y += step;
        }
    }

    fn draw_hp_bar(&self, x: f32, y: f32, ratio: f32) {
        let width = 28.0;
        let top = y - PIXELS_PER_UNIT * 0.9;
        let ratio = ratio.clamp(0.0, 1.0);
        let fill = if ratio > 0.5 {
            Color::from_rgba(68, 204, 68, 255)
        } else if ratio > 0.25 {
            Color::from_rgba(230, 200, 40, 255)
        } else {
            Color::from_rgba(220, 50, 50, 255)
        };

        draw_rectangle(x - width / 2.0, top, width, 4.0, Color::from_rgba(40, 40, 40, 255));
        draw_rectangle(x - width / 2.0, top, width * ratio, 4.0, fill);
        draw_rectangle_lines(x - width / 2.0, top, width, 4.0, 1.0, GRAY);
    }

    fn draw_hud(&self, mirror: &Mirror, hud: &HudInfo) {
        draw_text(&hud.status_text, 10.0, 20.0, 20.0, WHITE);

        if !hud.join_code.is_empty() {
            draw_text(&format!("Code: {}", hud.join_code), 10.0, 40.0, 18.0, GRAY);
        }

        let counts = format!(
            "{} players  {} enemies",
            mirror.player_count(),
            mirror.enemy_count()
        );
        draw_text(&counts, 10.0, 60.0, 16.0, GRAY);

        if let Some(player) = mirror.local_player() {
            let hp = format!("HP {}/{}", player.current_hp, player.max_hp);
            draw_text(&hp, 10.0, self.height - 16.0, 22.0, WHITE);
        }
    }

    fn draw_death_screen(&self) {
        draw_rectangle(0.0, 0.0, self.width, self.height, Color::new(0.0, 0.0, 0.0, 0.6));

        let title = "YOU DIED";
        let size = measure_text(title, None, 48, 1.0);
        draw_text(
            title,
            (self.width - size.width) / 2.0,
            self.height / 2.0,
            48.0,
            Color::from_rgba(220, 50, 50, 255),
        );

        let hint = "Press R to respawn";
        let size = measure_text(hint, None, 22, 1.0);
        draw_text(
            hint,
            (self.width - size.width) / 2.0,
            self.height / 2.0 + 36.0,
            22.0,
            WHITE,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_origin_maps_to_screen_center() {
        let renderer = Renderer::new(800, 600);
        assert_eq!(renderer.world_to_screen(&Vec3::ZERO), (400.0, 300.0));
    }

    #[test]
    fn test_positive_z_is_up() {
        let renderer = Renderer::new(800, 600);
        let (x, y) = renderer.world_to_screen(&Vec3::ground(1.0, 1.0));
        assert_approx_eq!(x, 400.0 + PIXELS_PER_UNIT);
        assert_approx_eq!(y, 300.0 - PIXELS_PER_UNIT);
    }

    #[test]
    fn test_camera_eases_toward_target() {
        let mut renderer = Renderer::new(800, 600);
        renderer.follow(Some(Vec3::ground(10.0, 0.0)), 0.1);
        assert_approx_eq!(renderer.camera().x, 5.0);

        renderer.follow(Some(Vec3::ground(10.0, 0.0)), 1.0);
        assert_approx_eq!(renderer.camera().x, 10.0);

        renderer.follow(None, 1.0);
        assert_approx_eq!(renderer.camera().x, 10.0);
    }

    #[test]
    fn test_rgb_conversion() {
        let color = to_color(Rgb::PURPLE);
        assert_approx_eq!(color.r, 0.5);
        assert_approx_eq!(color.b, 0.5);
        assert_approx_eq!(color.a, 1.0);
    }
}
