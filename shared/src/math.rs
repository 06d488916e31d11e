use serde::{Deserialize, Serialize};

/// Linear interpolation between `a` and `b`.
/// `t` is clamped to `[0, 1]`.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    a + (b - a) * t
}

///Represents a vector in 3D space.
/// The ground plane is XZ, Y is up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Default facing direction for freshly spawned players.
    pub const FORWARD: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// A point on the ground plane.
    pub fn ground(x: f32, z: f32) -> Self {
        Self { x, y: 0.0, z }
    }

    /// Unit ground direction for a yaw in radians; zero is +Z, positive turns toward +X.
    pub fn from_yaw(yaw: f32) -> Self {
        Self::ground(yaw.sin(), yaw.cos())
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    pub fn magnitude_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    ///Returns the normalized vector, or zero for a zero-length vector.
    pub fn normalize(&self) -> Vec3 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vec3::ZERO
        } else {
            self.scale(1.0 / mag)
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vec3 {
        Vec3 {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    pub fn dot(&self, other: &Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        self.sub(other).magnitude()
    }

    pub fn distance_squared(&self, other: &Vec3) -> f32 {
        self.sub(other).magnitude_squared()
    }

    /// Moves from `self` toward `target` by at most `max_delta`, never overshooting.
    pub fn move_towards(&self, target: &Vec3, max_delta: f32) -> Vec3 {
        let delta = target.sub(self);
        let distance = delta.magnitude();
        if distance <= max_delta || distance == 0.0 {
            *target
        } else {
            self.add(&delta.scale(max_delta / distance))
        }
    }

    /// Same vector with the vertical component dropped.
    pub fn flatten(&self) -> Vec3 {
        Vec3 {
            x: self.x,
            y: 0.0,
            z: self.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_lerp_clamps() {
        assert_eq!(lerp(1.5, 0.5, 0.0), 1.5);
        assert_eq!(lerp(1.5, 0.5, 1.0), 0.5);
        assert_eq!(lerp(1.5, 0.5, 2.0), 0.5);
        assert_eq!(lerp(1.5, 0.5, -1.0), 1.5);
        assert_approx_eq!(lerp(0.5, 2.0, 0.5), 1.25);
    }

    #[test]
    fn test_normalize_zero_vector() {
        assert_eq!(Vec3::ZERO.normalize(), Vec3::ZERO);
        let n = Vec3::new(3.0, 0.0, 4.0).normalize();
        assert_approx_eq!(n.magnitude(), 1.0);
        assert_approx_eq!(n.x, 0.6);
        assert_approx_eq!(n.z, 0.8);
    }

    #[test]
    fn test_move_towards_does_not_overshoot() {
        let from = Vec3::ground(0.0, 0.0);
        let target = Vec3::ground(1.0, 0.0);

        let step = from.move_towards(&target, 0.25);
        assert_approx_eq!(step.x, 0.25);

        let arrived = from.move_towards(&target, 10.0);
        assert_eq!(arrived, target);
    }

    #[test]
    fn test_dot_and_distance() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert_eq!(a.dot(&b), 32.0);
        assert_approx_eq!(a.distance_squared(&b), 27.0);
        assert_approx_eq!(a.distance(&b), 27.0f32.sqrt());
        assert_eq!(a.flatten(), Vec3::new(1.0, 0.0, 3.0));
    }

    #[test]
    fn test_from_yaw() {
        assert_eq!(Vec3::from_yaw(0.0), Vec3::FORWARD);
        let right = Vec3::from_yaw(std::f32::consts::FRAC_PI_2);
        assert_approx_eq!(right.x, 1.0);
        assert_approx_eq!(right.z, 0.0);
    }
}
