use serde::{Deserialize, Serialize};

/// Minimal 3D vector for spawn placement. World coordinates, meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const UNIT_Z: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        Vec3 {
            x: self.x / len,
            y: self.y / len,
            z: self.z / len,
        }
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

/// A teleport target: where a car is placed and which way it points.
///
/// The heading is derived from the start position and a forward-reference
/// point rather than stored as an angle, so track builders can read both
/// values straight off the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub position: Vec3,
    /// Forward-reference point used to derive the heading.
    pub forward: Vec3,
}

impl SpawnPoint {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self { position, forward }
    }

    /// Unit heading vector, `normalize(position - forward)`. Falls back to
    /// the canonical forward axis when the two points coincide.
    pub fn heading(&self) -> Vec3 {
        let direction = self.position - self.forward;
        if direction.length() > 0.0 {
            direction.normalized()
        } else {
            Vec3::UNIT_Z
        }
    }
}
