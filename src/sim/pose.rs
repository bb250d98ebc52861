//! Position + orientation of an entity
//!
//! Rotations are yaw-only (about +Z). Forward is the rotated +X axis.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::bearing;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub pos: Vec3,
    pub rot: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            pos: Vec3::ZERO,
            rot: Quat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn new(pos: Vec3, yaw: f32) -> Self {
        Self {
            pos,
            rot: Quat::from_rotation_z(yaw),
        }
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rot * Vec3::X
    }

    /// Right-hand side in the horizontal plane
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Z)
    }

    /// Heading of the forward vector in the horizontal plane
    #[inline]
    pub fn yaw(&self) -> f32 {
        bearing(self.forward())
    }

    /// Linear interpolation of position, spherical of rotation
    pub fn interpolate(&self, target: &Pose, t: f32) -> Pose {
        Pose {
            pos: self.pos.lerp(target.pos, t),
            rot: self.rot.slerp(target.rot, t),
        }
    }

    /// Turn to face `target`, considering only the horizontal plane
    pub fn face_towards(&mut self, target: Vec3) {
        let mut to_target = target - self.pos;
        to_target.z = 0.0;
        if to_target.length_squared() > f32::EPSILON {
            self.rot = Quat::from_rotation_z(bearing(to_target));
        }
    }
}
