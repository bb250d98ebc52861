//! Circular arc trajectories for the breakaway maneuver
//!
//! The circle lies in the horizontal plane of the unit:
//! - centre: `radius` behind the unit along its forward axis
//! - waypoint 0: the unit's own position
//! - waypoints advance towards the unit's right-hand side
//! - headings follow the circle's tangent, except the last waypoint which
//!   restores the unit's starting orientation

use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::pose::Pose;
use crate::bearing;

/// An ordered list of waypoint poses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArcPath {
    pub waypoints: Vec<Pose>,
}

impl ArcPath {
    /// Closed circle of `count` waypoints around `origin`
    pub fn circle(origin: &Pose, radius: f32, count: usize) -> Self {
        if count == 0 {
            return Self::default();
        }

        let forward = origin.forward();
        let right = origin.right();
        let center = origin.pos - forward * radius;
        let delta_theta = TAU / count as f32;

        let waypoints = (0..count)
            .map(|i| {
                let theta = i as f32 * delta_theta;
                let (sin, cos) = theta.sin_cos();
                let pos = center + (forward * cos + right * sin) * radius;
                let rot = if i + 1 < count {
                    let tangent = right * cos - forward * sin;
                    Quat::from_rotation_z(bearing(tangent))
                } else {
                    origin.rot
                };
                Pose { pos, rot }
            })
            .collect();

        Self { waypoints }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pose> {
        self.waypoints.get(index)
    }
}
