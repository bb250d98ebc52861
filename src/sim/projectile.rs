//! Projectiles fired by either side

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::settings::ProjectileTemplate;

/// Which side fired a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Defender,
    Enemy,
}

/// Request to spawn a projectile, produced by whoever fires
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub side: Side,
    pub origin: Vec3,
    pub dir: Vec3,
    pub speed: f32,
    pub radius: f32,
}

impl Shot {
    pub fn new(side: Side, origin: Vec3, dir: Vec3, template: Option<&ProjectileTemplate>) -> Self {
        let template = match template {
            Some(t) => t.clone(),
            None => {
                log::warn!("No projectile template for {side:?}; using default");
                ProjectileTemplate::default()
            }
        };
        Self {
            side,
            origin,
            dir: dir.normalize_or_zero(),
            speed: template.speed,
            radius: template.radius,
        }
    }

    pub fn into_projectile(self, id: u32) -> Projectile {
        Projectile {
            id,
            side: self.side,
            pos: self.origin,
            dir: self.dir,
            speed: self.speed,
            radius: self.radius,
        }
    }
}

/// A projectile in flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub side: Side,
    pub pos: Vec3,
    /// Unit direction of travel
    pub dir: Vec3,
    pub speed: f32,
    pub radius: f32,
}

impl Projectile {
    pub fn advance(&mut self, dt: f32) {
        self.pos += self.dir * self.speed * dt;
    }

    /// Whether this projectile may damage an entity of `side`
    #[inline]
    pub fn damages(&self, side: Side) -> bool {
        self.side != side
    }
}
