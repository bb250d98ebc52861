//! The player's ship

use glam::Vec3;

use super::pose::Pose;
use super::projectile::{Shot, Side};
use crate::consts::DEFENDER_YAW;
use crate::persistence::ScoreStore;
use crate::settings::DefenderSettings;

/// Outcome of the respawn countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefenderSignal {
    Respawned,
    /// Raised once, when the last life's destruction sequence ends
    ZeroLives,
}

#[derive(Debug, Clone)]
pub struct Defender {
    pub pose: Pose,
    lives: u32,
    score: u64,
    /// Playing the destruction sequence; ignores input and damage
    frozen: bool,
    respawn_timer: f32,
    fire_timer: f32,
    /// Out of lives; never respawns
    retired: bool,
    settings: DefenderSettings,
}

impl Defender {
    pub fn new(settings: &DefenderSettings) -> Self {
        Self {
            pose: Pose::new(settings.start, DEFENDER_YAW),
            lives: settings.lives,
            score: 0,
            frozen: false,
            respawn_timer: 0.0,
            fire_timer: 0.0,
            retired: false,
            settings: settings.clone(),
        }
    }

    #[inline]
    pub fn lives(&self) -> u32 {
        self.lives
    }

    #[inline]
    pub fn score(&self) -> u64 {
        self.score
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[inline]
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    #[inline]
    pub fn bound_radius(&self) -> f32 {
        self.settings.bound_radius
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.pose.pos
    }

    /// Strafe along the lateral axis; `axis` is clamped to [-1, 1]
    pub fn move_lateral(&mut self, axis: f32, dt: f32, min_y: f32, max_y: f32) {
        if self.frozen || self.retired {
            return;
        }
        let y = self.pose.pos.y + axis.clamp(-1.0, 1.0) * self.settings.speed * dt;
        self.pose.pos.y = y.clamp(min_y, max_y);
    }

    /// Shoot forward if the gun has cooled down
    pub fn fire(&mut self) -> Option<Shot> {
        if self.frozen || self.retired || self.fire_timer > 0.0 {
            return None;
        }
        self.fire_timer = self.settings.fire_cooldown;
        Some(Shot::new(
            Side::Defender,
            self.pose.pos,
            self.pose.forward(),
            self.settings.projectile.as_ref(),
        ))
    }

    /// Lose a life and start the destruction sequence. Ignored while frozen.
    pub fn take_damage(&mut self) -> bool {
        if self.frozen || self.retired {
            return false;
        }
        self.lives = self.lives.saturating_sub(1);
        self.frozen = true;
        self.respawn_timer = self.settings.respawn_delay;
        log::info!("Defender destroyed, {} lives left", self.lives);
        true
    }

    pub fn tick(&mut self, dt: f32) -> Option<DefenderSignal> {
        self.fire_timer = (self.fire_timer - dt).max(0.0);

        if !self.frozen || self.retired {
            return None;
        }
        self.respawn_timer -= dt;
        if self.respawn_timer > 0.0 {
            return None;
        }

        if self.lives > 0 {
            self.frozen = false;
            log::debug!("Defender respawned");
            Some(DefenderSignal::Respawned)
        } else {
            self.retired = true;
            Some(DefenderSignal::ZeroLives)
        }
    }

    pub fn on_enemy_destroyed(&mut self) {
        self.score += self.settings.points_per_unit;
    }

    pub fn on_squad_cleared(&mut self) {
        self.score += self.settings.points_per_squad;
    }

    /// Store the score if it beats the stored high score
    pub fn record_final_score(&self, store: &mut dyn ScoreStore) -> bool {
        let previous = store.high_score();
        if self.score <= previous {
            return false;
        }
        log::info!("New high score: {} (was {previous})", self.score);
        store.set_high_score(self.score);
        true
    }
}
