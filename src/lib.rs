//! Space Invaders - squad-coordinated arcade simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (squad choreography, combat, match flow)
//! - `platform`: Presentation and scene-transition collaborators
//! - `persistence`: High-score storage collaborators
//! - `settings`: Data-driven game tuning

pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;

pub use highscores::HighScores;
pub use settings::Settings;

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Yaw of a freshly spawned invader (faces the defender along -X)
    pub const INVADER_SPAWN_YAW: f32 = std::f32::consts::PI;
    /// Yaw of the defender (faces the squad along +X)
    pub const DEFENDER_YAW: f32 = 0.0;

    /// Scene loaded when the match ends
    pub const END_SCENE: &str = "Menu";
}

/// Horizontal-plane bearing of a direction (radians, Z ignored)
#[inline]
pub fn bearing(dir: Vec3) -> f32 {
    dir.y.atan2(dir.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_bearing_ignores_height() {
        let flat = bearing(Vec3::new(1.0, 1.0, 0.0));
        let raised = bearing(Vec3::new(1.0, 1.0, 500.0));
        assert!((flat - raised).abs() < 1e-6);
        assert!((flat - PI / 4.0).abs() < 1e-6);
    }
}
