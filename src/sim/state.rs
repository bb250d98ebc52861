//! Game state
//!
//! Everything the simulation mutates between frames lives here.

use serde::{Deserialize, Serialize};

use super::controller::MatchController;
use super::defender::Defender;
use super::events::GameEvent;
use super::projectile::{Projectile, Shot};
use crate::settings::Settings;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    Paused,
    /// Defender out of lives; the match has ended
    GameOver,
}

#[derive(Debug, Clone)]
pub struct GameState {
    /// Match seed for reproducibility
    pub seed: u64,
    pub settings: Settings,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub phase: GamePhase,
    pub defender: Defender,
    pub controller: MatchController,
    /// Projectiles in flight (sorted by id)
    pub projectiles: Vec<Projectile>,
    /// Events dispatched during the last tick, in dispatch order
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    pub fn new(settings: Settings) -> Self {
        let seed = settings.seed;
        Self {
            seed,
            time_ticks: 0,
            phase: GamePhase::Playing,
            defender: Defender::new(&settings.defender),
            controller: MatchController::new(&settings.squad, &settings.arena.end_scene, seed),
            projectiles: Vec::new(),
            events: Vec::new(),
            next_id: 1,
            settings,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn spawn_projectile(&mut self, shot: Shot) -> u32 {
        let id = self.next_entity_id();
        self.projectiles.push(shot.into_projectile(id));
        id
    }

    pub fn score(&self) -> u64 {
        self.defender.score()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::controller::MatchPhase;
    use crate::sim::projectile::Side;
    use glam::Vec3;

    #[test]
    fn test_new_state() {
        let state = GameState::new(Settings::default());
        assert_eq!(state.seed, 0x5EED);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.defender.lives(), 3);
        assert_eq!(state.controller.phase(), MatchPhase::Waiting);
        assert!(state.controller.squad().is_none());
    }

    #[test]
    fn test_projectile_ids_increase() {
        let mut state = GameState::new(Settings::default());
        let shot = Shot::new(Side::Defender, Vec3::ZERO, Vec3::X, None);
        let a = state.spawn_projectile(shot);
        let b = state.spawn_projectile(shot);
        assert!(b > a);
        assert_eq!(state.projectiles.len(), 2);
    }
}
