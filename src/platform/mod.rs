//! Platform seams
//!
//! The simulation is headless. Effects, sounds and scene changes go through
//! these traits; the native runner plugs in log-only implementations.

use crate::persistence::ScoreStore;
use crate::sim::pose::Pose;
use crate::sim::unit::UnitFactory;

/// Audio/visual cues. Every method defaults to doing nothing.
pub trait Presenter {
    /// A unit started its destruction sequence
    fn on_unit_destroyed(&mut self, _index: usize, _pose: &Pose) {}
    fn on_unit_fired(&mut self, _index: usize, _pose: &Pose) {}
    fn on_defender_destroyed(&mut self, _lives_left: u32) {}
}

/// Loads the scene shown after a match
pub trait SceneLoader {
    fn load_next_scene(&mut self, name: &str);
}

/// Presenter that writes cues to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn on_unit_destroyed(&mut self, index: usize, pose: &Pose) {
        log::debug!("Explosion: unit {index} at {}", pose.pos);
    }

    fn on_unit_fired(&mut self, index: usize, pose: &Pose) {
        log::trace!("Shot sound: unit {index} at {}", pose.pos);
    }

    fn on_defender_destroyed(&mut self, lives_left: u32) {
        log::debug!("Defender explosion ({lives_left} lives left)");
    }
}

#[derive(Debug, Default, Clone)]
pub struct LogSceneLoader {
    pub loaded: Vec<String>,
}

impl SceneLoader for LogSceneLoader {
    fn load_next_scene(&mut self, name: &str) {
        log::info!("Loading scene '{name}'");
        self.loaded.push(name.to_string());
    }
}

/// Everything the simulation talks to outside itself
pub struct Collaborators<'a> {
    pub presenter: &'a mut dyn Presenter,
    pub scores: &'a mut dyn ScoreStore,
    pub scenes: &'a mut dyn SceneLoader,
    pub factory: &'a mut dyn UnitFactory,
}
