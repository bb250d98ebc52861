//! Match controller
//!
//! Owns the active squad, replaces it when it is cleared or reaches the
//! defender line, and ends the match.

use super::squad::Squad;
use super::unit::UnitFactory;
use crate::platform::SceneLoader;
use crate::settings::SquadSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// No squad spawned yet
    Waiting,
    Running,
    Ended,
}

#[derive(Debug, Clone)]
pub struct MatchController {
    squad: Option<Squad>,
    generation: u32,
    phase: MatchPhase,
    settings: SquadSettings,
    end_scene: String,
    seed: u64,
}

impl MatchController {
    pub fn new(settings: &SquadSettings, end_scene: &str, seed: u64) -> Self {
        Self {
            squad: None,
            generation: 0,
            phase: MatchPhase::Waiting,
            settings: settings.clone(),
            end_scene: end_scene.to_string(),
            seed,
        }
    }

    #[inline]
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn squad(&self) -> Option<&Squad> {
        self.squad.as_ref()
    }

    pub fn squad_mut(&mut self) -> Option<&mut Squad> {
        self.squad.as_mut()
    }

    /// RNG seed of a squad generation
    fn squad_seed(&self, generation: u32) -> u64 {
        self.seed ^ u64::from(generation).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }

    /// Replace the active squad. The first squad moves at the configured
    /// speeds; every later one at the outgoing squad's speeds plus the
    /// increment. Returns the new speeds, or `None` once the match has ended.
    pub fn regenerate_squad(&mut self, factory: &mut dyn UnitFactory) -> Option<(f32, f32)> {
        if self.phase == MatchPhase::Ended {
            log::warn!("Squad regeneration requested after the match ended");
            return None;
        }

        let carried = self.squad.as_mut().map(|old| {
            let speeds = (old.horizontal_speed, old.vertical_speed);
            old.teardown();
            speeds
        });

        self.generation += 1;
        let seed = self.squad_seed(self.generation);
        let mut squad = Squad::spawn(&self.settings, self.generation, seed, factory);

        if let Some((h, v)) = carried {
            let inc = self.settings.speed_increment;
            squad.set_speeds(h + inc, v + inc);
            squad.broadcast();
        }

        let speeds = (squad.horizontal_speed, squad.vertical_speed);
        log::info!(
            "Squad #{} regenerated at speeds ({:.0}, {:.0})",
            self.generation,
            speeds.0,
            speeds.1
        );
        self.squad = Some(squad);
        self.phase = MatchPhase::Running;
        Some(speeds)
    }

    /// Tear down the squad and load the end scene. Only the first call acts.
    pub fn end_match(&mut self, scenes: &mut dyn SceneLoader) -> bool {
        if self.phase == MatchPhase::Ended {
            return false;
        }
        if let Some(squad) = self.squad.as_mut() {
            squad.teardown();
        }
        self.squad = None;
        self.phase = MatchPhase::Ended;
        log::info!("Match over after {} squads", self.generation);
        scenes.load_next_scene(&self.end_scene);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::LogSceneLoader;
    use crate::sim::unit::TemplateFactory;
    use proptest::prelude::*;

    fn controller() -> MatchController {
        let settings = SquadSettings {
            rows: 2,
            cols: 3,
            ..SquadSettings::default()
        };
        MatchController::new(&settings, "Menu", 42)
    }

    #[test]
    fn test_first_squad_uses_configured_speeds() {
        let mut c = controller();
        assert_eq!(c.phase(), MatchPhase::Waiting);
        assert_eq!(c.regenerate_squad(&mut TemplateFactory), Some((300.0, 300.0)));
        assert_eq!(c.generation(), 1);
        assert_eq!(c.phase(), MatchPhase::Running);
        assert_eq!(c.squad().map(|s| s.live_members()), Some(6));
    }

    #[test]
    fn test_regeneration_carries_speed_forward() {
        let mut c = controller();
        c.regenerate_squad(&mut TemplateFactory);
        if let Some(s) = c.squad_mut() {
            s.set_speeds(320.0, 310.0);
        }
        assert_eq!(c.regenerate_squad(&mut TemplateFactory), Some((370.0, 360.0)));
        let squad = c.squad().expect("squad");
        assert_eq!(squad.generation(), 2);
        assert!(squad.members().all(|u| u.movement.horizontal_speed == 370.0));
    }

    #[test]
    fn test_generations_use_distinct_seeds() {
        let c = controller();
        assert_ne!(c.squad_seed(1), c.squad_seed(2));
    }

    #[test]
    fn test_end_match_loads_scene_once() {
        let mut c = controller();
        c.regenerate_squad(&mut TemplateFactory);
        let mut scenes = LogSceneLoader::default();
        assert!(c.end_match(&mut scenes));
        assert!(!c.end_match(&mut scenes));
        assert_eq!(scenes.loaded, vec!["Menu".to_string()]);
        assert!(c.squad().is_none());
        assert_eq!(c.regenerate_squad(&mut TemplateFactory), None);
    }

    proptest! {
        #[test]
        fn prop_speed_strictly_increases(increment in 1.0f32..200.0, regenerations in 1usize..10) {
            let settings = SquadSettings {
                rows: 1,
                cols: 2,
                speed_increment: increment,
                ..SquadSettings::default()
            };
            let mut c = MatchController::new(&settings, "Menu", 1);
            let mut last = c.regenerate_squad(&mut TemplateFactory).expect("first squad");
            for _ in 0..regenerations {
                let next = c.regenerate_squad(&mut TemplateFactory).expect("next squad");
                prop_assert!(next.0 > last.0);
                prop_assert!(next.1 > last.1);
                last = next;
            }
        }
    }
}
