//! Per-unit movement state machine
//!
//! Each unit mirrors the squad's shared phase (assigned by the coordinator)
//! and turns it into displacement every tick:
//! - STOP: no displacement
//! - ADVANCE_LEFT / ADVANCE_RIGHT: along the lateral axis (∓Y)
//! - DESCEND: along -X until one descend step is covered, then reports once
//! - BREAKAWAY: scripted circle through waypoints, then a straight charge

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::arc::ArcPath;
use super::pose::Pose;
use crate::settings::MovementSettings;

/// Movement mode, shared by the squad and mirrored by each unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementPhase {
    #[default]
    Stop,
    AdvanceLeft,
    AdvanceRight,
    Descend,
    Breakaway,
}

impl MovementPhase {
    #[inline]
    pub fn is_lateral(self) -> bool {
        matches!(self, MovementPhase::AdvanceLeft | MovementPhase::AdvanceRight)
    }

    /// Opposite lateral direction; anything else has no opposite and stops
    pub fn reversed(self) -> MovementPhase {
        match self {
            MovementPhase::AdvanceLeft => MovementPhase::AdvanceRight,
            MovementPhase::AdvanceRight => MovementPhase::AdvanceLeft,
            _ => MovementPhase::Stop,
        }
    }
}

/// Signals a unit's movement raises for the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementSignal {
    DescendFinished,
}

/// Progress through the breakaway maneuver
#[derive(Debug, Clone)]
pub enum BreakawayStage {
    /// Interpolating from `origin` towards `path[current]`
    Circling {
        path: ArcPath,
        current: usize,
        alpha: f32,
        origin: Pose,
    },
    /// Flying straight along the forward vector
    Charging,
}

/// Movement controller of a single unit
#[derive(Debug, Clone)]
pub struct UnitMovement {
    /// Phase assigned by the coordinator (or BREAKAWAY when selected)
    pub phase: MovementPhase,
    /// Phase seen on the previous tick, for entry detection
    pub previous_phase: MovementPhase,
    pub horizontal_speed: f32,
    pub vertical_speed: f32,
    descend_progress: f32,
    descend_reported: bool,
    breakaway: Option<BreakawayStage>,
    settings: MovementSettings,
}

impl UnitMovement {
    pub fn new(settings: MovementSettings) -> Self {
        Self {
            phase: MovementPhase::Stop,
            previous_phase: MovementPhase::Stop,
            horizontal_speed: 0.0,
            vertical_speed: 0.0,
            descend_progress: 0.0,
            descend_reported: false,
            breakaway: None,
            settings,
        }
    }

    /// Coordinator broadcast: shared phase and speeds
    pub fn assign(&mut self, phase: MovementPhase, horizontal_speed: f32, vertical_speed: f32) {
        self.phase = phase;
        self.horizontal_speed = horizontal_speed;
        self.vertical_speed = vertical_speed;
    }

    #[inline]
    pub fn descend_progress(&self) -> f32 {
        self.descend_progress
    }

    #[inline]
    pub fn in_breakaway(&self) -> bool {
        self.phase == MovementPhase::Breakaway
    }

    /// Waypoint currently targeted, while circling
    pub fn breakaway_waypoint(&self) -> Option<usize> {
        match &self.breakaway {
            Some(BreakawayStage::Circling { current, .. }) => Some(*current),
            _ => None,
        }
    }

    /// Whether the unit has finished circling and is charging
    pub fn is_charging(&self) -> bool {
        matches!(self.breakaway, Some(BreakawayStage::Charging))
    }

    /// Advance one tick. `owner` is the pose of the unit this controller
    /// drives; without one, state still advances but nothing is written.
    pub fn tick(
        &mut self,
        mut owner: Option<&mut Pose>,
        dt: f32,
        defender_pos: Vec3,
    ) -> Option<MovementSignal> {
        let entering = self.phase != self.previous_phase;
        let mut signal = None;

        match self.phase {
            MovementPhase::Stop => {}

            MovementPhase::AdvanceLeft => {
                if let Some(pose) = owner {
                    pose.pos.y -= self.horizontal_speed * dt;
                }
            }

            MovementPhase::AdvanceRight => {
                if let Some(pose) = owner {
                    pose.pos.y += self.horizontal_speed * dt;
                }
            }

            MovementPhase::Descend => {
                if entering {
                    self.descend_progress = 0.0;
                    self.descend_reported = false;
                }

                if self.descend_progress > self.settings.descend_step {
                    if !self.descend_reported {
                        self.descend_reported = true;
                        signal = Some(MovementSignal::DescendFinished);
                    }
                } else {
                    let step = self.vertical_speed * dt;
                    if let Some(pose) = owner {
                        pose.pos.x -= step;
                    }
                    self.descend_progress += step;
                }
            }

            MovementPhase::Breakaway => {
                if entering || self.breakaway.is_none() {
                    self.breakaway = Some(self.start_breakaway(owner.as_deref()));
                }
                self.advance_breakaway(owner.as_deref_mut(), dt, defender_pos);
            }
        }

        if self.phase != MovementPhase::Breakaway {
            self.breakaway = None;
        }
        self.previous_phase = self.phase;
        signal
    }

    fn start_breakaway(&self, owner: Option<&Pose>) -> BreakawayStage {
        let Some(origin) = owner else {
            log::warn!("Breakaway without an owner pose; no waypoints generated");
            return BreakawayStage::Charging;
        };

        let path = ArcPath::circle(
            origin,
            self.settings.breakaway_radius,
            self.settings.waypoint_count,
        );
        if path.is_empty() {
            return BreakawayStage::Charging;
        }

        BreakawayStage::Circling {
            path,
            current: 0,
            alpha: 0.0,
            origin: *origin,
        }
    }

    fn advance_breakaway(&mut self, owner: Option<&mut Pose>, dt: f32, defender_pos: Vec3) {
        let step = self.settings.interpolation_step;
        let speed = self.settings.breakaway_speed;

        let Some(stage) = self.breakaway.as_mut() else {
            return;
        };

        match stage {
            BreakawayStage::Circling {
                path,
                current,
                alpha,
                origin,
            } => {
                let Some(target) = path.get(*current).copied() else {
                    *stage = BreakawayStage::Charging;
                    return;
                };

                let mut owner = owner;
                if let Some(pose) = owner.as_deref_mut() {
                    *pose = origin.interpolate(&target, *alpha);
                }

                *alpha += step;
                if *alpha > 1.0 {
                    *current += 1;
                    *alpha = 0.0;
                    if *current < path.len() {
                        *origin = target;
                    } else {
                        if let Some(pose) = owner {
                            pose.face_towards(defender_pos);
                        }
                        *stage = BreakawayStage::Charging;
                    }
                }
            }

            BreakawayStage::Charging => {
                if let Some(pose) = owner {
                    pose.pos += pose.forward() * speed * dt;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const DT: f32 = 1.0 / 60.0;

    fn settings() -> MovementSettings {
        MovementSettings::default()
    }

    fn invader() -> Pose {
        Pose::new(Vec3::new(1000.0, 0.0, 0.0), PI)
    }

    #[test]
    fn test_lateral_motion() {
        let mut m = UnitMovement::new(settings());
        let mut pose = invader();
        m.assign(MovementPhase::AdvanceRight, 300.0, 300.0);
        m.tick(Some(&mut pose), DT, Vec3::ZERO);
        assert!((pose.pos.y - 5.0).abs() < 1e-3);

        m.assign(MovementPhase::AdvanceLeft, 300.0, 300.0);
        m.tick(Some(&mut pose), DT, Vec3::ZERO);
        m.tick(Some(&mut pose), DT, Vec3::ZERO);
        assert!((pose.pos.y + 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_stop_does_nothing() {
        let mut m = UnitMovement::new(settings());
        let mut pose = invader();
        assert!(m.tick(Some(&mut pose), DT, Vec3::ZERO).is_none());
        assert_eq!(pose, invader());
    }

    #[test]
    fn test_descend_reports_once_then_stops() {
        let mut m = UnitMovement::new(settings());
        let mut pose = invader();
        m.assign(MovementPhase::Descend, 300.0, 600.0);

        let mut reports = 0;
        for _ in 0..200 {
            if m.tick(Some(&mut pose), DT, Vec3::ZERO) == Some(MovementSignal::DescendFinished) {
                reports += 1;
            }
        }
        assert_eq!(reports, 1);
        // Moved just past one descend step and no further
        let descended = 1000.0 - pose.pos.x;
        assert!(descended >= 100.0 - 1e-3 && descended <= 110.0 + 1e-3);
    }

    #[test]
    fn test_descend_progress_resets_on_entry() {
        let mut m = UnitMovement::new(settings());
        let mut pose = invader();
        m.assign(MovementPhase::Descend, 300.0, 600.0);
        for _ in 0..30 {
            m.tick(Some(&mut pose), DT, Vec3::ZERO);
        }
        assert!(m.descend_progress() > 100.0);

        m.assign(MovementPhase::AdvanceLeft, 300.0, 600.0);
        m.tick(Some(&mut pose), DT, Vec3::ZERO);
        assert!(m.descend_progress() > 100.0);

        m.assign(MovementPhase::Descend, 300.0, 600.0);
        m.tick(Some(&mut pose), DT, Vec3::ZERO);
        assert!((m.descend_progress() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_breakaway_visits_waypoints_in_order_then_faces_defender() {
        let mut m = UnitMovement::new(settings());
        let mut pose = invader();
        let defender = Vec3::new(0.0, 400.0, 250.0);
        let expected = ArcPath::circle(&pose, 300.0, 5);
        m.phase = MovementPhase::Breakaway;

        let mut visited: Vec<usize> = Vec::new();
        for _ in 0..1000 {
            m.tick(Some(&mut pose), DT, defender);
            match m.breakaway_waypoint() {
                Some(i) => {
                    if visited.last() != Some(&i) {
                        // A new segment starts from the previous waypoint
                        if i > 0 {
                            let prev = expected.waypoints[i - 1].pos;
                            assert!((pose.pos - prev).length() < 15.0);
                        }
                        visited.push(i);
                    }
                }
                None => break,
            }
        }

        assert_eq!(visited, vec![0, 1, 2, 3, 4]);
        assert!(m.is_charging());

        let mut to_defender = defender - pose.pos;
        to_defender.z = 0.0;
        let facing = pose.forward();
        assert!(facing.dot(to_defender.normalize()) > 0.9999);
        assert!(facing.z.abs() < 1e-6);
    }

    #[test]
    fn test_breakaway_charges_forward() {
        let mut m = UnitMovement::new(MovementSettings {
            waypoint_count: 0,
            ..settings()
        });
        let mut pose = invader();
        m.phase = MovementPhase::Breakaway;
        m.tick(Some(&mut pose), DT, Vec3::ZERO);
        assert!(m.is_charging());
        // Zero waypoints: straight along the existing forward vector (-X)
        assert!((pose.pos.x - (1000.0 - 1000.0 * DT)).abs() < 1e-2);
        assert!(pose.pos.y.abs() < 1e-4);
    }

    #[test]
    fn test_breakaway_without_owner_degrades() {
        let mut m = UnitMovement::new(settings());
        m.phase = MovementPhase::Breakaway;
        assert!(m.tick(None, DT, Vec3::ZERO).is_none());
        assert!(m.is_charging());
        assert_eq!(m.breakaway_waypoint(), None);
    }
}
