//! Squad coordinator
//!
//! Owns the roster and drives the shared phase. Units compute their own
//! motion each tick; the coordinator then aggregates what they reported and
//! re-broadcasts the shared phase, so a phase change reaches every unit on
//! the following tick.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::barrier::DescendBarrier;
use super::collision::BoundaryKind;
use super::movement::MovementPhase;
use super::pose::Pose;
use super::projectile::Shot;
use super::unit::{Unit, UnitFactory};
use crate::consts::INVADER_SPAWN_YAW;
use crate::settings::{SquadSettings, UnitTemplate};

/// Per-unit output of a tick that the coordinator or world must act on
#[derive(Debug)]
pub struct UnitReport {
    pub index: usize,
    pub descend_finished: bool,
    pub shot: Option<Shot>,
}

/// Result of removing a member from the roster
#[derive(Debug, Clone, Copy)]
pub struct Removal {
    /// Pose of the unit when it was removed
    pub pose: Pose,
    /// The roster just became empty (reported once per squad)
    pub cleared: bool,
    /// The removal completed a pending DESCEND barrier
    pub released: bool,
}

#[derive(Debug, Clone)]
pub struct Squad {
    /// Index-stable slots; destroyed members leave `None` behind
    roster: Vec<Option<Unit>>,
    /// Removed members still playing their destruction sequence
    wreckage: Vec<Unit>,
    /// Shared phase broadcast to the formation
    pub phase: MovementPhase,
    /// Lateral direction that last drove the squad into a side boundary
    pub previous_phase: MovementPhase,
    live_members: usize,
    pub horizontal_speed: f32,
    pub vertical_speed: f32,
    pub breakaway_rate: f32,
    time_since_breakaway: f32,
    barrier: DescendBarrier,
    rng: Pcg32,
    generation: u32,
    cleared: bool,
    reached_defender_line: bool,
}

impl Squad {
    /// Spawn a rows × cols grid. Rows step along +X (away from the defender),
    /// columns along +Y.
    pub fn spawn(
        settings: &SquadSettings,
        generation: u32,
        seed: u64,
        factory: &mut dyn UnitFactory,
    ) -> Self {
        let template = match &settings.template {
            Some(template) => template.clone(),
            None => {
                log::warn!("No unit template configured; spawning default units");
                UnitTemplate::default()
            }
        };

        let origin = settings.spawn_origin;
        let mut roster = Vec::with_capacity(settings.rows * settings.cols);
        let mut spawn = origin;
        let mut radius_x: f32 = 0.0;
        let mut radius_y: f32 = 0.0;

        for _col in 0..settings.cols {
            for _row in 0..settings.rows {
                let index = roster.len();
                let mut unit = factory.spawn(&template, index, Pose::new(spawn, INVADER_SPAWN_YAW));
                unit.index = index;

                radius_x = radius_x.max(unit.bound_radius);
                radius_y = radius_y.max(unit.bound_radius);
                roster.push(Some(unit));

                spawn.x += radius_x * 2.0 + settings.extra_separation;
            }
            spawn.x = origin.x;
            spawn.y += radius_y * 2.0 + settings.extra_separation;
        }

        let live_members = roster.len();
        log::info!(
            "Squad #{generation} spawned: {live_members} units ({}x{}) at {origin}",
            settings.rows,
            settings.cols
        );

        let mut squad = Self {
            roster,
            wreckage: Vec::new(),
            phase: MovementPhase::AdvanceRight,
            previous_phase: MovementPhase::Stop,
            live_members,
            horizontal_speed: settings.horizontal_speed,
            vertical_speed: settings.vertical_speed,
            breakaway_rate: settings.breakaway_rate,
            time_since_breakaway: 0.0,
            barrier: DescendBarrier::default(),
            rng: Pcg32::seed_from_u64(seed),
            generation,
            cleared: false,
            reached_defender_line: false,
        };
        squad.broadcast();
        squad
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Surviving members, breakaway units included
    #[inline]
    pub fn live_members(&self) -> usize {
        self.live_members
    }

    /// Surviving members still flying in formation
    pub fn formation_members(&self) -> usize {
        self.members().filter(|u| !u.in_breakaway()).count()
    }

    /// Number of roster slots ever allocated
    #[inline]
    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }

    pub fn member(&self, index: usize) -> Option<&Unit> {
        self.roster.get(index).and_then(Option::as_ref)
    }

    pub fn member_mut(&mut self, index: usize) -> Option<&mut Unit> {
        self.roster.get_mut(index).and_then(Option::as_mut)
    }

    /// Surviving members in roster order
    pub fn members(&self) -> impl Iterator<Item = &Unit> {
        self.roster.iter().flatten()
    }

    pub fn members_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.roster.iter_mut().flatten()
    }

    pub fn wreckage(&self) -> &[Unit] {
        &self.wreckage
    }

    pub fn barrier(&self) -> &DescendBarrier {
        &self.barrier
    }

    #[inline]
    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    pub fn set_speeds(&mut self, horizontal: f32, vertical: f32) {
        self.horizontal_speed = horizontal;
        self.vertical_speed = vertical;
    }

    pub fn increment_speed(&mut self, delta: f32) {
        self.horizontal_speed += delta;
        self.vertical_speed += delta;
    }

    /// Let every member move and decide to fire; count down wreckage
    pub fn tick_units(&mut self, dt: f32, defender_pos: glam::Vec3) -> Vec<UnitReport> {
        let mut reports = Vec::new();
        for unit in self.roster.iter_mut().flatten() {
            let out = unit.tick(dt, defender_pos, &mut self.rng);
            if out.descend_finished || out.shot.is_some() {
                reports.push(UnitReport {
                    index: unit.index,
                    descend_finished: out.descend_finished,
                    shot: out.shot,
                });
            }
        }

        self.wreckage.retain_mut(|unit| {
            let done = unit.tick_wreck(dt);
            if done {
                log::trace!("Wreck of unit {} removed", unit.index);
            }
            !done
        });

        reports
    }

    /// Push the shared phase and speeds to every member still in formation
    pub fn broadcast(&mut self) {
        let (phase, h, v) = (self.phase, self.horizontal_speed, self.vertical_speed);
        for unit in self.roster.iter_mut().flatten() {
            if !unit.in_breakaway() {
                unit.movement.assign(phase, h, v);
            }
        }
    }

    /// Per-tick coordination: broadcast, then maybe send one member on a
    /// breakaway. Returns the member that broke away.
    pub fn update_squad_state(&mut self, dt: f32) -> Option<usize> {
        self.broadcast();

        self.time_since_breakaway += dt;
        let probability = 1.0 - (-self.breakaway_rate * self.time_since_breakaway).exp();
        self.time_since_breakaway = 0.0;

        let candidates: Vec<usize> = self
            .members()
            .filter(|u| !u.in_breakaway())
            .map(|u| u.index)
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let roll: f32 = self.rng.random();
        if roll >= probability {
            return None;
        }

        let index = candidates[self.rng.random_range(0..candidates.len())];
        let phase = self.phase;
        if !self.start_breakaway(index) {
            return None;
        }
        // The breakaway may have released the barrier
        if self.phase != phase {
            self.broadcast();
        }
        Some(index)
    }

    /// Send a member on a breakaway. It leaves the phase broadcast and the
    /// DESCEND barrier.
    pub fn start_breakaway(&mut self, index: usize) -> bool {
        let Some(unit) = self.member_mut(index) else {
            return false;
        };
        if unit.in_breakaway() {
            return false;
        }
        unit.start_breakaway();
        log::debug!("Unit {index} breaks away (fire rate {:.4})", unit.fire_rate);

        self.barrier.forget(index);
        self.try_release_barrier();
        true
    }

    /// A member touched a side boundary. Flips the squad to DESCEND once per
    /// crossing; returns whether the flip happened.
    pub fn on_side_reached(&mut self, index: usize, side: BoundaryKind) -> bool {
        let lateral = match side {
            BoundaryKind::Left => MovementPhase::AdvanceLeft,
            BoundaryKind::Right => MovementPhase::AdvanceRight,
            BoundaryKind::Bottom => return false,
        };
        let Some(unit) = self.member(index) else {
            return false;
        };
        if !unit.movement.phase.is_lateral() || !self.phase.is_lateral() {
            return false;
        }

        self.previous_phase = lateral;
        self.phase = MovementPhase::Descend;
        self.barrier.open_epoch();
        log::debug!(
            "Squad #{} hit {side:?} boundary (unit {index}); descending, epoch {}",
            self.generation,
            self.barrier.epoch()
        );
        true
    }

    /// A member finished its DESCEND step. Returns true when this report
    /// released the barrier.
    pub fn on_descend_finished(&mut self, index: usize) -> bool {
        if self.phase != MovementPhase::Descend {
            return false;
        }
        match self.member(index) {
            Some(unit) if !unit.in_breakaway() => {}
            _ => return false,
        }
        if !self.barrier.report(index) {
            log::trace!("Duplicate descend report from unit {index}");
            return false;
        }
        self.try_release_barrier()
    }

    /// A member touched the defender line; true the first time only
    pub fn on_bottom_reached(&mut self, index: usize) -> bool {
        if self.reached_defender_line || self.member(index).is_none() {
            return false;
        }
        self.reached_defender_line = true;
        log::info!("Squad #{} reached the defender line", self.generation);
        true
    }

    fn try_release_barrier(&mut self) -> bool {
        if self.phase != MovementPhase::Descend {
            return false;
        }
        let required = self.formation_members();
        if required == 0 || self.barrier.count() < required {
            return false;
        }

        self.barrier.reset();
        self.phase = self.previous_phase.reversed();
        log::debug!(
            "Squad #{}: all {required} members descended; now {:?}",
            self.generation,
            self.phase
        );
        true
    }

    /// Remove a member. With `explode` it keeps playing its destruction
    /// sequence outside the roster. Stale indices are ignored.
    pub fn remove_unit(&mut self, index: usize, explode: bool) -> Option<Removal> {
        let mut unit = self.roster.get_mut(index)?.take()?;
        self.live_members -= 1;
        self.barrier.forget(index);

        let pose = unit.pose;
        if explode {
            unit.freeze();
            self.wreckage.push(unit);
        }

        let released = self.try_release_barrier();

        let cleared = self.live_members == 0 && !self.cleared;
        if cleared {
            self.cleared = true;
            log::info!("Squad #{} cleared", self.generation);
        }

        Some(Removal {
            pose,
            cleared,
            released,
        })
    }

    /// Destroy every member and wreck; returns how many members were alive
    pub fn teardown(&mut self) -> usize {
        let alive = self.live_members;
        for slot in &mut self.roster {
            *slot = None;
        }
        self.wreckage.clear();
        self.live_members = 0;
        self.barrier.reset();
        alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::unit::TemplateFactory;
    use glam::Vec3;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn settings(rows: usize, cols: usize) -> SquadSettings {
        SquadSettings {
            rows,
            cols,
            extra_separation: 10.0,
            breakaway_rate: 0.0,
            template: Some(UnitTemplate {
                fire_rate: 0.0,
                ..UnitTemplate::default()
            }),
            spawn_origin: Vec3::new(1000.0, 0.0, 0.0),
            ..SquadSettings::default()
        }
    }

    fn squad(rows: usize, cols: usize) -> Squad {
        Squad::spawn(&settings(rows, cols), 1, 7, &mut TemplateFactory)
    }

    /// Flip to DESCEND from ADVANCE_RIGHT and deliver it to the units
    fn descending(rows: usize, cols: usize) -> Squad {
        let mut s = squad(rows, cols);
        assert!(s.on_side_reached(0, BoundaryKind::Right));
        s.broadcast();
        s
    }

    #[test]
    fn test_spawn_grid() {
        let s = squad(2, 3);
        assert_eq!(s.live_members(), 6);
        assert_eq!(s.roster_len(), 6);
        assert_eq!(s.phase, MovementPhase::AdvanceRight);

        for (i, unit) in s.members().enumerate() {
            assert_eq!(unit.index, i);
            assert_eq!(unit.movement.phase, MovementPhase::AdvanceRight);
        }
        // Index 1 is the second row of the first column: one spacing along +X
        let spacing = 2.0 * 50.0 + 10.0;
        assert!((s.member(1).unwrap().pose.pos - Vec3::new(1000.0 + spacing, 0.0, 0.0)).length() < 1e-3);
        // Index 2 starts the second column
        assert!((s.member(2).unwrap().pose.pos - Vec3::new(1000.0, spacing, 0.0)).length() < 1e-3);
        // Units face the defender
        assert!((s.member(0).unwrap().pose.forward() - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_missing_template_falls_back_to_default() {
        let mut cfg = settings(1, 2);
        cfg.template = None;
        let s = Squad::spawn(&cfg, 1, 7, &mut TemplateFactory);
        assert_eq!(s.live_members(), 2);
        assert_eq!(s.member(0).unwrap().bound_radius, UnitTemplate::default().bound_radius);
    }

    #[test]
    fn test_right_boundary_flips_to_descend_for_all() {
        let mut s = squad(2, 3);
        assert!(s.on_side_reached(4, BoundaryKind::Right));
        assert_eq!(s.phase, MovementPhase::Descend);
        assert_eq!(s.previous_phase, MovementPhase::AdvanceRight);

        s.update_squad_state(DT);
        assert_eq!(s.members().count(), 6);
        assert!(s.members().all(|u| u.movement.phase == MovementPhase::Descend));
    }

    #[test]
    fn test_simultaneous_crossings_flip_once() {
        let mut s = squad(2, 3);
        let epoch = s.barrier().epoch();
        let flips = (0..6)
            .filter(|&i| s.on_side_reached(i, BoundaryKind::Right))
            .count();
        assert_eq!(flips, 1);
        assert_eq!(s.barrier().epoch(), epoch + 1);
    }

    #[test]
    fn test_all_reports_reverse_direction() {
        let mut s = descending(2, 3);
        for i in 0..5 {
            assert!(!s.on_descend_finished(i));
        }
        assert_eq!(s.phase, MovementPhase::Descend);
        assert!(s.on_descend_finished(5));
        assert_eq!(s.phase, MovementPhase::AdvanceLeft);
        assert_eq!(s.barrier().count(), 0);
    }

    #[test]
    fn test_left_boundary_reverses_to_right() {
        let mut s = squad(1, 2);
        s.phase = MovementPhase::AdvanceLeft;
        s.broadcast();
        assert!(s.on_side_reached(0, BoundaryKind::Left));
        s.broadcast();
        s.on_descend_finished(0);
        s.on_descend_finished(1);
        assert_eq!(s.phase, MovementPhase::AdvanceRight);
    }

    #[test]
    fn test_no_prior_lateral_stops() {
        let mut s = squad(1, 2);
        s.phase = MovementPhase::Descend;
        s.broadcast();
        s.on_descend_finished(0);
        s.on_descend_finished(1);
        assert_eq!(s.phase, MovementPhase::Stop);
    }

    #[test]
    fn test_duplicate_reports_do_not_release() {
        let mut s = descending(2, 3);
        for _ in 0..10 {
            for i in 0..5 {
                s.on_descend_finished(i);
            }
        }
        assert_eq!(s.phase, MovementPhase::Descend);
        assert_eq!(s.barrier().count(), 5);
    }

    #[test]
    fn test_reports_outside_descend_ignored() {
        let mut s = squad(1, 2);
        assert!(!s.on_descend_finished(0));
        assert_eq!(s.barrier().count(), 0);
    }

    #[test]
    fn test_destroying_pending_member_releases_barrier() {
        let mut s = descending(2, 3);
        for i in 0..5 {
            s.on_descend_finished(i);
        }
        let removal = s.remove_unit(5, true).unwrap();
        assert!(removal.released);
        assert!(!removal.cleared);
        assert_eq!(s.phase, MovementPhase::AdvanceLeft);
    }

    #[test]
    fn test_destroyed_reporter_is_not_counted() {
        let mut s = descending(1, 3);
        s.on_descend_finished(0);
        s.remove_unit(0, true);
        // Two survivors remain; one report alone is not enough
        assert!(!s.on_descend_finished(1));
        assert!(s.on_descend_finished(2));
    }

    #[test]
    fn test_breakaway_member_excluded_from_barrier_and_broadcast() {
        let mut s = descending(2, 3);
        s.on_descend_finished(2);
        assert!(s.start_breakaway(2));
        assert_eq!(s.barrier().count(), 0);
        assert!(!s.on_descend_finished(2));

        for i in [0, 1, 3, 4] {
            s.on_descend_finished(i);
        }
        assert!(s.on_descend_finished(5));
        assert_eq!(s.phase, MovementPhase::AdvanceLeft);

        s.broadcast();
        assert_eq!(s.member(2).unwrap().movement.phase, MovementPhase::Breakaway);
        assert_eq!(s.member(0).unwrap().movement.phase, MovementPhase::AdvanceLeft);
    }

    #[test]
    fn test_breakaway_release_reaches_formation_same_tick() {
        let mut released = 0;
        for seed in 0..64 {
            let mut s = Squad::spawn(&settings(1, 2), 1, seed, &mut TemplateFactory);
            assert!(s.on_side_reached(0, BoundaryKind::Right));
            s.broadcast();
            assert!(!s.on_descend_finished(0));
            s.breakaway_rate = 1e9;

            // Only the member that has not reported releases the barrier
            match s.update_squad_state(DT) {
                Some(1) => {
                    released += 1;
                    assert_eq!(s.phase, MovementPhase::AdvanceLeft);
                    assert_eq!(s.member(0).unwrap().movement.phase, MovementPhase::AdvanceLeft);
                    assert!(s.member(1).unwrap().in_breakaway());
                }
                Some(0) => {
                    assert_eq!(s.phase, MovementPhase::Descend);
                    assert_eq!(s.member(1).unwrap().movement.phase, MovementPhase::Descend);
                }
                other => panic!("unexpected breakaway pick {other:?}"),
            }
        }
        assert!(released > 0);
    }

    #[test]
    fn test_wreck_destroyed_mid_breakaway_stays_put() {
        let mut s = descending(1, 3);
        s.on_descend_finished(0);
        assert!(s.start_breakaway(2));
        for _ in 0..10 {
            s.tick_units(DT, Vec3::ZERO);
        }
        assert!(s.member(2).unwrap().in_breakaway());

        let removal = s.remove_unit(2, true).unwrap();
        assert!(!removal.released);
        let count = s.barrier().count();
        let wreck = s.wreckage()[0].pose;
        assert_eq!(removal.pose, wreck);

        for _ in 0..30 {
            s.tick_units(DT, Vec3::ZERO);
            s.update_squad_state(DT);
        }
        assert_eq!(s.wreckage().len(), 1);
        assert_eq!(s.wreckage()[0].pose, wreck);
        assert_eq!(s.wreckage()[0].movement.phase, MovementPhase::Stop);
        assert_eq!(s.barrier().count(), count);
    }

    #[test]
    fn test_remove_stale_index_is_noop() {
        let mut s = squad(1, 2);
        assert!(s.remove_unit(0, false).is_some());
        assert!(s.remove_unit(0, false).is_none());
        assert!(s.remove_unit(99, false).is_none());
        assert_eq!(s.live_members(), 1);
    }

    #[test]
    fn test_cleared_reported_once() {
        let mut s = squad(1, 2);
        assert!(!s.remove_unit(0, true).unwrap().cleared);
        assert!(s.remove_unit(1, true).unwrap().cleared);
        assert!(s.is_cleared());
        assert_eq!(s.wreckage().len(), 2);
        assert!(s.remove_unit(1, true).is_none());
    }

    #[test]
    fn test_wreckage_expires() {
        let mut s = squad(1, 1);
        s.remove_unit(0, true);
        for _ in 0..(2.5 / DT) as usize {
            s.tick_units(DT, Vec3::ZERO);
        }
        assert!(s.wreckage().is_empty());
    }

    #[test]
    fn test_bottom_reported_once() {
        let mut s = squad(1, 2);
        assert!(s.on_bottom_reached(0));
        assert!(!s.on_bottom_reached(1));
    }

    #[test]
    fn test_breakaway_trigger() {
        let mut s = squad(2, 3);
        s.breakaway_rate = 1e9;
        let index = s.update_squad_state(DT).expect("certain trigger");
        let unit = s.member(index).unwrap();
        assert!(unit.in_breakaway());
        assert_eq!(s.formation_members(), 5);

        // Never picks a unit already breaking away
        for _ in 0..5 {
            let next = s.update_squad_state(DT).unwrap();
            assert_ne!(next, index);
        }
        assert_eq!(s.formation_members(), 0);
        assert_eq!(s.update_squad_state(DT), None);
    }

    #[test]
    fn test_breakaway_never_at_zero_rate() {
        let mut s = squad(2, 3);
        for _ in 0..1000 {
            assert_eq!(s.update_squad_state(DT), None);
        }
    }

    #[test]
    fn test_breakaway_choice_is_reproducible() {
        let picks = |seed: u64| {
            let mut s = Squad::spawn(&settings(3, 4), 1, seed, &mut TemplateFactory);
            s.breakaway_rate = 1e9;
            (0..4).filter_map(|_| s.update_squad_state(DT)).collect::<Vec<_>>()
        };
        assert_eq!(picks(11), picks(11));
    }

    #[test]
    fn test_units_descend_and_release_through_ticks() {
        let mut s = descending(2, 2);
        let start: Vec<f32> = s.members().map(|u| u.pose.pos.x).collect();
        let mut released = false;
        for _ in 0..120 {
            for report in s.tick_units(DT, Vec3::ZERO) {
                if report.descend_finished {
                    released |= s.on_descend_finished(report.index);
                }
            }
            s.update_squad_state(DT);
        }
        assert!(released);
        assert_eq!(s.phase, MovementPhase::AdvanceLeft);
        for (unit, x0) in s.members().zip(start) {
            let descended = x0 - unit.pose.pos.x;
            assert!(descended >= 100.0 - 1e-3 && descended < 111.0);
        }
    }

    #[test]
    fn test_teardown() {
        let mut s = squad(2, 2);
        s.remove_unit(0, true);
        assert_eq!(s.teardown(), 3);
        assert_eq!(s.live_members(), 0);
        assert!(s.members().next().is_none());
        assert!(s.wreckage().is_empty());
        assert!(!s.is_cleared());
    }

    proptest! {
        #[test]
        fn prop_barrier_waits_for_every_survivor(
            n in 1usize..12,
            reporters in proptest::collection::vec(0usize..12, 0..48),
        ) {
            let mut s = descending(1, n);
            let mut distinct = std::collections::BTreeSet::new();
            for r in reporters.into_iter().filter(|&r| r < n) {
                distinct.insert(r);
                let released = s.on_descend_finished(r);
                if distinct.len() < n {
                    prop_assert!(!released);
                    prop_assert_eq!(s.phase, MovementPhase::Descend);
                } else {
                    break;
                }
            }
            if distinct.len() == n {
                prop_assert_eq!(s.phase, MovementPhase::AdvanceLeft);
            }
        }
    }
}
