//! Combatant units (squad members)

use glam::Vec3;
use rand::Rng;

use super::movement::{MovementPhase, MovementSignal, UnitMovement};
use super::pose::Pose;
use super::projectile::{Shot, Side};
use crate::settings::UnitTemplate;

/// What a unit did during one tick
#[derive(Debug, Default)]
pub struct UnitTick {
    pub descend_finished: bool,
    pub shot: Option<Shot>,
}

/// A squad member
#[derive(Debug, Clone)]
pub struct Unit {
    /// Roster slot, stable for the unit's whole life
    pub index: usize,
    pub pose: Pose,
    pub movement: UnitMovement,
    /// Firing hazard per second since the last shot
    pub fire_rate: f32,
    pub time_since_shot: f32,
    pub bound_radius: f32,
    /// Arena boundaries overlapped on the previous frame, one bit per boundary
    pub contacts: u64,
    frozen: bool,
    destroy_timer: f32,
    template: UnitTemplate,
}

impl Unit {
    pub fn new(template: &UnitTemplate, index: usize, pose: Pose) -> Self {
        Self {
            index,
            pose,
            movement: UnitMovement::new(template.movement.clone()),
            fire_rate: template.fire_rate,
            time_since_shot: 0.0,
            bound_radius: template.bound_radius,
            contacts: 0,
            frozen: false,
            destroy_timer: 0.0,
            template: template.clone(),
        }
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[inline]
    pub fn in_breakaway(&self) -> bool {
        self.movement.in_breakaway()
    }

    /// Move, then decide whether to fire
    pub fn tick<R: Rng + ?Sized>(&mut self, dt: f32, defender_pos: Vec3, rng: &mut R) -> UnitTick {
        let mut out = UnitTick::default();
        if self.frozen {
            return out;
        }

        if let Some(MovementSignal::DescendFinished) =
            self.movement.tick(Some(&mut self.pose), dt, defender_pos)
        {
            out.descend_finished = true;
        }

        self.time_since_shot += dt;
        let roll: f32 = rng.random();
        if roll < 1.0 - (-self.fire_rate * self.time_since_shot).exp() {
            out.shot = Some(self.fire());
        }

        out
    }

    /// Shoot along the unit's forward vector
    pub fn fire(&mut self) -> Shot {
        self.time_since_shot = 0.0;
        Shot::new(
            Side::Enemy,
            self.pose.pos,
            self.pose.forward(),
            self.template.projectile.as_ref(),
        )
    }

    /// Leave formation. The fire-rate boost stays for the rest of the unit's life.
    pub fn start_breakaway(&mut self) {
        self.fire_rate *= self.template.breakaway_fire_boost;
        self.movement.phase = MovementPhase::Breakaway;
    }

    /// Begin the destruction sequence: no more movement or firing
    pub fn freeze(&mut self) {
        self.frozen = true;
        self.movement.phase = MovementPhase::Stop;
        self.destroy_timer = self.template.destroy_delay;
    }

    /// Count down the destruction sequence; true once the unit should be removed
    pub fn tick_wreck(&mut self, dt: f32) -> bool {
        self.destroy_timer -= dt;
        self.destroy_timer <= 0.0
    }
}

/// Produces live units from a prototype
pub trait UnitFactory {
    fn spawn(&mut self, template: &UnitTemplate, index: usize, pose: Pose) -> Unit;
}

/// Builds units straight from the template
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateFactory;

impl UnitFactory for TemplateFactory {
    fn spawn(&mut self, template: &UnitTemplate, index: usize, pose: Pose) -> Unit {
        Unit::new(template, index, pose)
    }
}
