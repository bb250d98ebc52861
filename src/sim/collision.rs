//! Overlap detection
//!
//! Everything is a sphere except arena boundaries, which are axis-aligned
//! boxes carrying string tags. Detection only emits events; handlers mutate
//! state afterwards, in dispatch order.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::defender::Defender;
use super::events::{DestroyCause, EventBus, GameEvent};
use super::projectile::{Projectile, Side};
use super::squad::Squad;
use crate::settings::ArenaSettings;

/// Boundary contacts are tracked as a 64-bit mask per unit
pub const MAX_BOUNDARIES: usize = 64;

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    #[inline]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Closest point of the box to `center` within `radius`
    #[inline]
    pub fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        closest.distance_squared(center) <= radius * radius
    }
}

#[inline]
pub fn spheres_overlap(a: Vec3, ra: f32, b: Vec3, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) <= r * r
}

/// Which arena marker a boundary represents for the squad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundaryKind {
    Left,
    Right,
    /// The defender line
    Bottom,
}

/// Tag names that identify boundary roles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryTags {
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub bottom: Vec<String>,
    /// Boundaries that absorb projectiles
    pub projectile_sink: Vec<String>,
}

impl Default for BoundaryTags {
    fn default() -> Self {
        Self {
            left: vec!["LeftLimit".to_string()],
            right: vec!["RightLimit".to_string()],
            bottom: vec!["BottomLimit".to_string()],
            projectile_sink: vec!["ProjectileSink".to_string()],
        }
    }
}

impl BoundaryTags {
    /// Role of a boundary; left wins over right wins over bottom
    pub fn classify(&self, boundary: &Boundary) -> Option<BoundaryKind> {
        let any = |tags: &[String]| tags.iter().any(|t| boundary.has_tag(t));
        if any(&self.left) {
            Some(BoundaryKind::Left)
        } else if any(&self.right) {
            Some(BoundaryKind::Right)
        } else if any(&self.bottom) {
            Some(BoundaryKind::Bottom)
        } else {
            None
        }
    }

    pub fn is_sink(&self, boundary: &Boundary) -> bool {
        self.projectile_sink.iter().any(|t| boundary.has_tag(t))
    }
}

/// Static arena volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub name: String,
    pub tags: Vec<String>,
    pub bounds: Aabb,
}

impl Boundary {
    pub fn new(name: &str, tags: impl IntoIterator<Item = String>, bounds: Aabb) -> Self {
        Self {
            name: name.to_string(),
            tags: tags.into_iter().collect(),
            bounds,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Lateral range a body of `radius` can occupy between the side boundaries
pub fn lateral_limits(arena: &ArenaSettings, radius: f32) -> (f32, f32) {
    let mut lo = arena.play_area.min.y;
    let mut hi = arena.play_area.max.y;
    for boundary in &arena.boundaries {
        match arena.tags.classify(boundary) {
            Some(BoundaryKind::Left) => lo = lo.max(boundary.bounds.max.y),
            Some(BoundaryKind::Right) => hi = hi.min(boundary.bounds.min.y),
            _ => {}
        }
    }
    if hi - lo < 2.0 * radius {
        let mid = (lo + hi) * 0.5;
        return (mid, mid);
    }
    (lo + radius, hi - radius)
}

/// Bitmask of the boundaries a sphere overlaps
fn boundary_contacts(arena: &ArenaSettings, center: Vec3, radius: f32) -> u64 {
    arena
        .boundaries
        .iter()
        .take(MAX_BOUNDARIES)
        .enumerate()
        .filter(|(_, b)| b.bounds.overlaps_sphere(center, radius))
        .fold(0, |mask, (i, _)| mask | (1u64 << i))
}

/// Run one overlap pass. Consumed and culled projectiles are removed here;
/// everything else is reported through `bus`.
pub fn detect_overlaps(
    arena: &ArenaSettings,
    projectiles: &mut Vec<Projectile>,
    mut squad: Option<&mut Squad>,
    defender: &Defender,
    bus: &mut EventBus,
) {
    let defender_pos = defender.pose.pos;
    let defender_radius = defender.bound_radius();
    let defender_vulnerable = !defender.is_frozen() && !defender.is_retired();

    // Units hit this pass; a second projectile flies through
    let mut hit_units: Vec<usize> = Vec::new();

    projectiles.retain(|p| {
        if !arena.play_area.contains(p.pos) {
            log::trace!("Projectile {} left the play area", p.id);
            return false;
        }

        if p.damages(Side::Enemy) {
            if let Some(squad) = squad.as_deref() {
                let target = squad.members().find(|u| {
                    !hit_units.contains(&u.index)
                        && spheres_overlap(p.pos, p.radius, u.pose.pos, u.bound_radius)
                });
                if let Some(unit) = target {
                    hit_units.push(unit.index);
                    bus.emit(GameEvent::UnitDestroyed {
                        index: unit.index,
                        cause: DestroyCause::DefenderProjectile,
                    });
                    return false;
                }
            }
        }

        if p.damages(Side::Defender)
            && defender_vulnerable
            && spheres_overlap(p.pos, p.radius, defender_pos, defender_radius)
        {
            bus.emit(GameEvent::DefenderHit);
            return false;
        }

        let sunk = arena
            .boundaries
            .iter()
            .any(|b| arena.tags.is_sink(b) && b.bounds.overlaps_sphere(p.pos, p.radius));
        !sunk
    });

    let Some(squad) = squad.as_deref_mut() else {
        return;
    };

    for unit in squad.members_mut() {
        if hit_units.contains(&unit.index) {
            continue;
        }
        let (pos, radius, index) = (unit.pose.pos, unit.bound_radius, unit.index);

        if spheres_overlap(pos, radius, defender_pos, defender_radius) {
            if defender_vulnerable {
                bus.emit(GameEvent::UnitDestroyed {
                    index,
                    cause: DestroyCause::Rammed,
                });
                bus.emit(GameEvent::DefenderHit);
                continue;
            }
            if unit.in_breakaway() {
                bus.emit(GameEvent::UnitDestroyed {
                    index,
                    cause: DestroyCause::BreakawayCollision,
                });
                continue;
            }
        }

        let contacts = boundary_contacts(arena, pos, radius);
        let entered = contacts & !unit.contacts;
        unit.contacts = contacts;

        if unit.in_breakaway() {
            if entered != 0 {
                bus.emit(GameEvent::UnitDestroyed {
                    index,
                    cause: DestroyCause::BreakawayCollision,
                });
            } else if !arena.play_area.overlaps_sphere(pos, radius) {
                bus.emit(GameEvent::UnitDestroyed {
                    index,
                    cause: DestroyCause::LeftPlayArea,
                });
            }
            continue;
        }

        for (i, boundary) in arena.boundaries.iter().take(MAX_BOUNDARIES).enumerate() {
            if entered & (1u64 << i) == 0 {
                continue;
            }
            if let Some(side) = arena.tags.classify(boundary) {
                log::trace!("Unit {index} entered {} ({side:?})", boundary.name);
                bus.emit(GameEvent::BoundaryReached { index, side });
            }
        }
    }
}
