//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only (one stream per squad generation)
//! - Stable iteration order (roster slot, projectile id)
//! - No rendering or platform dependencies beyond the collaborator traits

pub mod arc;
pub mod barrier;
pub mod collision;
pub mod controller;
pub mod defender;
pub mod events;
pub mod movement;
pub mod pose;
pub mod projectile;
pub mod squad;
pub mod state;
pub mod tick;
pub mod unit;

pub use arc::ArcPath;
pub use collision::{Aabb, Boundary, BoundaryKind, BoundaryTags};
pub use controller::{MatchController, MatchPhase};
pub use defender::{Defender, DefenderSignal};
pub use events::{DestroyCause, EventBus, GameEvent};
pub use movement::{MovementPhase, UnitMovement};
pub use pose::Pose;
pub use projectile::{Projectile, Shot, Side};
pub use squad::Squad;
pub use state::{GamePhase, GameState};
pub use tick::{TickInput, tick};
pub use unit::{TemplateFactory, Unit, UnitFactory};
