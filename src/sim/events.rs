//! In-process event bus
//!
//! Entities never call each other directly. They emit events; `tick` drains
//! the bus synchronously within the frame and routes each event to its
//! listeners in a fixed order. Handlers may emit follow-up events, which are
//! processed in the same drain.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::collision::BoundaryKind;
use super::pose::Pose;

/// Why a squad member left the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestroyCause {
    /// Shot down; plays the destruction sequence
    DefenderProjectile,
    /// Collided with the defender
    Rammed,
    /// Breakaway unit touched something other than a unit or friendly fire
    BreakawayCollision,
    /// Breakaway unit flew out of the play area
    LeftPlayArea,
}

impl DestroyCause {
    /// Whether the unit plays its destruction sequence (freeze, effect, delay)
    #[inline]
    pub fn explodes(self) -> bool {
        matches!(self, DestroyCause::DefenderProjectile)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    UnitFired { index: usize, pose: Pose },
    UnitDestroyed { index: usize, cause: DestroyCause },
    DescendFinished { index: usize },
    BoundaryReached { index: usize, side: BoundaryKind },
    SquadReachedDefenderLine { generation: u32 },
    BreakawayStarted { index: usize },
    SquadCleared { generation: u32 },
    SquadRegenerated {
        generation: u32,
        horizontal_speed: f32,
        vertical_speed: f32,
    },
    DefenderFired,
    DefenderHit,
    DefenderDestroyed { lives_left: u32 },
    DefenderRespawned,
    DefenderZeroLives { final_score: u64 },
    MatchEnded { final_score: u64, new_high_score: bool },
}

/// FIFO of pending events
#[derive(Debug, Default)]
pub struct EventBus {
    queue: VecDeque<GameEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.queue.push_back(event);
    }

    pub fn pop(&mut self) -> Option<GameEvent> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
