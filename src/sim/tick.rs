//! Fixed timestep simulation tick
//!
//! Frame order:
//! 1. pause toggle
//! 2. first squad on the first frame
//! 3. defender countdown, movement and firing
//! 4. units move and decide to fire
//! 5. projectiles advance
//! 6. overlap detection
//! 7. event dispatch
//! 8. squad coordination (broadcast, breakaway trigger), dispatch again
//!
//! Phase changes made while dispatching therefore reach units next frame.

use super::collision::{BoundaryKind, detect_overlaps, lateral_limits};
use super::defender::DefenderSignal;
use super::events::{EventBus, GameEvent};
use super::state::{GamePhase, GameState};
use crate::platform::Collaborators;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Lateral axis, -1 (left) to 1 (right)
    pub lateral: f32,
    pub fire: bool,
    /// Pause toggle
    pub pause: bool,
    /// Autopilot flies the defender
    pub idle_mode: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32, collab: &mut Collaborators) {
    state.events.clear();

    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                log::debug!("Paused");
                return;
            }
            GamePhase::Paused => {
                state.phase = GamePhase::Playing;
                log::debug!("Resumed");
            }
            GamePhase::GameOver => {}
        }
    }

    match state.phase {
        GamePhase::Paused | GamePhase::GameOver => return,
        GamePhase::Playing => {}
    }

    let mut bus = EventBus::new();

    if state.controller.squad().is_none() {
        regenerate(state, &mut bus, collab);
    }

    // Defender
    match state.defender.tick(dt) {
        Some(DefenderSignal::Respawned) => bus.emit(GameEvent::DefenderRespawned),
        Some(DefenderSignal::ZeroLives) => bus.emit(GameEvent::DefenderZeroLives {
            final_score: state.defender.score(),
        }),
        None => {}
    }

    let input = if input.idle_mode {
        autopilot(state, input)
    } else {
        input.clone()
    };

    let (min_y, max_y) = lateral_limits(&state.settings.arena, state.defender.bound_radius());
    state.defender.move_lateral(input.lateral, dt, min_y, max_y);
    if input.fire {
        if let Some(shot) = state.defender.fire() {
            state.spawn_projectile(shot);
            bus.emit(GameEvent::DefenderFired);
        }
    }

    // Units
    let defender_pos = state.defender.position();
    let reports = state
        .controller
        .squad_mut()
        .map(|squad| squad.tick_units(dt, defender_pos))
        .unwrap_or_default();
    for report in reports {
        if let Some(shot) = report.shot {
            state.spawn_projectile(shot);
            let pose = state
                .controller
                .squad()
                .and_then(|s| s.member(report.index))
                .map(|u| u.pose)
                .unwrap_or_default();
            bus.emit(GameEvent::UnitFired {
                index: report.index,
                pose,
            });
        }
        if report.descend_finished {
            bus.emit(GameEvent::DescendFinished {
                index: report.index,
            });
        }
    }

    for projectile in &mut state.projectiles {
        projectile.advance(dt);
    }

    detect_overlaps(
        &state.settings.arena,
        &mut state.projectiles,
        state.controller.squad_mut(),
        &state.defender,
        &mut bus,
    );

    dispatch(state, &mut bus, collab);

    if state.phase == GamePhase::Playing {
        if let Some(index) = state
            .controller
            .squad_mut()
            .and_then(|squad| squad.update_squad_state(dt))
        {
            bus.emit(GameEvent::BreakawayStarted { index });
        }
        dispatch(state, &mut bus, collab);
    }

    state.time_ticks += 1;
}

/// Drain the bus, routing each event to squad, defender, match controller
/// and presenter in that order
fn dispatch(state: &mut GameState, bus: &mut EventBus, collab: &mut Collaborators) {
    while let Some(event) = bus.pop() {
        handle_event(state, &event, bus, collab);
        state.events.push(event);
    }
}

fn handle_event(
    state: &mut GameState,
    event: &GameEvent,
    bus: &mut EventBus,
    collab: &mut Collaborators,
) {
    let generation = state.controller.generation();

    match *event {
        GameEvent::UnitFired { index, pose } => {
            collab.presenter.on_unit_fired(index, &pose);
        }

        GameEvent::UnitDestroyed { index, cause } => {
            let Some(removal) = state
                .controller
                .squad_mut()
                .and_then(|squad| squad.remove_unit(index, cause.explodes()))
            else {
                log::trace!("Ignoring destroy of vacant slot {index}");
                return;
            };
            log::debug!("Unit {index} destroyed ({cause:?})");

            state.defender.on_enemy_destroyed();
            if removal.cleared {
                bus.emit(GameEvent::SquadCleared { generation });
            }
            if cause.explodes() {
                collab.presenter.on_unit_destroyed(index, &removal.pose);
            }
        }

        GameEvent::DescendFinished { index } => {
            if let Some(squad) = state.controller.squad_mut() {
                squad.on_descend_finished(index);
            }
        }

        GameEvent::BoundaryReached { index, side } => {
            let Some(squad) = state.controller.squad_mut() else {
                return;
            };
            match side {
                BoundaryKind::Left | BoundaryKind::Right => {
                    squad.on_side_reached(index, side);
                }
                BoundaryKind::Bottom => {
                    if squad.on_bottom_reached(index) {
                        bus.emit(GameEvent::SquadReachedDefenderLine { generation });
                    }
                }
            }
        }

        GameEvent::SquadReachedDefenderLine {
            generation: reached,
        } => {
            if reached != generation {
                return;
            }
            if state.defender.take_damage() {
                bus.emit(GameEvent::DefenderDestroyed {
                    lives_left: state.defender.lives(),
                });
            }
            // Scores like a cleared squad
            state.defender.on_squad_cleared();
            regenerate(state, bus, collab);
        }

        GameEvent::SquadCleared {
            generation: cleared,
        } => {
            if cleared != generation {
                return;
            }
            state.defender.on_squad_cleared();
            regenerate(state, bus, collab);
        }

        GameEvent::DefenderHit => {
            if state.defender.take_damage() {
                bus.emit(GameEvent::DefenderDestroyed {
                    lives_left: state.defender.lives(),
                });
            }
        }

        GameEvent::DefenderDestroyed { lives_left } => {
            collab.presenter.on_defender_destroyed(lives_left);
        }

        GameEvent::DefenderZeroLives { final_score } => {
            let new_high_score = state.defender.record_final_score(&mut *collab.scores);
            if state.controller.end_match(&mut *collab.scenes) {
                bus.emit(GameEvent::MatchEnded {
                    final_score,
                    new_high_score,
                });
            }
            state.phase = GamePhase::GameOver;
        }

        GameEvent::MatchEnded { final_score, .. } => {
            log::info!("Match ended with {final_score} points");
        }

        GameEvent::BreakawayStarted { .. }
        | GameEvent::SquadRegenerated { .. }
        | GameEvent::DefenderFired
        | GameEvent::DefenderRespawned => {}
    }
}

fn regenerate(state: &mut GameState, bus: &mut EventBus, collab: &mut Collaborators) {
    if state.phase == GamePhase::GameOver {
        return;
    }
    if let Some((horizontal_speed, vertical_speed)) =
        state.controller.regenerate_squad(&mut *collab.factory)
    {
        bus.emit(GameEvent::SquadRegenerated {
            generation: state.controller.generation(),
            horizontal_speed,
            vertical_speed,
        });
    }
}

/// Idle/demo mode: chase the unit closest to the defender line and shoot
/// when lined up
fn autopilot(state: &GameState, input: &TickInput) -> TickInput {
    let mut out = TickInput {
        lateral: 0.0,
        fire: false,
        ..input.clone()
    };

    let Some(squad) = state.controller.squad() else {
        return out;
    };
    let defender_y = state.defender.pose.pos.y;
    let target = squad.members().min_by(|a, b| {
        a.pose
            .pos
            .x
            .total_cmp(&b.pose.pos.x)
            .then(a.index.cmp(&b.index))
    });

    if let Some(unit) = target {
        let dy = unit.pose.pos.y - defender_y;
        if dy.abs() > 5.0 {
            out.lateral = dy.signum();
        }
        out.fire = dy.abs() < unit.bound_radius;
    }
    out
}
