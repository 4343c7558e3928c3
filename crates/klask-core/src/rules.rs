//! Win-condition evaluation.
//!
//! A pure function over the positions of the ball and pucks and the
//! per-puck attached-biscuit counts. It reports the flags active at the
//! current instant; stopping the episode once a win fires is the caller's
//! policy.

use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::board;
use crate::entity::EntityId;
use crate::physics::PhysicsWorld;
use crate::registry::BodyRegistry;

/// Game-state flag. Several flags can be active in the same instant;
/// `Playing` is present exactly when nothing else is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameFlag {
    Playing,
    P1Score,
    P1Klask,
    P1TwoBiscuit,
    P1Win,
    P2Score,
    P2Klask,
    P2TwoBiscuit,
    P2Win,
}

/// The inputs the evaluator reads, captured from the live world.
#[derive(Debug, Clone, Copy)]
pub struct BoardView {
    pub ball_pos: Vector<f32>,
    pub puck1_pos: Vector<f32>,
    pub puck2_pos: Vector<f32>,
    pub puck1_biscuits: usize,
    pub puck2_biscuits: usize,
    /// Meter-to-simulation-unit scale the positions are expressed in.
    pub scaler: f32,
}

impl BoardView {
    /// Reads the current instant out of the world. The pucks and ball exist
    /// for the whole episode, so the lookups cannot fail on a built world.
    #[must_use]
    pub fn capture(world: &PhysicsWorld, registry: &BodyRegistry) -> Self {
        let translation = |id: EntityId| {
            let handle = registry.body(id).expect("pucks and ball are never destroyed");
            *world
                .get_rigid_body(handle)
                .expect("registry handles stay live")
                .translation()
        };

        Self {
            ball_pos: translation(EntityId::Ball),
            puck1_pos: translation(EntityId::Puck1),
            puck2_pos: translation(EntityId::Puck2),
            puck1_biscuits: registry.attached_count(EntityId::Puck1),
            puck2_biscuits: registry.attached_count(EntityId::Puck2),
            scaler: registry.scaler(),
        }
    }
}

/// Whether a body center is within the goal radius of the left / right goal
/// center. Both goals are always tested.
#[must_use]
pub fn in_goal(pos: Vector<f32>, scaler: f32) -> [bool; 2] {
    let [lx, ly] = board::left_goal_center();
    let [rx, ry] = board::right_goal_center();
    let radius = board::GOAL_RADIUS * scaler;

    let left = (pos - Vector::new(lx * scaler, ly * scaler)).norm() <= radius;
    let right = (pos - Vector::new(rx * scaler, ry * scaler)).norm() <= radius;
    [left, right]
}

/// Evaluates every rule independently and combines the results.
///
/// Player 1 wins the point when any of {`P2Score`, `P1Klask`,
/// `P1TwoBiscuit`} fires, symmetrically for player 2. `Playing` is returned
/// alone when no rule fires.
#[must_use]
pub fn evaluate(view: &BoardView) -> Vec<GameFlag> {
    let mut flags = Vec::new();

    let [ball_left, ball_right] = in_goal(view.ball_pos, view.scaler);
    if ball_left {
        flags.push(GameFlag::P2Score);
    }
    if ball_right {
        flags.push(GameFlag::P1Score);
    }

    if in_goal(view.puck1_pos, view.scaler)[0] {
        flags.push(GameFlag::P1Klask);
    }
    if in_goal(view.puck2_pos, view.scaler)[1] {
        flags.push(GameFlag::P2Klask);
    }

    if view.puck1_biscuits >= 2 {
        flags.push(GameFlag::P1TwoBiscuit);
    }
    if view.puck2_biscuits >= 2 {
        flags.push(GameFlag::P2TwoBiscuit);
    }

    let p1_point = [GameFlag::P2Score, GameFlag::P1Klask, GameFlag::P1TwoBiscuit];
    if flags.iter().any(|flag| p1_point.contains(flag)) {
        flags.push(GameFlag::P1Win);
    }
    let p2_point = [GameFlag::P1Score, GameFlag::P2Klask, GameFlag::P2TwoBiscuit];
    if flags.iter().any(|flag| p2_point.contains(flag)) {
        flags.push(GameFlag::P2Win);
    }

    if flags.is_empty() {
        flags.push(GameFlag::Playing);
    }

    flags
}

/// Whether either win flag is present; the episode is over.
#[must_use]
pub fn is_terminal(flags: &[GameFlag]) -> bool {
    flags.contains(&GameFlag::P1Win) || flags.contains(&GameFlag::P2Win)
}
