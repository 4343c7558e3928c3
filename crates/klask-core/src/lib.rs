//! Klask Simulation Core
//!
//! Deterministic physics simulation of the Klask board game using `Rapier2D`:
//! two magnet-driven pucks, a ball, and three magnetically attracted biscuits
//! on a bounded board, with seed-reproducible resets suitable for
//! reinforcement learning.
//!
//! The entry point is [`KlaskSimulator`]: `reset` rebuilds the world,
//! `step` advances it by one fixed timestep and returns the active game
//! flags, a flat agent-state snapshot, and (if enabled) a rendered frame.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod board;
pub mod contact;
pub mod entity;
pub mod forces;
pub mod physics;
pub mod registry;
pub mod render;
pub mod rules;
pub mod sim;
pub mod snapshot;

pub use contact::{ContactFilter, PendingMerge};
pub use entity::{Color, EntityId, EntityKind};
pub use physics::PhysicsWorld;
pub use registry::{AttachedBiscuit, BodyRegistry};
pub use render::{Frame, ParseRenderModeError, RenderMode, Renderer};
pub use rules::{BoardView, GameFlag, evaluate, is_terminal};
pub use sim::{BallStart, KlaskSimulator, ParseBallStartError, SimConfig, StepOutput};
pub use snapshot::{AgentSnapshot, EntityState};
