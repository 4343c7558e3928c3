//! The simulator facade: deterministic resets and the per-step pipeline.
//!
//! One `step` runs, in order: puck impulses, magnetic forces, table
//! friction, one fixed-timestep engine advance (the contact filter runs
//! inside it), the merge drain, rule evaluation, state extraction, and an
//! optional frame. Everything is synchronous; nothing survives a reset.

use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board;
use crate::contact::ContactFilter;
use crate::entity::{EntityId, EntityKind};
use crate::forces;
use crate::physics::PhysicsWorld;
use crate::registry::BodyRegistry;
use crate::render::{Frame, RenderMode, Renderer};
use crate::rules::{self, BoardView, GameFlag};
use crate::snapshot::AgentSnapshot;

/// Where the ball is placed on reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BallStart {
    TopRight,
    BottomRight,
    TopLeft,
    BottomLeft,
    /// One of the four corners, chosen by the simulator's RNG.
    #[default]
    Random,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized ball start position `{0}`")]
pub struct ParseBallStartError(String);

impl FromStr for BallStart {
    type Err = ParseBallStartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top_right" => Ok(Self::TopRight),
            "bottom_right" => Ok(Self::BottomRight),
            "top_left" => Ok(Self::TopLeft),
            "bottom_left" => Ok(Self::BottomLeft),
            "random" => Ok(Self::Random),
            other => Err(ParseBallStartError(other.to_owned())),
        }
    }
}

/// Simulation parameters, fixed for the lifetime of a simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub render_mode: RenderMode,
    /// Meter-to-simulation-unit scale. The engine does not behave well at
    /// centimeter scale, so board lengths are blown up by this factor.
    pub length_scaler: f32,
    /// Simulation-unit-to-pixel scale for snapshots and frames.
    pub pixels_per_meter: f32,
    pub display_fps: u32,
    pub simulation_fps: u32,
    pub solver_iterations: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::Disabled,
            length_scaler: 100.0,
            pixels_per_meter: 20.0,
            display_fps: 120,
            simulation_fps: 120,
            solver_iterations: 10,
        }
    }
}

/// What every `reset` and `step` hands back to the caller.
#[derive(Debug, Clone)]
pub struct StepOutput {
    /// Present unless rendering is disabled.
    pub frame: Option<Frame>,
    /// Flags active at this instant, in evaluation order.
    pub flags: Vec<GameFlag>,
    pub snapshot: AgentSnapshot,
}

/// One episode's live world: engine state, registry, and merge queue.
struct Episode {
    world: PhysicsWorld,
    registry: BodyRegistry,
    filter: ContactFilter,
}

/// The Klask simulator.
///
/// `reset` must be called before the first `step`; stepping an unreset
/// simulator is a programmer error and panics.
pub struct KlaskSimulator {
    config: SimConfig,
    rng: ChaCha8Rng,
    episode: Option<Episode>,
    renderer: Option<Renderer>,
}

impl std::fmt::Debug for KlaskSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KlaskSimulator")
            .field("config", &self.config)
            .field("initialized", &self.episode.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for KlaskSimulator {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl KlaskSimulator {
    /// Creates a simulator. The RNG starts from OS entropy; give `reset` a
    /// seed for reproducible episodes.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let renderer = (config.render_mode != RenderMode::Disabled).then(|| {
            Renderer::new(
                config.render_mode,
                config.length_scaler,
                config.pixels_per_meter,
                config.display_fps,
            )
        });

        Self {
            config,
            rng: ChaCha8Rng::from_os_rng(),
            episode: None,
            renderer,
        }
    }

    /// Rebuilds the whole world from scratch. A given seed reseeds the RNG
    /// first, so identical `(seed, ball_start)` pairs produce bit-identical
    /// snapshots; `BallStart::Random` resolves through the RNG to one of the
    /// four corners.
    pub fn reset(&mut self, seed: Option<u64>, ball_start: BallStart) -> StepOutput {
        if let Some(seed) = seed {
            self.rng = ChaCha8Rng::seed_from_u64(seed);
        }

        let corners = board::corner_ball_starts();
        let start = match ball_start {
            BallStart::TopRight => corners[0],
            BallStart::BottomRight => corners[1],
            BallStart::TopLeft => corners[2],
            BallStart::BottomLeft => corners[3],
            BallStart::Random => corners[self.rng.random_range(0..corners.len())],
        };

        let mut world = PhysicsWorld::new(
            1.0 / self.config.simulation_fps.max(1) as f32,
            self.config.solver_iterations,
        );
        let registry = BodyRegistry::build(&mut world, self.config.length_scaler, start);

        tracing::info!(?seed, ?ball_start, "episode reset");

        self.episode = Some(Episode {
            world,
            registry,
            filter: ContactFilter::new(),
        });
        self.output()
    }

    /// Advances the simulation by one step, driving each puck with a linear
    /// impulse.
    ///
    /// # Panics
    ///
    /// Panics if called before the first [`reset`](Self::reset), or if an
    /// impulse component is not finite.
    pub fn step(&mut self, puck1_impulse: [f32; 2], puck2_impulse: [f32; 2]) -> StepOutput {
        assert!(
            self.episode.is_some(),
            "step() called before the first reset()"
        );
        for impulse in [puck1_impulse, puck2_impulse] {
            assert!(
                impulse[0].is_finite() && impulse[1].is_finite(),
                "puck impulse components must be finite"
            );
        }

        let episode = self.episode.as_mut().expect("checked above");

        for (puck, impulse) in EntityId::PUCKS.into_iter().zip([puck1_impulse, puck2_impulse]) {
            let handle = episode
                .registry
                .body(puck)
                .expect("pucks are never destroyed");
            if let Some(body) = episode.world.get_rigid_body_mut(handle) {
                body.apply_impulse(Vector::new(impulse[0], impulse[1]), true);
            }
        }

        forces::apply_magnet_forces(&mut episode.world, &episode.registry);
        forces::apply_table_friction(&mut episode.world, &episode.registry);

        episode.world.step(&episode.filter);

        // Merges queued mid-solve are applied here, outside the engine, in
        // detection order.
        for merge in episode.filter.drain() {
            episode.registry.apply_merge(&mut episode.world, merge);
        }

        self.output()
    }

    /// Releases display resources. The episode itself stays untouched.
    pub fn close(&mut self) {
        self.renderer = None;
    }

    /// Render mode the simulator was built with.
    #[must_use]
    pub fn render_mode(&self) -> RenderMode {
        self.config.render_mode
    }

    /// Whether `reset` has been called at least once.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.episode.is_some()
    }

    /// Identities of the biscuits that still have independent bodies.
    #[must_use]
    pub fn free_biscuits(&self) -> Vec<EntityId> {
        self.episode
            .as_ref()
            .map(|e| e.registry.free_biscuits().into_iter().map(|(id, _)| id).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn free_biscuit_count(&self) -> usize {
        self.episode
            .as_ref()
            .map_or(0, |e| e.registry.free_biscuit_count())
    }

    /// Number of biscuits attached to a puck.
    #[must_use]
    pub fn attached_biscuit_count(&self, puck: EntityId) -> usize {
        assert_eq!(puck.kind(), EntityKind::Puck, "not a puck");
        self.episode
            .as_ref()
            .map_or(0, |e| e.registry.attached_count(puck))
    }

    fn output(&mut self) -> StepOutput {
        let episode = self.episode.as_ref().expect("callers hold an episode");

        let flags = rules::evaluate(&BoardView::capture(&episode.world, &episode.registry));
        if rules::is_terminal(&flags) {
            tracing::debug!(?flags, "terminal game state");
        }

        let snapshot = AgentSnapshot::capture(
            &episode.world,
            &episode.registry,
            self.config.pixels_per_meter,
        );

        let frame = self
            .renderer
            .as_mut()
            .map(|renderer| renderer.render(&episode.world, &episode.registry));

        StepOutput {
            frame,
            flags,
            snapshot,
        }
    }
}
