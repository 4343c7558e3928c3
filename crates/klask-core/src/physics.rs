//! Physics integration backed by `Rapier2D` with deterministic behavior.

use std::fmt;
use std::num::NonZeroUsize;

use rapier2d::prelude::*;

/// Default fixed timestep (120Hz simulation).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 120.0;

/// Default solver iteration count.
pub const DEFAULT_SOLVER_ITERATIONS: usize = 10;

/// Physics world containing all `Rapier2D` components for deterministic
/// simulation. The board lies flat, so the world carries no gravity; table
/// friction is applied explicitly each step instead.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub frame: u64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_STEP, DEFAULT_SOLVER_ITERATIONS)
    }
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("frame", &self.frame)
            .field("rigid_body_count", &self.rigid_body_set.len())
            .field("collider_count", &self.collider_set.len())
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Creates a new physics world with the given fixed timestep and solver
    /// iteration count.
    pub fn new(time_step: f32, solver_iterations: usize) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: time_step,
            num_solver_iterations: NonZeroUsize::new(solver_iterations.max(1))
                .expect("clamped to at least one iteration")
                .into(),
            ..Default::default()
        };

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            frame: 0,
        }
    }

    /// Advances the simulation by one fixed timestep. Contact notifications
    /// are delivered synchronously to `hooks` and fully resolved before this
    /// returns.
    pub fn step(&mut self, hooks: &dyn PhysicsHooks) {
        self.physics_pipeline.step(
            &Vector::zeros(),
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            hooks,
            &(),
        );
        self.frame += 1;
    }

    /// Inserts a rigid body and returns its handle.
    pub fn add_rigid_body(&mut self, rigid_body: RigidBody) -> RigidBodyHandle {
        self.rigid_body_set.insert(rigid_body)
    }

    /// Attaches a collider to an existing rigid body.
    pub fn add_collider(&mut self, collider: Collider, parent: RigidBodyHandle) -> ColliderHandle {
        self.collider_set
            .insert_with_parent(collider, parent, &mut self.rigid_body_set)
    }

    /// Inserts a parentless collider, used for the walls and divider.
    pub fn add_static_collider(&mut self, collider: Collider) -> ColliderHandle {
        self.collider_set.insert(collider)
    }

    /// Removes a rigid body together with its colliders.
    pub fn remove_rigid_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    pub fn get_rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    pub fn get_rigid_body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.rigid_body_set.get_mut(handle)
    }

    /// Number of fixed timesteps taken since construction.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }
}
