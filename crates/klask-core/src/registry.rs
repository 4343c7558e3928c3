//! Body registry and world construction.
//!
//! Owns the mapping from entity identity to physics handles and is the
//! single source of truth for which entities are currently simulated as
//! free bodies. Merged biscuits leave the free set permanently and are
//! reachable only through their sensor collider on the host puck.

use std::collections::HashMap;
use std::f32::consts::PI;

use rapier2d::prelude::*;

use crate::board;
use crate::contact::PendingMerge;
use crate::entity::{EntityId, EntityKind, encode_user_data};
use crate::physics::PhysicsWorld;

/// Collision category reserved for the center divider. Pucks collide with
/// it; the ball and biscuits have it masked out of their filters.
const DIVIDER_GROUP: Group = Group::GROUP_5;

/// A biscuit that was merged onto a puck and now exists only as a sensor
/// collider on the puck body.
#[derive(Debug, Clone, Copy)]
pub struct AttachedBiscuit {
    pub id: EntityId,
    pub host: EntityId,
    pub collider: ColliderHandle,
    /// Offset from the puck's local origin, captured at merge time.
    pub offset: Vector<f32>,
}

/// Registry of every simulated entity for one episode.
#[derive(Debug)]
pub struct BodyRegistry {
    bodies: HashMap<EntityId, RigidBodyHandle>,
    attached: Vec<AttachedBiscuit>,
    ground: RigidBodyHandle,
    scaler: f32,
}

impl BodyRegistry {
    /// Builds the full board into `world`: boundary walls, the divider, the
    /// ground reference body, two pucks, the ball at `ball_start` (in
    /// meters), and three biscuits. Construction is unconditional.
    pub fn build(world: &mut PhysicsWorld, scaler: f32, ball_start: [f32; 2]) -> Self {
        let w = board::BOARD_WIDTH * scaler;
        let h = board::BOARD_HEIGHT * scaler;

        // Boundary walls. No user data: the contact filter ignores them.
        let walls = [
            (Point::new(0.0, 0.0), Point::new(w, 0.0)),
            (Point::new(0.0, 0.0), Point::new(0.0, h)),
            (Point::new(w, 0.0), Point::new(w, h)),
            (Point::new(0.0, h), Point::new(w, h)),
        ];
        for (a, b) in walls {
            world.add_static_collider(ColliderBuilder::segment(a, b).build());
        }

        // Divider edges either side of the center line, in their own
        // collision category so only pucks are stopped by them.
        let divider_xs = [
            w / 2.0 - board::DIVIDER_WIDTH * scaler / 2.0,
            w / 2.0 + board::DIVIDER_WIDTH * scaler / 2.0,
        ];
        for x in divider_xs {
            world.add_static_collider(
                ColliderBuilder::segment(Point::new(x, 0.0), Point::new(x, h))
                    .collision_groups(InteractionGroups::new(DIVIDER_GROUP, Group::ALL))
                    .build(),
            );
        }

        // Static reference body the table friction acts against.
        let ground = world.add_rigid_body(RigidBodyBuilder::fixed().build());

        let mut bodies = HashMap::new();

        for (id, start) in [
            (EntityId::Puck1, board::puck1_start()),
            (EntityId::Puck2, board::puck2_start()),
        ] {
            let handle = spawn_puck(world, scaler, id, start);
            bodies.insert(id, handle);
        }

        let ball = spawn_round_piece(
            world,
            scaler,
            EntityId::Ball,
            ball_start,
            board::BALL_RADIUS,
            board::BALL_MASS,
        );
        bodies.insert(EntityId::Ball, ball);

        for (id, start) in EntityId::BISCUITS.into_iter().zip(board::biscuit_starts()) {
            let handle = spawn_round_piece(
                world,
                scaler,
                id,
                start,
                board::BISCUIT_RADIUS,
                board::BISCUIT_MASS,
            );
            bodies.insert(id, handle);
        }

        Self {
            bodies,
            attached: Vec::new(),
            ground,
            scaler,
        }
    }

    /// Handle of an entity that still has an independent body.
    pub fn body(&self, id: EntityId) -> Option<RigidBodyHandle> {
        self.bodies.get(&id).copied()
    }

    /// Whether an entity still has an independent body.
    pub fn is_free(&self, id: EntityId) -> bool {
        self.bodies.contains_key(&id)
    }

    /// Free biscuits in stable identity order. This is the magnetic-force
    /// candidate set.
    pub fn free_biscuits(&self) -> Vec<(EntityId, RigidBodyHandle)> {
        EntityId::BISCUITS
            .into_iter()
            .filter_map(|id| self.bodies.get(&id).map(|&handle| (id, handle)))
            .collect()
    }

    /// Number of biscuits that still have independent bodies.
    pub fn free_biscuit_count(&self) -> usize {
        EntityId::BISCUITS
            .into_iter()
            .filter(|id| self.bodies.contains_key(id))
            .count()
    }

    /// Merged biscuits, in merge order.
    pub fn attached(&self) -> &[AttachedBiscuit] {
        &self.attached
    }

    /// Number of biscuits attached to the given puck.
    pub fn attached_count(&self, puck: EntityId) -> usize {
        self.attached.iter().filter(|a| a.host == puck).count()
    }

    /// The static ground reference body.
    pub fn ground(&self) -> RigidBodyHandle {
        self.ground
    }

    /// Meter-to-simulation-unit scale this registry was built with.
    pub fn scaler(&self) -> f32 {
        self.scaler
    }

    /// Applies a queued merge: captures the biscuit's position relative to
    /// the puck, creates a sensor collider on the puck at that offset, then
    /// retires the biscuit body. Returns `false` if the biscuit was already
    /// merged (a later detection in the same step lost the tie-break).
    pub fn apply_merge(&mut self, world: &mut PhysicsWorld, merge: PendingMerge) -> bool {
        debug_assert_eq!(merge.puck.kind(), EntityKind::Puck);
        debug_assert_eq!(merge.biscuit.kind(), EntityKind::Biscuit);

        let Some(biscuit_handle) = self.body(merge.biscuit) else {
            return false;
        };
        let Some(puck_handle) = self.body(merge.puck) else {
            return false;
        };

        let Some(biscuit_body) = world.get_rigid_body(biscuit_handle) else {
            return false;
        };
        let biscuit_pos = *biscuit_body.translation();
        let Some(puck_body) = world.get_rigid_body(puck_handle) else {
            return false;
        };
        // Full inverse transform, so the offset stays correct even for a
        // rotating host.
        let local = puck_body
            .position()
            .inverse_transform_point(&Point::from(biscuit_pos));
        let offset = Vector::new(local.x, local.y);

        let sensor = ColliderBuilder::ball(board::BISCUIT_RADIUS * self.scaler)
            .translation(offset)
            .sensor(true)
            .density(0.0)
            .collision_groups(InteractionGroups::none())
            .user_data(encode_user_data(merge.biscuit))
            .build();
        let collider = world.add_collider(sensor, puck_handle);

        world.remove_rigid_body(biscuit_handle);
        self.bodies.remove(&merge.biscuit);
        self.attached.push(AttachedBiscuit {
            id: merge.biscuit,
            host: merge.puck,
            collider,
            offset,
        });

        tracing::debug!(
            biscuit = merge.biscuit.name(),
            puck = merge.puck.name(),
            "biscuit merged onto puck"
        );
        true
    }
}

fn spawn_puck(world: &mut PhysicsWorld, scaler: f32, id: EntityId, start: [f32; 2]) -> RigidBodyHandle {
    let body = RigidBodyBuilder::dynamic()
        .translation(Vector::new(start[0] * scaler, start[1] * scaler))
        .lock_rotations()
        .ccd_enabled(true)
        .build();
    let handle = world.add_rigid_body(body);

    let radius = board::PUCK_RADIUS * scaler;
    let collider = ColliderBuilder::ball(radius)
        .restitution(0.0)
        .density(circle_density(board::PUCK_MASS, radius))
        .user_data(encode_user_data(id))
        .build();
    world.add_collider(collider, handle);

    handle
}

fn spawn_round_piece(
    world: &mut PhysicsWorld,
    scaler: f32,
    id: EntityId,
    start: [f32; 2],
    radius_m: f32,
    mass: f32,
) -> RigidBodyHandle {
    let body = RigidBodyBuilder::dynamic()
        .translation(Vector::new(start[0] * scaler, start[1] * scaler))
        .ccd_enabled(true)
        .build();
    let handle = world.add_rigid_body(body);

    let radius = radius_m * scaler;
    let mut collider = ColliderBuilder::ball(radius)
        .restitution(board::RESTITUTION)
        .density(circle_density(mass, radius))
        .collision_groups(InteractionGroups::new(
            Group::GROUP_1,
            Group::ALL.difference(DIVIDER_GROUP),
        ))
        .user_data(encode_user_data(id));
    if id.kind() == EntityKind::Biscuit {
        // Biscuit contacts drive the merge protocol.
        collider = collider.active_hooks(ActiveHooks::MODIFY_SOLVER_CONTACTS);
    }
    world.add_collider(collider.build(), handle);

    handle
}

/// Density giving a circular collider of this radius the requested mass.
fn circle_density(mass: f32, radius: f32) -> f32 {
    mass / (PI * radius * radius)
}
