//! Flat per-entity state snapshots for RL consumers.
//!
//! Every tracked entity appears in every snapshot. A merged biscuit no
//! longer has its own body, so its position is recovered by pushing its
//! stored local offset through the host puck's transform; it inherits the
//! host's velocity.

use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::physics::PhysicsWorld;
use crate::registry::BodyRegistry;

/// Position and velocity of one entity, in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub pos: [f32; 2],
    pub vel: [f32; 2],
}

/// One instant of the whole board, in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub puck1: EntityState,
    pub puck2: EntityState,
    pub ball: EntityState,
    pub biscuit1: EntityState,
    pub biscuit2: EntityState,
    pub biscuit3: EntityState,
}

impl AgentSnapshot {
    /// Captures the current instant. `pixels_per_meter` converts simulation
    /// units into the reporting unit.
    #[must_use]
    pub fn capture(world: &PhysicsWorld, registry: &BodyRegistry, pixels_per_meter: f32) -> Self {
        let state = |id: EntityId| entity_state(world, registry, id, pixels_per_meter);

        Self {
            puck1: state(EntityId::Puck1),
            puck2: state(EntityId::Puck2),
            ball: state(EntityId::Ball),
            biscuit1: state(EntityId::Biscuit1),
            biscuit2: state(EntityId::Biscuit2),
            biscuit3: state(EntityId::Biscuit3),
        }
    }

    /// The state recorded for one entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> EntityState {
        match id {
            EntityId::Puck1 => self.puck1,
            EntityId::Puck2 => self.puck2,
            EntityId::Ball => self.ball,
            EntityId::Biscuit1 => self.biscuit1,
            EntityId::Biscuit2 => self.biscuit2,
            EntityId::Biscuit3 => self.biscuit3,
        }
    }
}

fn entity_state(
    world: &PhysicsWorld,
    registry: &BodyRegistry,
    id: EntityId,
    scale: f32,
) -> EntityState {
    if let Some(handle) = registry.body(id) {
        let body = world
            .get_rigid_body(handle)
            .expect("registry handles stay live");
        let pos = body.translation();
        let vel = body.linvel();
        return EntityState {
            pos: [pos.x * scale, pos.y * scale],
            vel: [vel.x * scale, vel.y * scale],
        };
    }

    // Merged: resolve through the host puck. The full isometry is applied,
    // not just a translation, so a rotating host stays correct.
    let attached = registry
        .attached()
        .iter()
        .find(|a| a.id == id)
        .expect("an entity is either free or attached");
    let host = world
        .get_rigid_body(registry.body(attached.host).expect("pucks are never destroyed"))
        .expect("registry handles stay live");
    let pos = host
        .position()
        .transform_point(&Point::from(attached.offset));
    let vel = host.linvel();
    EntityState {
        pos: [pos.x * scale, pos.y * scale],
        vel: [vel.x * scale, vel.y * scale],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::board;
    use crate::contact::PendingMerge;

    const SCALER: f32 = 100.0;
    const PPM: f32 = 20.0;

    fn setup() -> (PhysicsWorld, BodyRegistry) {
        let mut world = PhysicsWorld::default();
        let registry = BodyRegistry::build(&mut world, SCALER, board::corner_ball_starts()[0]);
        (world, registry)
    }

    #[test]
    fn test_free_entities_report_scaled_start_positions() {
        let (world, registry) = setup();
        let snapshot = AgentSnapshot::capture(&world, &registry, PPM);

        let expected_x = board::puck1_start()[0] * SCALER * PPM;
        assert!((snapshot.puck1.pos[0] - expected_x).abs() < 1e-3);
        assert_eq!(snapshot.puck1.vel, [0.0, 0.0]);

        let ball_start = board::corner_ball_starts()[0];
        assert!((snapshot.ball.pos[0] - ball_start[0] * SCALER * PPM).abs() < 1e-3);
        assert!((snapshot.ball.pos[1] - ball_start[1] * SCALER * PPM).abs() < 1e-3);
    }

    #[test]
    fn test_merged_biscuit_reports_through_host_transform() {
        let (mut world, mut registry) = setup();

        registry.apply_merge(
            &mut world,
            PendingMerge {
                puck: EntityId::Puck1,
                biscuit: EntityId::Biscuit1,
            },
        );

        let snapshot = AgentSnapshot::capture(&world, &registry, PPM);
        let start = board::biscuit_starts()[0];
        // The host has not moved, so the biscuit reports its merge-time spot.
        assert!((snapshot.biscuit1.pos[0] - start[0] * SCALER * PPM).abs() < 1e-3);
        assert!((snapshot.biscuit1.pos[1] - start[1] * SCALER * PPM).abs() < 1e-3);
    }

    #[test]
    fn test_merged_biscuit_follows_a_moved_and_rotated_host() {
        let (mut world, mut registry) = setup();

        registry.apply_merge(
            &mut world,
            PendingMerge {
                puck: EntityId::Puck1,
                biscuit: EntityId::Biscuit1,
            },
        );
        let offset = registry.attached()[0].offset;

        // Teleport the host and give it a quarter turn. Rotation locking
        // constrains the solver, not direct pose writes.
        let puck = registry.body(EntityId::Puck1).unwrap();
        world
            .get_rigid_body_mut(puck)
            .unwrap()
            .set_position(Isometry::new(Vector::new(10.0, 20.0), std::f32::consts::FRAC_PI_2), true);
        world
            .get_rigid_body_mut(puck)
            .unwrap()
            .set_linvel(Vector::new(3.0, 0.0), true);

        let snapshot = AgentSnapshot::capture(&world, &registry, PPM);
        // A quarter turn maps (dx, dy) to (-dy, dx).
        let expected = [(10.0 - offset.y) * PPM, (20.0 + offset.x) * PPM];
        assert!((snapshot.biscuit1.pos[0] - expected[0]).abs() < 1e-2);
        assert!((snapshot.biscuit1.pos[1] - expected[1]).abs() < 1e-2);
        // Velocity comes from the host.
        assert!((snapshot.biscuit1.vel[0] - 3.0 * PPM).abs() < 1e-3);
    }

    #[test]
    fn test_every_entity_always_appears() {
        let (mut world, mut registry) = setup();

        for biscuit in EntityId::BISCUITS {
            registry.apply_merge(
                &mut world,
                PendingMerge {
                    puck: EntityId::Puck2,
                    biscuit,
                },
            );
        }

        let snapshot = AgentSnapshot::capture(&world, &registry, PPM);
        for id in EntityId::ALL {
            let state = snapshot.get(id);
            assert!(state.pos[0].is_finite());
            assert!(state.pos[1].is_finite());
        }
    }

    #[test]
    fn test_snapshot_serde_roundtrip() {
        let (world, registry) = setup();
        let snapshot = AgentSnapshot::capture(&world, &registry, PPM);

        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: AgentSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, restored);
    }
}
