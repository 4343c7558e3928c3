//! Per-step force application: magnetic attraction and table friction.
//!
//! Both effects must be recomputed every step from current positions and
//! velocities, before the engine advances. Magnetic forces persist across
//! steps inside the engine, so they are reset before being reapplied.

use rapier2d::prelude::*;

use crate::board;
use crate::entity::EntityId;
use crate::physics::PhysicsWorld;
use crate::registry::BodyRegistry;

/// Combined magnet constant k = permeability x charge^2 / 4pi, so the force
/// between a puck and a biscuit at distance d is k / d^2.
#[must_use]
pub fn magnet_constant() -> f32 {
    board::PERMEABILITY_AIR * board::MAGNETIC_CHARGE * board::MAGNETIC_CHARGE
        / (4.0 * std::f32::consts::PI)
}

/// Force one puck exerts on one biscuit: magnitude k / d^2, directed from the
/// biscuit toward the puck. Zero if the two centers coincide.
#[must_use]
pub fn magnet_force(puck_pos: Vector<f32>, biscuit_pos: Vector<f32>) -> Vector<f32> {
    let displacement = puck_pos - biscuit_pos;
    let distance = displacement.norm();
    if distance <= f32::EPSILON {
        return Vector::zeros();
    }
    // unit direction x k / d^2
    displacement * (magnet_constant() / (distance * distance * distance))
}

/// Applies the superposed attraction from both pucks to every free biscuit.
/// Merged biscuits are no longer in the candidate set and feel nothing; no
/// reaction force is applied back to the pucks.
pub fn apply_magnet_forces(world: &mut PhysicsWorld, registry: &BodyRegistry) {
    let puck_positions: Vec<Vector<f32>> = EntityId::PUCKS
        .into_iter()
        .filter_map(|id| registry.body(id))
        .filter_map(|handle| world.get_rigid_body(handle))
        .map(|body| *body.translation())
        .collect();

    for (_, handle) in registry.free_biscuits() {
        let Some(biscuit) = world.get_rigid_body_mut(handle) else {
            continue;
        };
        let biscuit_pos = *biscuit.translation();
        let total: Vector<f32> = puck_positions
            .iter()
            .map(|&puck_pos| magnet_force(puck_pos, biscuit_pos))
            .sum();

        // add_force accumulates across steps, so clear last step's force
        // before applying the fresh one.
        biscuit.reset_forces(true);
        biscuit.add_force(total, true);
    }
}

/// Decays the velocity of the ball and every free biscuit against the ground
/// reference, with the stopping impulse capped at mass x gravity x dt. A
/// body slower than the cap stops completely; pucks are driven directly and
/// get no table friction.
pub fn apply_table_friction(world: &mut PhysicsWorld, registry: &BodyRegistry) {
    let dt = world.integration_parameters.dt;

    let mut targets = Vec::with_capacity(4);
    if let Some(ball) = registry.body(EntityId::Ball) {
        targets.push(ball);
    }
    targets.extend(registry.free_biscuits().into_iter().map(|(_, h)| h));

    for handle in targets {
        let Some(body) = world.get_rigid_body_mut(handle) else {
            continue;
        };
        let velocity = *body.linvel();
        let speed = velocity.norm();
        if speed <= f32::EPSILON {
            continue;
        }
        let mass = body.mass();
        let magnitude = (mass * speed).min(mass * board::TABLE_GRAVITY * dt);
        body.apply_impulse(velocity * (-magnitude / speed), true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use crate::registry::BodyRegistry;

    const SCALER: f32 = 100.0;

    fn setup() -> (PhysicsWorld, BodyRegistry) {
        let mut world = PhysicsWorld::default();
        let registry = BodyRegistry::build(&mut world, SCALER, board::corner_ball_starts()[0]);
        (world, registry)
    }

    #[test]
    fn test_magnet_force_magnitude_and_direction() {
        let d = 3.0;
        let force = magnet_force(Vector::zeros(), Vector::new(d, 0.0));

        // Pulled from (d, 0) toward the puck at the origin.
        assert!(force.x < 0.0);
        assert!((force.y).abs() < 1e-9);
        assert!((force.norm() - magnet_constant() / (d * d)).abs() < 1e-9);
    }

    #[test]
    fn test_magnet_force_inverse_square_scaling() {
        let near = magnet_force(Vector::zeros(), Vector::new(2.0, 0.0)).norm();
        let far = magnet_force(Vector::zeros(), Vector::new(4.0, 0.0)).norm();

        // Doubling the distance drops the force to a quarter.
        assert!((near / far - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_magnet_force_coincident_bodies_is_zero() {
        let pos = Vector::new(5.0, 5.0);
        assert_eq!(magnet_force(pos, pos), Vector::zeros());
    }

    #[test]
    fn test_forces_from_both_pucks_superpose() {
        let (mut world, registry) = setup();

        // The center biscuit sits exactly between the pucks, so the two
        // pulls cancel and the applied force is (numerically) zero.
        apply_magnet_forces(&mut world, &registry);
        let handle = registry.body(EntityId::Biscuit1).unwrap();
        let force = world.get_rigid_body(handle).unwrap().user_force();
        assert!(force.norm() < 1e-6);
    }

    #[test]
    fn test_no_reaction_force_on_pucks() {
        let (mut world, registry) = setup();

        apply_magnet_forces(&mut world, &registry);
        for puck in EntityId::PUCKS {
            let handle = registry.body(puck).unwrap();
            let force = world.get_rigid_body(handle).unwrap().user_force();
            assert_eq!(force, Vector::zeros());
        }
    }

    #[test]
    fn test_merged_biscuit_feels_no_attraction() {
        let (mut world, mut registry) = setup();

        registry.apply_merge(
            &mut world,
            crate::contact::PendingMerge {
                puck: EntityId::Puck1,
                biscuit: EntityId::Biscuit2,
            },
        );

        // Only the two still-free biscuits are candidates.
        assert_eq!(registry.free_biscuits().len(), 2);
        apply_magnet_forces(&mut world, &registry);
    }

    #[test]
    fn test_table_friction_reduces_speed_monotonically() {
        let (mut world, registry) = setup();

        let handle = registry.body(EntityId::Ball).unwrap();
        world
            .get_rigid_body_mut(handle)
            .unwrap()
            .set_linvel(Vector::new(8.0, -6.0), true);

        let mut previous = 10.0_f32;
        for _ in 0..30 {
            apply_table_friction(&mut world, &registry);
            world.step(&());
            let speed = world.get_rigid_body(handle).unwrap().linvel().norm();
            assert!(speed <= previous + 1e-5);
            previous = speed;
        }
    }

    #[test]
    fn test_table_friction_stops_a_slow_body() {
        let (mut world, registry) = setup();

        let handle = registry.body(EntityId::Ball).unwrap();
        let dt = world.integration_parameters.dt;
        // Slower than one step's worth of stopping impulse.
        let crawl = board::TABLE_GRAVITY * dt * 0.5;
        world
            .get_rigid_body_mut(handle)
            .unwrap()
            .set_linvel(Vector::new(crawl, 0.0), true);

        apply_table_friction(&mut world, &registry);
        let speed = world.get_rigid_body(handle).unwrap().linvel().norm();
        assert!(speed < 1e-6);
    }

    proptest! {
        #[test]
        fn test_magnet_force_law_holds_for_any_distance(d in 0.1_f32..100.0) {
            let force = magnet_force(Vector::zeros(), Vector::new(d, 0.0));
            let expected = magnet_constant() / (d * d);
            prop_assert!((force.norm() - expected).abs() <= expected * 1e-4);

            let doubled = magnet_force(Vector::zeros(), Vector::new(2.0 * d, 0.0));
            prop_assert!((force.norm() / doubled.norm() - 4.0).abs() < 1e-2);
        }
    }
}
