//! Static board layout shared by world construction, rules, and rendering.
//!
//! Lengths are in meters on the physical board. The simulator multiplies
//! them by `SimConfig::length_scaler` before handing them to the physics
//! engine, which does not behave well at centimeter scale, and by
//! `pixels_per_meter` on top of that when reporting pixel coordinates.

use crate::entity::Color;

/// Playfield width. 0.3937 x 0.3048 m yields the canonical 787 x 609 px
/// frame at the default scaling.
pub const BOARD_WIDTH: f32 = 0.3937;
/// Playfield height.
pub const BOARD_HEIGHT: f32 = 0.3048;

/// Width of the puck-exclusion band straddling the center line. The ball
/// and biscuits pass through it freely.
pub const DIVIDER_WIDTH: f32 = 0.02;

/// Distance from a short wall to the goal center on that side.
pub const GOAL_OFFSET_X: f32 = 0.0635;
/// A body whose center is within this distance of a goal center is in the
/// goal.
pub const GOAL_RADIUS: f32 = 0.019;

/// Radius of the painted quarter-circle corner marks.
pub const CORNER_RADIUS: f32 = 0.0508;
pub const CORNER_THICKNESS: f32 = 0.004;

pub const PUCK_RADIUS: f32 = 0.0145;
pub const PUCK_MASS: f32 = 0.015;

pub const BALL_RADIUS: f32 = 0.008_75;
pub const BALL_MASS: f32 = 0.0027;

pub const BISCUIT_RADIUS: f32 = 0.007_05;
pub const BISCUIT_MASS: f32 = 0.001_75;
/// Vertical spacing between the center biscuit and its two neighbours.
pub const BISCUIT_START_OFFSET_Y: f32 = 0.0635;
/// Radius of the painted biscuit start marks.
pub const BISCUIT_START_RADIUS: f32 = 0.0095;
pub const BISCUIT_START_THICKNESS: f32 = 0.003;

/// Restitution for the ball and free biscuits. Pucks are dead on contact.
pub const RESTITUTION: f32 = 0.8;

/// Downward acceleration sizing the table-friction stopping force
/// (max force = mass x this), standing in for gravity on a flat board.
pub const TABLE_GRAVITY: f32 = 9.81;

/// Magnetic permeability of air, H/m.
pub const PERMEABILITY_AIR: f32 = 1.256_637e-6;
/// Pole strength of the puck and biscuit magnets, A*m.
pub const MAGNETIC_CHARGE: f32 = 1500.0;

pub const BOARD_COLOR: Color = Color::rgb(102, 163, 210);
pub const GOAL_COLOR: Color = Color::rgb(36, 70, 122);
pub const CORNER_COLOR: Color = Color::rgb(235, 235, 235);
pub const BISCUIT_START_COLOR: Color = Color::rgb(235, 235, 235);
pub const PUCK_COLOR: Color = Color::rgb(24, 24, 24);
pub const BALL_COLOR: Color = Color::rgb(247, 214, 71);
pub const BISCUIT_COLOR: Color = Color::rgb(245, 245, 245);

/// Center of the left (player 1 side) goal.
pub fn left_goal_center() -> [f32; 2] {
    [GOAL_OFFSET_X, BOARD_HEIGHT / 2.0]
}

/// Center of the right (player 2 side) goal.
pub fn right_goal_center() -> [f32; 2] {
    [BOARD_WIDTH - GOAL_OFFSET_X, BOARD_HEIGHT / 2.0]
}

pub fn puck1_start() -> [f32; 2] {
    [BOARD_WIDTH / 3.0, BOARD_HEIGHT / 2.0]
}

pub fn puck2_start() -> [f32; 2] {
    [2.0 * BOARD_WIDTH / 3.0, BOARD_HEIGHT / 2.0]
}

/// Biscuit start marks: board center and one mark above and below it.
pub fn biscuit_starts() -> [[f32; 2]; 3] {
    let x = BOARD_WIDTH / 2.0;
    let y = BOARD_HEIGHT / 2.0;
    [
        [x, y],
        [x, y + BISCUIT_START_OFFSET_Y],
        [x, y - BISCUIT_START_OFFSET_Y],
    ]
}

/// Ball start points, inset half a corner radius from each corner.
/// Order: top right, bottom right, top left, bottom left.
pub fn corner_ball_starts() -> [[f32; 2]; 4] {
    let inset = CORNER_RADIUS / 2.0;
    [
        [BOARD_WIDTH - inset, BOARD_HEIGHT - inset],
        [BOARD_WIDTH - inset, inset],
        [inset, BOARD_HEIGHT - inset],
        [inset, inset],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goals_are_mirrored() {
        let [lx, ly] = left_goal_center();
        let [rx, ry] = right_goal_center();
        assert!((lx + rx - BOARD_WIDTH).abs() < 1e-6);
        assert!((ly - ry).abs() < 1e-6);
    }

    #[test]
    fn test_pucks_start_in_their_own_half() {
        assert!(puck1_start()[0] < BOARD_WIDTH / 2.0);
        assert!(puck2_start()[0] > BOARD_WIDTH / 2.0);
    }

    #[test]
    fn test_corner_starts_are_inside_the_board() {
        for [x, y] in corner_ball_starts() {
            assert!(x > 0.0 && x < BOARD_WIDTH);
            assert!(y > 0.0 && y < BOARD_HEIGHT);
        }
    }
}
