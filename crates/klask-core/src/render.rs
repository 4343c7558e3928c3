//! Software rendering of the board into RGB pixel frames.
//!
//! The renderer is owned by the simulator instance and holds all display
//! state (pre-rendered board, frame pacing clock); nothing lives at module
//! scope. Presenting a frame on an actual screen is left to the embedding
//! application.

use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board;
use crate::entity::{Color, EntityId, EntityKind};
use crate::physics::PhysicsWorld;
use crate::registry::BodyRegistry;

/// How (and whether) frames are produced each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    /// Frames are produced and paced to the configured display rate.
    Human,
    /// Frames are produced as fast as the simulation runs.
    HumanUnclocked,
    /// Frames are produced without any pacing, for recording pipelines.
    RgbArray,
    /// No frames and no display state at all.
    #[default]
    Disabled,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized render mode `{0}`")]
pub struct ParseRenderModeError(String);

impl FromStr for RenderMode {
    type Err = ParseRenderModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(Self::Human),
            "human_unclocked" => Ok(Self::HumanUnclocked),
            "rgb_array" => Ok(Self::RgbArray),
            "none" => Ok(Self::Disabled),
            other => Err(ParseRenderModeError(other.to_owned())),
        }
    }
}

/// One rendered frame, RGB, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB bytes, `3 * width * height` long.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Color at a pixel. Panics when out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        let i = 3 * (y as usize * self.width as usize + x as usize);
        Color::rgb(self.data[i], self.data[i + 1], self.data[i + 2])
    }
}

/// Rasterizes the board and every tracked fixture into [`Frame`]s.
pub struct Renderer {
    width: u32,
    height: u32,
    /// Pixels per simulation unit.
    scale: f32,
    /// Pixels per physical-board meter.
    px_per_m: f32,
    background: Vec<u8>,
    frame_interval: Option<Duration>,
    last_frame: Option<Instant>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("paced", &self.frame_interval.is_some())
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Builds the renderer and its pre-rendered board background.
    /// Only [`RenderMode::Human`] gets a pacing clock.
    #[must_use]
    pub fn new(mode: RenderMode, length_scaler: f32, pixels_per_meter: f32, display_fps: u32) -> Self {
        let px_per_m = length_scaler * pixels_per_meter;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let width = (board::BOARD_WIDTH * px_per_m) as u32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let height = (board::BOARD_HEIGHT * px_per_m) as u32;

        let frame_interval = (mode == RenderMode::Human)
            .then(|| Duration::from_secs_f64(1.0 / f64::from(display_fps.max(1))));

        Self {
            width,
            height,
            scale: pixels_per_meter,
            px_per_m,
            background: render_board(width, height, px_per_m),
            frame_interval,
            last_frame: None,
        }
    }

    /// Draws the current world onto a copy of the board background. In paced
    /// mode this blocks until the next display deadline.
    pub fn render(&mut self, world: &PhysicsWorld, registry: &BodyRegistry) -> Frame {
        let mut data = self.background.clone();

        for id in EntityId::ALL {
            let Some(handle) = registry.body(id) else {
                continue;
            };
            let Some(body) = world.get_rigid_body(handle) else {
                continue;
            };
            let pos = body.translation();
            self.draw_piece(&mut data, pos.x, pos.y, id.kind(), id.color());
        }

        // Attached biscuits ride their host puck; same transform as the
        // snapshot path.
        for attached in registry.attached() {
            let Some(host) = registry.body(attached.host).and_then(|h| world.get_rigid_body(h))
            else {
                continue;
            };
            let pos = host
                .position()
                .transform_point(&rapier2d::prelude::Point::from(attached.offset));
            self.draw_piece(&mut data, pos.x, pos.y, EntityKind::Biscuit, attached.id.color());
        }

        self.pace();

        Frame {
            width: self.width,
            height: self.height,
            data,
        }
    }

    fn draw_piece(&self, data: &mut [u8], x: f32, y: f32, kind: EntityKind, color: Color) {
        let radius_m = match kind {
            EntityKind::Puck => board::PUCK_RADIUS,
            EntityKind::Ball => board::BALL_RADIUS,
            EntityKind::Biscuit => board::BISCUIT_RADIUS,
            EntityKind::Wall | EntityKind::Divider | EntityKind::Ground => return,
        };
        // Simulation units to pixels, y flipped to screen convention.
        let px = x * self.scale;
        let py = self.height as f32 - y * self.scale;
        fill_circle(data, self.width, self.height, px, py, radius_m * self.px_per_m, color);
    }

    fn pace(&mut self) {
        let Some(interval) = self.frame_interval else {
            return;
        };
        if let Some(last) = self.last_frame {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());
    }
}

/// Pre-renders the static board: felt, goals, corner rings, biscuit marks.
fn render_board(width: u32, height: u32, px_per_m: f32) -> Vec<u8> {
    let mut data = vec![0_u8; 3 * width as usize * height as usize];
    fill(&mut data, board::BOARD_COLOR);

    let cy = board::BOARD_HEIGHT / 2.0 * px_per_m;
    for [gx, gy] in [board::left_goal_center(), board::right_goal_center()] {
        fill_circle(
            &mut data,
            width,
            height,
            gx * px_per_m,
            gy * px_per_m,
            board::GOAL_RADIUS * px_per_m,
            board::GOAL_COLOR,
        );
    }

    let w = width as f32;
    let h = height as f32;
    for (cx, cy) in [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)] {
        draw_ring(
            &mut data,
            width,
            height,
            cx,
            cy,
            board::CORNER_RADIUS * px_per_m,
            board::CORNER_THICKNESS * px_per_m,
            board::CORNER_COLOR,
        );
    }

    let mark_x = board::BOARD_WIDTH / 2.0 * px_per_m;
    for dy in [0.0, board::BISCUIT_START_OFFSET_Y, -board::BISCUIT_START_OFFSET_Y] {
        draw_ring(
            &mut data,
            width,
            height,
            mark_x,
            cy + dy * px_per_m,
            board::BISCUIT_START_RADIUS * px_per_m,
            board::BISCUIT_START_THICKNESS * px_per_m,
            board::BISCUIT_START_COLOR,
        );
    }

    data
}

fn fill(data: &mut [u8], color: Color) {
    for px in data.chunks_exact_mut(3) {
        px[0] = color.r;
        px[1] = color.g;
        px[2] = color.b;
    }
}

fn put_pixel(data: &mut [u8], width: u32, x: u32, y: u32, color: Color) {
    let i = 3 * (y as usize * width as usize + x as usize);
    data[i] = color.r;
    data[i + 1] = color.g;
    data[i + 2] = color.b;
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scan_bounds(center: f32, radius: f32, limit: u32) -> (u32, u32) {
    let lo = (center - radius).floor().max(0.0) as u32;
    let hi = ((center + radius).ceil() as u32).min(limit.saturating_sub(1));
    (lo, hi)
}

fn fill_circle(data: &mut [u8], width: u32, height: u32, cx: f32, cy: f32, radius: f32, color: Color) {
    let (x0, x1) = scan_bounds(cx, radius, width);
    let (y0, y1) = scan_bounds(cy, radius, height);
    let r2 = radius * radius;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= r2 {
                put_pixel(data, width, x, y, color);
            }
        }
    }
}

/// Annulus between `radius - thickness` and `radius`, the stroke growing
/// inward like a painted line.
#[allow(clippy::too_many_arguments)]
fn draw_ring(
    data: &mut [u8],
    width: u32,
    height: u32,
    cx: f32,
    cy: f32,
    radius: f32,
    thickness: f32,
    color: Color,
) {
    let (x0, x1) = scan_bounds(cx, radius, width);
    let (y0, y1) = scan_bounds(cy, radius, height);
    let outer2 = radius * radius;
    let inner = (radius - thickness).max(0.0);
    let inner2 = inner * inner;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let d2 = dx * dx + dy * dy;
            if d2 <= outer2 && d2 >= inner2 {
                put_pixel(data, width, x, y, color);
            }
        }
    }
}
