//! Erratic "noise" boxes that jitter around the canvas early in the timeline.

use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;

use super::{Rect, INCH};

pub const NOISE_BOX_COUNT: usize = 9;
/// Boxes spawn on the first frame observed before this time after a reset.
pub const SPAWN_WINDOW_SECONDS: f64 = 0.2;

const MIN_SIDE_INCHES: f64 = 0.15;
const MAX_SIDE_INCHES: f64 = 0.5;
const MIN_SPEED: f64 = 2.0;
const MAX_SPEED: f64 = 6.0;
const FLIP_PROBABILITY: f64 = 0.15;
const JITTER_PROBABILITY: f64 = 0.10;
const JITTER_PX: i32 = 4;
const MIN_JITTERED_SIDE: f64 = 8.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoiseBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub vx: f64,
    pub vy: f64,
    pub disappear_at: f64,
    pub step_interval_ms: f64,
    pub last_step_ms: f64,
}

impl NoiseBox {
    pub fn spawn(rng: &mut StdRng, width: f64, height: f64) -> Self {
        let w = rng.gen_range(MIN_SIDE_INCHES..=MAX_SIDE_INCHES) * INCH;
        let h = rng.gen_range(MIN_SIDE_INCHES..=MAX_SIDE_INCHES) * INCH;
        let x = rng.gen_range(0.0..=(width - w).max(0.0));
        let y = rng.gen_range(0.0..=(height - h).max(0.0));

        Self {
            x,
            y,
            w,
            h,
            vx: random_velocity(rng),
            vy: random_velocity(rng),
            disappear_at: rng.gen_range(2.6..4.6),
            step_interval_ms: rng.gen_range(60.0..140.0),
            last_step_ms: 0.0,
        }
    }

    pub fn is_visible(&self, t: f64) -> bool {
        t <= self.disappear_at
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    /// Advance one step if the box's interval has elapsed. Returns whether it moved.
    pub fn maybe_step(&mut self, elapsed_ms: f64, rng: &mut StdRng, width: f64, height: f64) -> bool {
        if elapsed_ms - self.last_step_ms < self.step_interval_ms {
            return false;
        }
        self.last_step_ms = elapsed_ms;

        if rng.gen_bool(FLIP_PROBABILITY) {
            self.vx = -self.vx;
        }
        if rng.gen_bool(FLIP_PROBABILITY) {
            self.vy = -self.vy;
        }

        self.x += self.vx.round();
        self.y += self.vy.round();

        if rng.gen_bool(JITTER_PROBABILITY) {
            self.w = (self.w + f64::from(rng.gen_range(-JITTER_PX..=JITTER_PX))).max(MIN_JITTERED_SIDE);
            self.h = (self.h + f64::from(rng.gen_range(-JITTER_PX..=JITTER_PX))).max(MIN_JITTERED_SIDE);
        }

        self.bounce(width, height);
        true
    }

    fn bounce(&mut self, width: f64, height: f64) {
        if self.x < 0.0 {
            self.x = 0.0;
            self.vx = self.vx.abs();
        } else if self.x + self.w > width {
            self.x = (width - self.w).max(0.0);
            self.vx = -self.vx.abs();
        }

        if self.y < 0.0 {
            self.y = 0.0;
            self.vy = self.vy.abs();
        } else if self.y + self.h > height {
            self.y = (height - self.h).max(0.0);
            self.vy = -self.vy.abs();
        }
    }
}

fn random_velocity(rng: &mut StdRng) -> f64 {
    let speed = rng.gen_range(MIN_SPEED..=MAX_SPEED);
    if rng.gen_bool(0.5) {
        speed
    } else {
        -speed
    }
}
