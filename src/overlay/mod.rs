//! OverlayAnimator: scripted bounding-box geometry over a fixed timeline.
//!
//! The primary box follows a pure function of elapsed time across four
//! phases (5 s total). Nine noise boxes are spawned lazily at the start of
//! each run and move in discrete steps until their individual disappearance
//! times. The animator has no timer of its own: the presentation layer calls
//! [`OverlayAnimator::frame`] on every display refresh.

use std::f64::consts::PI;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

mod clock;
pub mod noise;

pub use clock::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use noise::NoiseBox;

use noise::{NOISE_BOX_COUNT, SPAWN_WINDOW_SECONDS};

/// Fixed animation unit: one "inch" in pixels.
pub const INCH: f64 = 96.0;
pub const TIMELINE_SECONDS: f64 = 5.0;

const GROW_END: f64 = 1.0;
const SWEEP_END: f64 = 2.5;
const SHRINK_END: f64 = 4.0;
const SWEEP_CYCLES: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    fn lerp(self, to: Rect, u: f64) -> Rect {
        Rect {
            x: lerp(self.x, to.x, u),
            y: lerp(self.y, to.y, u),
            w: lerp(self.w, to.w, u),
            h: lerp(self.h, to.h, u),
        }
    }
}

fn lerp(from: f64, to: f64, u: f64) -> f64 {
    from + (to - from) * u
}

/// Geometry of the primary box at `t` seconds on a `width`×`height` canvas.
///
/// `t` is clamped to the timeline, so anything past the end holds the final box.
pub fn primary_box(t: f64, width: f64, height: f64) -> Rect {
    let t = if t.is_finite() {
        t.clamp(0.0, TIMELINE_SECONDS)
    } else {
        0.0
    };
    let banner = Rect::new(0.0, height * 0.25, width, height * 0.5);

    if t <= GROW_END {
        return Rect::new(0.0, 0.0, width, height).lerp(banner, t);
    }

    if t <= SWEEP_END {
        let u = (t - GROW_END) / (SWEEP_END - GROW_END);
        let travel = width - banner.w;
        let phase = ((u * SWEEP_CYCLES * 2.0 * PI).sin() + 1.0) / 2.0;
        return Rect { x: travel * phase, ..banner };
    }

    if t <= SHRINK_END {
        let u = (t - SWEEP_END) / (SHRINK_END - SWEEP_END);
        let side = lerp(0.5 * INCH, 0.25 * INCH, u);
        return Rect::new(3.0 * INCH, height - 0.5 * INCH - side, side, side);
    }

    let u = (t - SHRINK_END) / (TIMELINE_SECONDS - SHRINK_END);
    let side = 0.65 * INCH;
    let centered = Rect::new((width - side) / 2.0, (height - side) / 2.0, side, side);
    let end = Rect::new(
        (width - side) / 2.0 - 0.25 * INCH,
        height - side - 0.25 * INCH,
        side,
        side,
    );
    centered.lerp(end, u)
}

/// Mutable per-run animation state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationState {
    pub elapsed_seconds: f64,
    pub primary_box: Rect,
    pub noise_boxes: Vec<NoiseBox>,
}

impl AnimationState {
    fn initial(width: f64, height: f64) -> Self {
        Self {
            elapsed_seconds: 0.0,
            primary_box: primary_box(0.0, width, height),
            noise_boxes: Vec::new(),
        }
    }
}

/// What the presentation layer draws for one refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayFrame {
    pub elapsed_seconds: f64,
    pub primary: Rect,
    /// Only the noise boxes still visible at this time.
    pub noise: Vec<Rect>,
}

pub struct OverlayAnimator {
    width: f64,
    height: f64,
    clock: Arc<dyn TimeSource>,
    started: Instant,
    state: AnimationState,
    spawned: bool,
    rng: StdRng,
}

impl OverlayAnimator {
    pub fn new(width: f64, height: f64, seed: u64, clock: Arc<dyn TimeSource>) -> Self {
        let started = clock.now();
        Self {
            width,
            height,
            clock,
            started,
            state: AnimationState::initial(width, height),
            spawned: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_system_clock(width: f64, height: f64, seed: u64) -> Self {
        Self::new(width, height, seed, Arc::new(SystemTimeSource::default()))
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    /// Frame for the current time of the clock.
    pub fn frame(&mut self) -> OverlayFrame {
        let elapsed = self.clock.now().saturating_duration_since(self.started);
        self.frame_at(elapsed)
    }

    /// Frame at an explicit time since the last restart.
    pub fn frame_at(&mut self, elapsed: Duration) -> OverlayFrame {
        let t = elapsed.as_secs_f64();
        let elapsed_ms = t * 1_000.0;

        self.state.elapsed_seconds = t;
        self.state.primary_box = primary_box(t, self.width, self.height);

        if !self.spawned && t < SPAWN_WINDOW_SECONDS {
            self.spawn_noise();
        }

        let (width, height) = (self.width, self.height);
        let rng = &mut self.rng;
        let noise = self
            .state
            .noise_boxes
            .iter_mut()
            .filter(|b| b.is_visible(t))
            .map(|b| {
                b.maybe_step(elapsed_ms, rng, width, height);
                b.rect()
            })
            .collect();

        OverlayFrame {
            elapsed_seconds: t,
            primary: self.state.primary_box,
            noise,
        }
    }

    /// Start a new run: elapsed time returns to zero and noise boxes are
    /// cleared, to be spawned again by the next frame.
    pub fn restart(&mut self) {
        self.started = self.clock.now();
        self.state = AnimationState::initial(self.width, self.height);
        self.spawned = false;
        log::debug!("[Overlay] Animation restarted");
    }

    fn spawn_noise(&mut self) {
        self.state.noise_boxes = (0..NOISE_BOX_COUNT)
            .map(|_| NoiseBox::spawn(&mut self.rng, self.width, self.height))
            .collect();
        self.spawned = true;
    }
}
