//! Pan and zoom.

use std::time::Duration;

use serde::Serialize;

use crate::chart::transition::ease_cubic_in_out;
use crate::chart::{lerp, Point};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 4.0;
pub const INITIAL_SCALE: f64 = 0.85;
/// Distance of the root from the top edge before any interaction.
pub const INITIAL_TOP_OFFSET: f64 = 80.0;
pub const RECENTER_DURATION: Duration = Duration::from_millis(750);

/// Screen transform: `screen = layout * k + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { x: 0.0, y: 0.0, k: 1.0 };

    pub fn apply(&self, p: Point) -> Point {
        Point::new(p.x * self.k + self.x, p.y * self.k + self.y)
    }

    pub fn invert(&self, screen: Point) -> Point {
        Point::new((screen.x - self.x) / self.k, (screen.y - self.y) / self.k)
    }

    fn lerp(&self, other: &Transform, t: f64) -> Transform {
        Transform {
            x: lerp(self.x, other.x, t),
            y: lerp(self.y, other.y, t),
            k: lerp(self.k, other.k, t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pan {
    from: Transform,
    to: Transform,
    started: Duration,
}

/// The visible window onto the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    width: f64,
    height: f64,
    transform: Transform,
    pan: Option<Pan>,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            transform: Self::initial_transform(width),
            pan: None,
        }
    }

    /// Root centered horizontally near the top, slightly zoomed out.
    pub fn initial_transform(width: f64) -> Transform {
        Transform {
            x: width / 2.0,
            y: INITIAL_TOP_OFFSET,
            k: INITIAL_SCALE,
        }
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// The transform on screen at `now`.
    pub fn transform_at(&self, now: Duration) -> Transform {
        match &self.pan {
            Some(pan) => {
                let elapsed = now.saturating_sub(pan.started);
                if elapsed >= RECENTER_DURATION {
                    pan.to
                } else {
                    let t = elapsed.as_secs_f64() / RECENTER_DURATION.as_secs_f64();
                    pan.from.lerp(&pan.to, ease_cubic_in_out(t))
                }
            }
            None => self.transform,
        }
    }

    pub fn is_animating(&self, now: Duration) -> bool {
        self.pan
            .is_some_and(|pan| now.saturating_sub(pan.started) < RECENTER_DURATION)
    }

    /// Pan so `target` lands at the horizontal center, a third of the way
    /// down, keeping the current scale.
    pub fn center_on(&mut self, target: Point, now: Duration) {
        let from = self.transform_at(now);
        let to = Transform {
            x: -target.x * from.k + self.width / 2.0,
            y: -target.y * from.k + self.height / 3.0,
            k: from.k,
        };
        self.transform = to;
        self.pan = Some(Pan {
            from,
            to,
            started: now,
        });
    }

    /// Drag by a screen-space delta. Interrupts any re-centering.
    pub fn pan_by(&mut self, dx: f64, dy: f64, now: Duration) {
        let current = self.transform_at(now);
        self.transform = Transform {
            x: current.x + dx,
            y: current.y + dy,
            k: current.k,
        };
        self.pan = None;
    }

    /// Multiply the scale by `factor` around a screen-space focus point.
    pub fn zoom_by(&mut self, factor: f64, focus: Point, now: Duration) {
        let current = self.transform_at(now);
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let k = (current.k * factor).clamp(MIN_SCALE, MAX_SCALE);
        let anchor = current.invert(focus);
        self.transform = Transform {
            x: focus.x - anchor.x * k,
            y: focus.y - anchor.y * k,
            k,
        };
        self.pan = None;
    }

    /// Adopt a new window size and reset to the initial transform.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.transform = Self::initial_transform(width);
        self.pan = None;
    }
}
