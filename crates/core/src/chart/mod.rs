//! Interactive tree chart engine.
//!
//! The chart is a pure state machine driven by the caller's clock: every
//! method that can start an animation takes `now`, the time elapsed since
//! some fixed origin, and [`ChartState::frame`] samples what should be on
//! screen at a given instant. Nothing here touches a real display; a frame
//! is a [`Scene`] that can be serialized with [`svg::render`].
//!
//! - [`layout`]: tidy-tree positions for the currently expanded nodes.
//! - [`viewport`]: pan/zoom transform and the re-centering animation.
//! - [`transition`]: node and edge interpolation between two layouts.
//! - [`scene`]: the three draw layers and glyph encoding.
//! - [`state`]: the collapsed set and the interaction entry points.

pub mod layout;
pub mod scene;
pub mod state;
pub mod svg;
pub mod transition;
pub mod viewport;

pub use layout::Layout;
pub use scene::{GlyphKind, Scene};
pub use state::{ChartEvent, ChartState};
pub use transition::Transition;
pub use viewport::{Transform, Viewport};

/// A position in layout (tree) coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Linear interpolation towards `other`.
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point {
            x: lerp(self.x, other.x, t),
            y: lerp(self.y, other.y, t),
        }
    }
}

pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
