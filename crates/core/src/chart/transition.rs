//! Animated change from one layout to the next.
//!
//! A [`Transition`] is built from whatever is on screen at the moment it
//! starts, so restarting mid-flight continues from the displayed positions
//! instead of jumping.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::chart::layout::Layout;
use crate::chart::scene::GlyphSnapshot;
use crate::chart::{lerp, Point};
use crate::member::MemberId;
use crate::tree::MarriageEdge;

pub const TRANSITION_DURATION: Duration = Duration::from_millis(500);

/// Cubic ease-in-out over `t` in `[0, 1]`.
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// How one node is drawn at an instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeFrame {
    pub position: Point,
    /// Glyph size relative to full size.
    pub scale: f64,
    pub label_opacity: f64,
}

impl NodeFrame {
    pub fn settled(position: Point) -> Self {
        Self {
            position,
            scale: 1.0,
            label_opacity: 1.0,
        }
    }

    /// Collapsed to a point, as entering nodes start and exiting nodes end.
    pub fn hidden(position: Point) -> Self {
        Self {
            position,
            scale: 0.0,
            label_opacity: 0.0,
        }
    }

    fn lerp(&self, other: &NodeFrame, t: f64) -> NodeFrame {
        NodeFrame {
            position: self.position.lerp(other.position, t),
            scale: lerp(self.scale, other.scale, t),
            label_opacity: lerp(self.label_opacity, other.label_opacity, t),
        }
    }
}

/// A node sampled from a transition.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSample {
    pub id: MemberId,
    pub frame: NodeFrame,
    pub exiting: bool,
    /// Set on exiting nodes so they can be drawn after leaving the data.
    pub snapshot: Option<GlyphSnapshot>,
}

/// A marriage edge sampled from a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSample {
    pub edge: MarriageEdge,
    pub opacity: f64,
}

#[derive(Debug, Clone)]
struct NodeTrack {
    id: MemberId,
    from: NodeFrame,
    to: NodeFrame,
    exiting: bool,
    snapshot: Option<GlyphSnapshot>,
}

#[derive(Debug, Clone)]
struct EdgeTrack {
    edge: MarriageEdge,
    from: f64,
    to: f64,
}

/// Interpolation between the displayed state and a target layout.
#[derive(Debug, Clone)]
pub struct Transition {
    started: Duration,
    nodes: Vec<NodeTrack>,
    edges: Vec<EdgeTrack>,
}

/// What the transition animates from.
pub struct TransitionStart<'a> {
    /// Frames currently on screen, including nodes still exiting. Nodes that
    /// may leave should carry a snapshot taken before the data changed.
    pub displayed: &'a [NodeSample],
    /// Edge opacities currently on screen.
    pub displayed_edges: &'a [EdgeSample],
    /// Where the node that triggered the change was before it.
    pub source_before: Point,
    /// Where that node is in the target layout.
    pub source_after: Point,
}

impl Transition {
    /// Animate from `start` to `target` with `edges` as the visible
    /// marriages, beginning at `now`.
    pub fn begin(
        start: TransitionStart<'_>,
        target: &Layout,
        edges: &[MarriageEdge],
        now: Duration,
    ) -> Self {
        let displayed: HashMap<MemberId, NodeFrame> =
            start.displayed.iter().map(|s| (s.id, s.frame)).collect();

        let mut nodes = Vec::new();
        for id in target.order() {
            let Some(position) = target.position(*id) else {
                continue;
            };
            let from = displayed
                .get(id)
                .copied()
                .unwrap_or_else(|| NodeFrame::hidden(start.source_before));
            nodes.push(NodeTrack {
                id: *id,
                from,
                to: NodeFrame::settled(position),
                exiting: false,
                snapshot: None,
            });
        }
        for sample in start.displayed {
            if !target.contains(sample.id) {
                nodes.push(NodeTrack {
                    id: sample.id,
                    from: sample.frame,
                    to: NodeFrame::hidden(start.source_after),
                    exiting: true,
                    snapshot: sample.snapshot.clone(),
                });
            }
        }

        let shown: HashMap<MarriageEdge, f64> = start
            .displayed_edges
            .iter()
            .map(|s| (s.edge, s.opacity))
            .collect();
        let wanted: HashSet<MarriageEdge> = edges.iter().copied().collect();
        let mut edge_tracks: Vec<EdgeTrack> = edges
            .iter()
            .map(|edge| EdgeTrack {
                edge: *edge,
                from: shown.get(edge).copied().unwrap_or(0.0),
                to: 1.0,
            })
            .collect();
        edge_tracks.extend(
            start
                .displayed_edges
                .iter()
                .filter(|s| !wanted.contains(&s.edge))
                .map(|s| EdgeTrack {
                    edge: s.edge,
                    from: s.opacity,
                    to: 0.0,
                }),
        );

        Self {
            started: now,
            nodes,
            edges: edge_tracks,
        }
    }

    /// Eased progress in `[0, 1]` at `now`.
    pub fn progress(&self, now: Duration) -> f64 {
        let elapsed = now.saturating_sub(self.started);
        ease_cubic_in_out(elapsed.as_secs_f64() / TRANSITION_DURATION.as_secs_f64())
    }

    pub fn is_finished(&self, now: Duration) -> bool {
        now.saturating_sub(self.started) >= TRANSITION_DURATION
    }

    /// Node frames at `now`. Exiting nodes are dropped once finished.
    pub fn nodes_at(&self, now: Duration) -> Vec<NodeSample> {
        let t = self.progress(now);
        let finished = self.is_finished(now);
        self.nodes
            .iter()
            .filter(|track| !(finished && track.exiting))
            .map(|track| NodeSample {
                id: track.id,
                frame: track.from.lerp(&track.to, t),
                exiting: track.exiting,
                snapshot: track.snapshot.clone(),
            })
            .collect()
    }

    /// Marriage edge opacities at `now`. Faded-out edges are dropped once
    /// finished.
    pub fn edges_at(&self, now: Duration) -> Vec<EdgeSample> {
        let t = self.progress(now);
        let finished = self.is_finished(now);
        self.edges
            .iter()
            .filter(|track| !(finished && track.to == 0.0))
            .map(|track| EdgeSample {
                edge: track.edge,
                opacity: lerp(track.from, track.to, t),
            })
            .collect()
    }
}
