//! Drawable frame of the chart.
//!
//! Layers are painted back to front: marriage edges, parent-child links, then
//! node glyphs. Anything whose position is not finite is left out.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::chart::transition::{EdgeSample, NodeSample};
use crate::chart::viewport::Transform;
use crate::chart::Point;
use crate::member::{Member, MemberId, Relationship};
use crate::tree::FamilyTree;

pub const NODE_RADIUS: f64 = 24.0;
/// Vertical offset of a label below its node center.
pub const LABEL_OFFSET: f64 = 35.0;
pub const MAX_LABEL_CHARS: usize = 15;
const TRUNCATED_LABEL_CHARS: usize = 12;
/// Minimum rise of a marriage arc above the higher endpoint.
pub const MARRIAGE_ARC_MIN: f64 = 60.0;
pub const MARRIAGE_ARC_FACTOR: f64 = 0.2;
pub const MARRIAGE_STROKE: &str = "#d4af37";
pub const MARRIAGE_DASH: &str = "4,4";
pub const LINK_STROKE: &str = "#a8a29e";

/// Draw layers in paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Marriage,
    Links,
    Nodes,
}

impl Layer {
    pub const PAINT_ORDER: [Layer; 3] = [Layer::Marriage, Layer::Links, Layer::Nodes];

    pub fn class_name(self) -> &'static str {
        match self {
            Layer::Marriage => "layer-marriage",
            Layer::Links => "layer-links",
            Layer::Nodes => "layer-nodes",
        }
    }
}

/// Visual encoding of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GlyphKind {
    Root,
    Spouse,
    /// Has hidden children.
    Collapsed,
    /// Expanded with children.
    Internal,
    Leaf,
}

impl GlyphKind {
    pub fn fill(self) -> &'static str {
        match self {
            GlyphKind::Root => "#163c2c",
            GlyphKind::Spouse => "#b4942b",
            GlyphKind::Collapsed => "#f5eadb",
            GlyphKind::Internal | GlyphKind::Leaf => "#fff",
        }
    }

    pub fn stroke(self) -> &'static str {
        match self {
            GlyphKind::Root => "#0f291e",
            GlyphKind::Spouse => "#917622",
            GlyphKind::Collapsed => "#163c2c",
            GlyphKind::Internal => "#78716c",
            GlyphKind::Leaf => "#a8a29e",
        }
    }

    /// Color of the placeholder person icon drawn when there is no photo.
    pub fn icon_color(self) -> &'static str {
        match self {
            GlyphKind::Root | GlyphKind::Spouse => "#fdfbf7",
            _ => "#a8a29e",
        }
    }
}

/// Shorten long names to fit under a node.
pub fn truncate_label(name: &str) -> String {
    if name.chars().count() > MAX_LABEL_CHARS {
        let head: String = name.chars().take(TRUNCATED_LABEL_CHARS).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

/// Control point of the quadratic marriage arc between `s` and `t`.
pub fn marriage_control(s: Point, t: Point) -> Point {
    let rise = MARRIAGE_ARC_MIN.max((t.x - s.x).abs() * MARRIAGE_ARC_FACTOR);
    Point::new((s.x + t.x) / 2.0, s.y.min(t.y) - rise)
}

/// Glyph encoding of `member` given the current collapsed set.
pub fn glyph_kind(tree: &FamilyTree, collapsed: &HashSet<MemberId>, member: &Member) -> GlyphKind {
    match member.relationship {
        Relationship::Root => GlyphKind::Root,
        Relationship::Spouse => GlyphKind::Spouse,
        Relationship::Child if !tree.has_children(member.id) => GlyphKind::Leaf,
        Relationship::Child if collapsed.contains(&member.id) => GlyphKind::Collapsed,
        Relationship::Child => GlyphKind::Internal,
    }
}

/// How a node looked when it was last in the data. Exiting nodes are drawn
/// from this, since the member may already be gone from the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphSnapshot {
    pub name: String,
    pub kind: GlyphKind,
    pub parent_id: Option<MemberId>,
    pub photo_url: Option<String>,
}

impl GlyphSnapshot {
    pub fn capture(tree: &FamilyTree, collapsed: &HashSet<MemberId>, id: MemberId) -> Option<Self> {
        let member = tree.get(id)?;
        Some(Self {
            name: member.name.clone(),
            kind: glyph_kind(tree, collapsed, member),
            parent_id: member.parent_id,
            photo_url: member.has_photo().then(|| member.photo_url.clone()).flatten(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeGlyph {
    pub id: MemberId,
    pub position: Point,
    pub radius: f64,
    pub kind: GlyphKind,
    pub label: String,
    pub label_opacity: f64,
    pub photo_url: Option<String>,
}

/// Parent-child connector, drawn as a vertical cubic diagonal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkPath {
    pub parent: MemberId,
    pub child: MemberId,
    pub from: Point,
    pub to: Point,
}

impl LinkPath {
    /// Both control points sit at the vertical midpoint.
    pub fn controls(&self) -> (Point, Point) {
        let mid_y = (self.from.y + self.to.y) / 2.0;
        (Point::new(self.from.x, mid_y), Point::new(self.to.x, mid_y))
    }
}

/// Dashed spouse connector, a quadratic arc above both partners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarriagePath {
    pub a: MemberId,
    pub b: MemberId,
    pub from: Point,
    pub control: Point,
    pub to: Point,
    pub opacity: f64,
}

/// Everything needed to paint one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub transform: Transform,
    pub marriages: Vec<MarriagePath>,
    pub links: Vec<LinkPath>,
    pub nodes: Vec<NodeGlyph>,
}

impl Scene {
    /// Build a frame from sampled node and edge states.
    pub fn compose(
        tree: &FamilyTree,
        collapsed: &HashSet<MemberId>,
        nodes: &[NodeSample],
        edges: &[EdgeSample],
        transform: Transform,
        (width, height): (f64, f64),
    ) -> Self {
        let positions: HashMap<MemberId, Point> = nodes
            .iter()
            .filter(|s| s.frame.position.is_finite())
            .map(|s| (s.id, s.frame.position))
            .collect();

        let marriages = edges
            .iter()
            .filter_map(|sample| {
                let from = *positions.get(&sample.edge.a)?;
                let to = *positions.get(&sample.edge.b)?;
                Some(MarriagePath {
                    a: sample.edge.a,
                    b: sample.edge.b,
                    from,
                    control: marriage_control(from, to),
                    to,
                    opacity: sample.opacity,
                })
            })
            .collect();

        let links = nodes
            .iter()
            .filter_map(|sample| {
                let parent = match &sample.snapshot {
                    Some(snapshot) if sample.exiting => snapshot.parent_id,
                    _ => tree.parent_id(sample.id),
                }?;
                Some(LinkPath {
                    parent,
                    child: sample.id,
                    from: *positions.get(&parent)?,
                    to: *positions.get(&sample.id)?,
                })
            })
            .collect();

        let glyphs = nodes
            .iter()
            .filter(|s| positions.contains_key(&s.id))
            .filter_map(|sample| {
                let snapshot = match &sample.snapshot {
                    Some(snapshot) if sample.exiting => snapshot.clone(),
                    _ => GlyphSnapshot::capture(tree, collapsed, sample.id)?,
                };
                Some(NodeGlyph {
                    id: sample.id,
                    position: sample.frame.position,
                    radius: NODE_RADIUS * sample.frame.scale,
                    kind: snapshot.kind,
                    label: truncate_label(&snapshot.name),
                    label_opacity: sample.frame.label_opacity,
                    photo_url: snapshot.photo_url,
                })
            })
            .collect();

        Self {
            width,
            height,
            transform,
            marriages,
            links,
            nodes: glyphs,
        }
    }

    pub fn node(&self, id: MemberId) -> Option<&NodeGlyph> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::transition::NodeFrame;
    use crate::tree::tests::{child, married, member, root};
    use crate::tree::MarriageEdge;

    fn sample(id: MemberId, x: f64, y: f64) -> NodeSample {
        NodeSample {
            id,
            frame: NodeFrame::settled(Point::new(x, y)),
            exiting: false,
            snapshot: None,
        }
    }

    fn family() -> FamilyTree {
        let (a, b) = married(child(2, "Amina", 1), child(3, "Omar", 1));
        let wife: Member = member(4, "Awa", Relationship::Spouse, Some(1));
        FamilyTree::assemble(vec![root(1, "r"), a, b, wife, child(5, "Khalil", 2)]).unwrap()
    }

    fn compose(tree: &FamilyTree, collapsed: &HashSet<MemberId>, nodes: &[NodeSample]) -> Scene {
        let edges: Vec<EdgeSample> = tree
            .marriages()
            .iter()
            .map(|edge| EdgeSample { edge: *edge, opacity: 1.0 })
            .collect();
        Scene::compose(tree, collapsed, nodes, &edges, Transform::IDENTITY, (800.0, 600.0))
    }

    #[test]
    fn labels_over_fifteen_chars_are_truncated() {
        assert_eq!(truncate_label("Amina Sano"), "Amina Sano");
        assert_eq!(truncate_label("Fifteen chars!!"), "Fifteen chars!!");
        assert_eq!(truncate_label("Aminata Khadija Sano"), "Aminata Khad...");
    }

    #[test]
    fn marriage_arc_rises_at_least_sixty() {
        let close = marriage_control(Point::new(0.0, 160.0), Point::new(160.0, 160.0));
        assert_eq!(close, Point::new(80.0, 100.0));
        let far = marriage_control(Point::new(0.0, 160.0), Point::new(1000.0, 320.0));
        assert_eq!(far, Point::new(500.0, -40.0));
    }

    #[test]
    fn glyph_kinds_follow_relationship_and_children() {
        let tree = family();
        let nodes = [
            sample(1, 0.0, 0.0),
            sample(2, -160.0, 160.0),
            sample(3, 0.0, 160.0),
            sample(4, 160.0, 160.0),
            sample(5, -160.0, 320.0),
        ];
        let scene = compose(&tree, &HashSet::new(), &nodes);
        let kind = |id| scene.node(id).unwrap().kind;
        assert_eq!(kind(1), GlyphKind::Root);
        assert_eq!(kind(2), GlyphKind::Internal);
        assert_eq!(kind(3), GlyphKind::Leaf);
        assert_eq!(kind(4), GlyphKind::Spouse);

        let collapsed = compose(&tree, &HashSet::from([2]), &nodes[..4]);
        assert_eq!(collapsed.node(2).unwrap().kind, GlyphKind::Collapsed);
    }

    #[test]
    fn edges_need_both_endpoints_displayed() {
        let tree = family();
        let scene = compose(&tree, &HashSet::new(), &[sample(1, 0.0, 0.0), sample(2, -80.0, 160.0)]);
        assert!(scene.marriages.is_empty());
        assert_eq!(scene.links.len(), 1);
        assert_eq!((scene.links[0].parent, scene.links[0].child), (1, 2));

        let full = compose(
            &tree,
            &HashSet::new(),
            &[sample(1, 0.0, 0.0), sample(2, -80.0, 160.0), sample(3, 80.0, 160.0)],
        );
        assert_eq!(full.marriages.len(), 1);
        assert_eq!(full.marriages[0].control.y, 100.0);
        assert_eq!(MarriageEdge::new(full.marriages[0].a, full.marriages[0].b), tree.marriages()[0]);
    }

    #[test]
    fn non_finite_positions_are_skipped() {
        let tree = family();
        let scene = compose(
            &tree,
            &HashSet::new(),
            &[sample(1, 0.0, 0.0), sample(2, f64::NAN, 160.0)],
        );
        assert!(scene.node(2).is_none());
        assert!(scene.links.is_empty());
    }

    #[test]
    fn exiting_node_is_drawn_from_its_snapshot() {
        let before = family();
        let gone = GlyphSnapshot::capture(&before, &HashSet::new(), 5).unwrap();
        let after = FamilyTree::assemble(
            before.flatten().into_iter().filter(|m| m.id != 5).cloned().collect(),
        )
        .unwrap();

        let mut leaving = sample(5, -100.0, 250.0);
        leaving.exiting = true;
        leaving.snapshot = Some(gone);
        let scene = compose(&after, &HashSet::new(), &[sample(1, 0.0, 0.0), sample(2, -160.0, 160.0), leaving]);

        let glyph = scene.node(5).unwrap();
        assert_eq!(glyph.label, "Khalil");
        assert_eq!(glyph.kind, GlyphKind::Leaf);
        assert!(scene.links.iter().any(|l| (l.parent, l.child) == (2, 5)));
    }

    #[test]
    fn link_controls_share_the_vertical_midpoint() {
        let link = LinkPath {
            parent: 1,
            child: 2,
            from: Point::new(0.0, 0.0),
            to: Point::new(80.0, 160.0),
        };
        assert_eq!(link.controls(), (Point::new(0.0, 80.0), Point::new(80.0, 80.0)));
    }
}
