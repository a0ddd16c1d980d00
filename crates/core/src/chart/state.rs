//! Chart interaction state.
//!
//! [`ChartState`] owns the collapsed set, the current layout, the running
//! node transition and the viewport. The collapsed set is keyed by member id
//! and survives [`ChartState::set_tree`], so refreshing the data after a
//! mutation keeps the user's expand/collapse choices.

use std::collections::HashSet;
use std::time::Duration;

use crate::chart::layout::Layout;
use crate::chart::scene::{GlyphSnapshot, Scene};
use crate::chart::transition::{EdgeSample, NodeSample, Transition, TransitionStart};
use crate::chart::viewport::Viewport;
use crate::chart::Point;
use crate::member::MemberId;
use crate::tree::{FamilyTree, MarriageEdge};

/// Something the host should react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartEvent {
    /// A label was clicked: show that member's profile.
    OpenProfile(MemberId),
}

#[derive(Debug, Clone)]
pub struct ChartState {
    tree: FamilyTree,
    collapsed: HashSet<MemberId>,
    layout: Layout,
    transition: Transition,
    viewport: Viewport,
}

impl ChartState {
    /// Show `tree` in a `width` x `height` window. Every node grows out of
    /// the origin.
    pub fn new(tree: FamilyTree, width: f64, height: f64, now: Duration) -> Self {
        let collapsed = HashSet::new();
        let layout = Layout::compute(&tree, &collapsed);
        let edges = visible_marriages(&tree, &layout);
        let transition = Transition::begin(
            TransitionStart {
                displayed: &[],
                displayed_edges: &[],
                source_before: Point::ORIGIN,
                source_after: Point::ORIGIN,
            },
            &layout,
            &edges,
            now,
        );
        Self {
            tree,
            collapsed,
            layout,
            transition,
            viewport: Viewport::new(width, height),
        }
    }

    pub fn tree(&self) -> &FamilyTree {
        &self.tree
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn is_collapsed(&self, id: MemberId) -> bool {
        self.collapsed.contains(&id)
    }

    pub fn collapsed(&self) -> &HashSet<MemberId> {
        &self.collapsed
    }

    /// Replace the data, keeping collapsed state for members that still have
    /// children.
    pub fn set_tree(&mut self, tree: FamilyTree, now: Duration) {
        let displayed = self.displayed(now);
        let root = tree.root_id();
        self.tree = tree;
        let tree = &self.tree;
        self.collapsed.retain(|id| tree.has_children(*id));
        self.relayout(displayed, root, now);
    }

    /// Flip a node between expanded and collapsed. Leaves have nothing to
    /// toggle and return `false`.
    pub fn toggle(&mut self, id: MemberId, now: Duration) -> bool {
        if !self.layout.contains(id) || !self.tree.has_children(id) {
            return false;
        }
        let displayed = self.displayed(now);
        if !self.collapsed.remove(&id) {
            self.collapsed.insert(id);
        }
        self.relayout(displayed, id, now);
        true
    }

    /// Node click: toggle and re-center on the node.
    pub fn click_node(&mut self, id: MemberId, now: Duration) {
        if !self.layout.contains(id) {
            return;
        }
        self.toggle(id, now);
        self.recenter(id, now);
    }

    /// Label click: ask for the profile and re-center on the node.
    pub fn click_label(&mut self, id: MemberId, now: Duration) -> Option<ChartEvent> {
        if !self.layout.contains(id) {
            return None;
        }
        self.recenter(id, now);
        Some(ChartEvent::OpenProfile(id))
    }

    pub fn pan(&mut self, dx: f64, dy: f64, now: Duration) {
        self.viewport.pan_by(dx, dy, now);
    }

    pub fn zoom(&mut self, factor: f64, focus: Point, now: Duration) {
        self.viewport.zoom_by(factor, focus, now);
    }

    /// New window size: reset the view and lay out again.
    pub fn resize(&mut self, width: f64, height: f64, now: Duration) {
        self.viewport.resize(width, height);
        let displayed = self.displayed(now);
        let root = self.tree.root_id();
        self.relayout(displayed, root, now);
    }

    pub fn is_animating(&self, now: Duration) -> bool {
        !self.transition.is_finished(now) || self.viewport.is_animating(now)
    }

    /// What is on screen at `now`.
    pub fn frame(&self, now: Duration) -> Scene {
        Scene::compose(
            &self.tree,
            &self.collapsed,
            &self.transition.nodes_at(now),
            &self.transition.edges_at(now),
            self.viewport.transform_at(now),
            self.viewport.size(),
        )
    }

    fn recenter(&mut self, id: MemberId, now: Duration) {
        if let Some(target) = self.layout.position(id) {
            self.viewport.center_on(target, now);
        }
    }

    /// Frames on screen at `now`, each carrying a snapshot of its member as
    /// the data stands before the next change.
    fn displayed(&self, now: Duration) -> Vec<NodeSample> {
        let mut samples = self.transition.nodes_at(now);
        for sample in &mut samples {
            if sample.snapshot.is_none() {
                sample.snapshot = GlyphSnapshot::capture(&self.tree, &self.collapsed, sample.id);
            }
        }
        samples
    }

    /// Recompute the layout and animate to it from `displayed`, with
    /// `source` as the node the change originates from.
    fn relayout(&mut self, displayed: Vec<NodeSample>, source: MemberId, now: Duration) {
        let displayed_edges: Vec<EdgeSample> = self.transition.edges_at(now);
        let source_before = self.layout.position(source).unwrap_or(Point::ORIGIN);

        self.layout = Layout::compute(&self.tree, &self.collapsed);
        let source_after = self.layout.position(source).unwrap_or(Point::ORIGIN);
        let edges = visible_marriages(&self.tree, &self.layout);

        self.transition = Transition::begin(
            TransitionStart {
                displayed: &displayed,
                displayed_edges: &displayed_edges,
                source_before,
                source_after,
            },
            &self.layout,
            &edges,
            now,
        );
    }
}

fn visible_marriages(tree: &FamilyTree, layout: &Layout) -> Vec<MarriageEdge> {
    tree.marriages()
        .iter()
        .filter(|e| layout.contains(e.a) && layout.contains(e.b))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::scene::NODE_RADIUS;
    use crate::chart::GlyphKind;
    use crate::tree::tests::{child, married, root};

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn sample_tree() -> FamilyTree {
        let (amina, omar) = married(child(2, "Amina", 1), child(3, "Omar", 1));
        FamilyTree::assemble(vec![root(1, "r"), amina, omar, child(4, "Khalil", 2)]).unwrap()
    }

    fn settled(state: &ChartState) -> Scene {
        state.frame(ms(60_000))
    }

    #[test]
    fn initial_frame_grows_from_origin() {
        let state = ChartState::new(sample_tree(), 800.0, 600.0, ms(0));
        let first = state.frame(ms(0));
        assert!(first.nodes.iter().all(|n| n.position == Point::ORIGIN && n.radius == 0.0));
        let done = settled(&state);
        assert_eq!(done.nodes.len(), 4);
        assert_eq!(done.marriages.len(), 1);
        assert_eq!(done.links.len(), 3);
    }

    #[test]
    fn toggle_collapses_and_expands() {
        let mut state = ChartState::new(sample_tree(), 800.0, 600.0, ms(0));
        assert!(state.toggle(2, ms(1000)));
        assert!(state.is_collapsed(2));
        let scene = state.frame(ms(2000));
        assert!(scene.node(4).is_none());
        assert_eq!(scene.node(2).unwrap().kind, GlyphKind::Collapsed);

        assert!(state.toggle(2, ms(3000)));
        assert!(!state.is_collapsed(2));
        assert!(state.frame(ms(4000)).node(4).is_some());
    }

    #[test]
    fn leaves_do_not_toggle() {
        let mut state = ChartState::new(sample_tree(), 800.0, 600.0, ms(0));
        assert!(!state.toggle(4, ms(1000)));
        assert!(state.collapsed().is_empty());
    }

    #[test]
    fn node_click_recenters_on_new_position() {
        let mut state = ChartState::new(sample_tree(), 800.0, 600.0, ms(0));
        state.click_node(2, ms(1000));
        let target = state.layout().position(2).unwrap();
        let t = state.viewport().transform_at(ms(1750));
        assert!((t.x - (-target.x * 0.85 + 400.0)).abs() < 1e-9);
        assert!((t.y - (-target.y * 0.85 + 200.0)).abs() < 1e-9);
    }

    #[test]
    fn label_click_emits_profile_event() {
        let mut state = ChartState::new(sample_tree(), 800.0, 600.0, ms(0));
        assert_eq!(state.click_label(3, ms(10)), Some(ChartEvent::OpenProfile(3)));
        assert!(!state.is_collapsed(3));
        assert_eq!(state.click_label(99, ms(10)), None);
    }

    #[test]
    fn collapsed_state_survives_refresh() {
        let mut state = ChartState::new(sample_tree(), 800.0, 600.0, ms(0));
        state.toggle(2, ms(1000));

        let (amina, omar) = married(child(2, "Amina", 1), child(3, "Omar", 1));
        let refreshed = FamilyTree::assemble(vec![
            root(1, "r"),
            amina,
            omar,
            child(4, "Khalil", 2),
            child(5, "Mariam", 1),
        ])
        .unwrap();
        state.set_tree(refreshed, ms(2000));

        assert!(state.is_collapsed(2));
        let scene = settled(&state);
        assert!(scene.node(5).is_some());
        assert!(scene.node(4).is_none());
    }

    #[test]
    fn refresh_drops_collapsed_ids_without_children() {
        let mut state = ChartState::new(sample_tree(), 800.0, 600.0, ms(0));
        state.toggle(2, ms(1000));
        let (amina, omar) = married(child(2, "Amina", 1), child(3, "Omar", 1));
        state.set_tree(FamilyTree::assemble(vec![root(1, "r"), amina, omar]).unwrap(), ms(2000));
        assert!(state.collapsed().is_empty());
    }

    fn distance(a: Point, b: Point) -> f64 {
        ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
    }

    #[test]
    fn deleted_member_animates_out_after_refresh() {
        let mut state = ChartState::new(sample_tree(), 800.0, 600.0, ms(0));
        let before = state.layout().position(4).unwrap();

        let (amina, omar) = married(child(2, "Amina", 1), child(3, "Omar", 1));
        state.set_tree(FamilyTree::assemble(vec![root(1, "r"), amina, omar]).unwrap(), ms(1000));
        let root_after = state.layout().position(1).unwrap();

        let mid = state.frame(ms(1100));
        let leaving = mid.node(4).expect("deleted member is still drawn while exiting");
        assert_eq!(leaving.label, "Khalil");
        assert!(leaving.radius > 0.0 && leaving.radius < NODE_RADIUS);
        assert!(distance(leaving.position, root_after) < distance(before, root_after));
        assert!(mid.links.iter().any(|l| (l.parent, l.child) == (2, 4)));

        assert!(state.frame(ms(1500)).node(4).is_none());
    }

    #[test]
    fn collapse_shrinks_children_into_the_collapsed_node() {
        let mut state = ChartState::new(sample_tree(), 800.0, 600.0, ms(0));
        let before = state.layout().position(4).unwrap();
        state.toggle(2, ms(1000));
        let target = state.layout().position(2).unwrap();

        let early = state.frame(ms(1100)).node(4).cloned().unwrap();
        let late = state.frame(ms(1400)).node(4).cloned().unwrap();
        assert!(distance(early.position, target) < distance(before, target));
        assert!(distance(late.position, target) < distance(early.position, target));
        assert!(late.radius < early.radius);
        assert_eq!(state.frame(ms(1400)).node(2).unwrap().kind, GlyphKind::Collapsed);

        assert!(state.frame(ms(1500)).node(4).is_none());
    }

    #[test]
    fn refresh_mid_exit_keeps_the_leaving_node() {
        let mut state = ChartState::new(sample_tree(), 800.0, 600.0, ms(0));
        let (amina, omar) = married(child(2, "Amina", 1), child(3, "Omar", 1));
        let without_khalil = FamilyTree::assemble(vec![root(1, "r"), amina, omar]).unwrap();
        state.set_tree(without_khalil.clone(), ms(1000));
        state.set_tree(without_khalil, ms(1200));

        let leaving = state.frame(ms(1300)).node(4).cloned();
        assert_eq!(leaving.map(|g| g.label), Some("Khalil".to_string()));
        assert!(state.frame(ms(1700)).node(4).is_none());
    }

    #[test]
    fn zoom_stays_within_bounds() {
        let mut state = ChartState::new(sample_tree(), 800.0, 600.0, ms(0));
        state.zoom(1000.0, Point::new(400.0, 300.0), ms(0));
        assert_eq!(settled(&state).transform.k, 4.0);
    }
}
