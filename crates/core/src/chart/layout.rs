//! Tidy-tree layout.
//!
//! Reingold-Tilford node placement in linear time (Buchheim, Jünger and
//! Leipert). Siblings sit one unit apart, cousins two; each parent is centered
//! over its first and last child and subtrees never overlap. Units are scaled
//! by [`NODE_SPACING`] horizontally and [`LEVEL_SPACING`] per depth, with the
//! root at the origin.
//!
//! Only expanded nodes take part: the children of a collapsed node are not
//! laid out at all.

use std::collections::{HashMap, HashSet};

use crate::chart::Point;
use crate::member::MemberId;
use crate::tree::FamilyTree;

/// Horizontal distance between adjacent siblings.
pub const NODE_SPACING: f64 = 160.0;

/// Vertical distance between generations.
pub const LEVEL_SPACING: f64 = 160.0;

/// Separation, in sibling units, between neighbours with different parents.
const COUSIN_SEPARATION: f64 = 2.0;

/// Positions of the visible nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    order: Vec<MemberId>,
    positions: HashMap<MemberId, Point>,
    links: Vec<(MemberId, MemberId)>,
}

impl Layout {
    /// Lay out every node of `tree` not hidden under a collapsed ancestor.
    pub fn compute(tree: &FamilyTree, collapsed: &HashSet<MemberId>) -> Self {
        let mut arena = Arena::build(tree, collapsed);
        arena.place();

        let mut layout = Layout::default();
        for slot in arena.slots.iter().skip(1) {
            let Some(id) = slot.member else { continue };
            layout.order.push(id);
            layout.positions.insert(
                id,
                Point::new(slot.x * NODE_SPACING, slot.depth as f64 * LEVEL_SPACING),
            );
            if slot.parent != SENTINEL {
                if let Some(parent) = arena.slots[slot.parent].member {
                    layout.links.push((parent, id));
                }
            }
        }
        layout
    }

    /// Visible member ids in pre-order.
    pub fn order(&self) -> &[MemberId] {
        &self.order
    }

    pub fn position(&self, id: MemberId) -> Option<Point> {
        self.positions.get(&id).copied()
    }

    pub fn contains(&self, id: MemberId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Visible parent-child pairs in pre-order of the child.
    pub fn links(&self) -> &[(MemberId, MemberId)] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Horizontal extent `(min_x, max_x)` of the visible nodes.
    pub fn extent(&self) -> Option<(f64, f64)> {
        self.positions.values().fold(None, |acc, p| match acc {
            None => Some((p.x, p.x)),
            Some((lo, hi)) => Some((lo.min(p.x), hi.max(p.x))),
        })
    }
}

// ---------------------------------------------------------------------------
// Placement arena
// ---------------------------------------------------------------------------

/// Index of the synthetic parent of the root.
const SENTINEL: usize = 0;

#[derive(Debug, Clone)]
struct Slot {
    member: Option<MemberId>,
    parent: usize,
    children: Vec<usize>,
    /// Position among siblings.
    index: usize,
    depth: usize,
    /// Default ancestor used while apportioning this node's children.
    ancestor: Option<usize>,
    /// Ancestor pointer followed by `next_ancestor`.
    thread_ancestor: usize,
    thread: Option<usize>,
    prelim: f64,
    modifier: f64,
    change: f64,
    shift: f64,
    x: f64,
}

impl Slot {
    fn new(member: Option<MemberId>, parent: usize, index: usize, depth: usize, own: usize) -> Self {
        Self {
            member,
            parent,
            children: Vec::new(),
            index,
            depth,
            ancestor: None,
            thread_ancestor: own,
            thread: None,
            prelim: 0.0,
            modifier: 0.0,
            change: 0.0,
            shift: 0.0,
            x: 0.0,
        }
    }
}

struct Arena {
    slots: Vec<Slot>,
}

impl Arena {
    /// Slots in pre-order, the sentinel first.
    fn build(tree: &FamilyTree, collapsed: &HashSet<MemberId>) -> Self {
        let mut slots = vec![Slot::new(None, SENTINEL, 0, 0, SENTINEL)];
        let mut stack = vec![(tree.root_id(), SENTINEL, 0usize, 0usize)];
        let mut seen = HashSet::new();

        while let Some((id, parent, index, depth)) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let own = slots.len();
            slots.push(Slot::new(Some(id), parent, index, depth, own));
            slots[parent].children.push(own);

            if collapsed.contains(&id) {
                continue;
            }
            let kids = tree.children(id);
            for (i, kid) in kids.iter().enumerate().rev() {
                stack.push((*kid, own, i, depth + 1));
            }
        }
        Self { slots }
    }

    fn place(&mut self) {
        if self.slots.len() <= 1 {
            return;
        }
        let root = 1;

        for v in self.postorder(root) {
            self.first_walk(v);
        }
        self.slots[SENTINEL].modifier = -self.slots[root].prelim;
        for v in self.preorder(root) {
            self.second_walk(v);
        }
    }

    fn preorder(&self, root: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.slots.len());
        let mut stack = vec![root];
        while let Some(v) = stack.pop() {
            out.push(v);
            stack.extend(self.slots[v].children.iter().rev());
        }
        out
    }

    /// Children left to right before their parent.
    fn postorder(&self, root: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.slots.len());
        let mut stack = vec![root];
        while let Some(v) = stack.pop() {
            out.push(v);
            stack.extend(self.slots[v].children.iter());
        }
        out.reverse();
        out
    }

    fn separation(&self, a: usize, b: usize) -> f64 {
        if self.slots[a].parent == self.slots[b].parent {
            1.0
        } else {
            COUSIN_SEPARATION
        }
    }

    fn left_sibling(&self, v: usize) -> Option<usize> {
        let slot = &self.slots[v];
        if slot.index == 0 {
            return None;
        }
        self.slots[slot.parent].children.get(slot.index - 1).copied()
    }

    fn next_left(&self, v: usize) -> Option<usize> {
        self.slots[v].children.first().copied().or(self.slots[v].thread)
    }

    fn next_right(&self, v: usize) -> Option<usize> {
        self.slots[v].children.last().copied().or(self.slots[v].thread)
    }

    fn first_walk(&mut self, v: usize) {
        let left = self.left_sibling(v);
        let children = self.slots[v].children.clone();

        if let (Some(first), Some(last)) = (children.first(), children.last()) {
            self.execute_shifts(v);
            let midpoint = (self.slots[*first].prelim + self.slots[*last].prelim) / 2.0;
            match left {
                Some(w) => {
                    self.slots[v].prelim = self.slots[w].prelim + self.separation(v, w);
                    self.slots[v].modifier = self.slots[v].prelim - midpoint;
                }
                None => self.slots[v].prelim = midpoint,
            }
        } else if let Some(w) = left {
            self.slots[v].prelim = self.slots[w].prelim + self.separation(v, w);
        }

        let parent = self.slots[v].parent;
        let default_ancestor = self.slots[parent]
            .ancestor
            .or_else(|| self.slots[parent].children.first().copied())
            .unwrap_or(v);
        let ancestor = self.apportion(v, left, default_ancestor);
        self.slots[parent].ancestor = Some(ancestor);
    }

    fn second_walk(&mut self, v: usize) {
        let parent_modifier = self.slots[self.slots[v].parent].modifier;
        let slot = &mut self.slots[v];
        slot.x = slot.prelim + parent_modifier;
        slot.modifier += parent_modifier;
    }

    fn apportion(&mut self, v: usize, left: Option<usize>, mut ancestor: usize) -> usize {
        let Some(w) = left else {
            return ancestor;
        };
        let parent = self.slots[v].parent;
        let mut vip = v;
        let mut vop = v;
        let mut vim = w;
        let mut vom = self.slots[parent].children[0];
        let mut sip = self.slots[vip].modifier;
        let mut sop = self.slots[vop].modifier;
        let mut sim = self.slots[vim].modifier;
        let mut som = self.slots[vom].modifier;

        let (next_vim, next_vip) = loop {
            let next_vim = self.next_right(vim);
            let next_vip = self.next_left(vip);
            let (Some(right_contour), Some(left_contour)) = (next_vim, next_vip) else {
                break (next_vim, next_vip);
            };
            vim = right_contour;
            vip = left_contour;
            if let Some(n) = self.next_left(vom) {
                vom = n;
            }
            if let Some(n) = self.next_right(vop) {
                vop = n;
            }
            self.slots[vop].thread_ancestor = v;

            let shift = self.slots[vim].prelim + sim - self.slots[vip].prelim - sip
                + self.separation(vim, vip);
            if shift > 0.0 {
                let from = self.next_ancestor(vim, v, ancestor);
                self.move_subtree(from, v, shift);
                sip += shift;
                sop += shift;
            }
            sim += self.slots[vim].modifier;
            sip += self.slots[vip].modifier;
            som += self.slots[vom].modifier;
            sop += self.slots[vop].modifier;
        };

        if next_vim.is_some() && self.next_right(vop).is_none() {
            self.slots[vop].thread = next_vim;
            self.slots[vop].modifier += sim - sop;
        }
        if next_vip.is_some() && self.next_left(vom).is_none() {
            self.slots[vom].thread = next_vip;
            self.slots[vom].modifier += sip - som;
            ancestor = v;
        }
        ancestor
    }

    fn next_ancestor(&self, vim: usize, v: usize, ancestor: usize) -> usize {
        let candidate = self.slots[vim].thread_ancestor;
        if self.slots[candidate].parent == self.slots[v].parent {
            candidate
        } else {
            ancestor
        }
    }

    fn move_subtree(&mut self, wm: usize, wp: usize, shift: f64) {
        let span = self.slots[wp].index.saturating_sub(self.slots[wm].index).max(1);
        let change = shift / span as f64;
        self.slots[wp].change -= change;
        self.slots[wp].shift += shift;
        self.slots[wm].change += change;
        self.slots[wp].prelim += shift;
        self.slots[wp].modifier += shift;
    }

    fn execute_shifts(&mut self, v: usize) {
        let mut shift = 0.0;
        let mut change = 0.0;
        let children = self.slots[v].children.clone();
        for w in children.into_iter().rev() {
            let slot = &mut self.slots[w];
            slot.prelim += shift;
            slot.modifier += shift;
            change += slot.change;
            shift += slot.shift + change;
        }
    }
}
