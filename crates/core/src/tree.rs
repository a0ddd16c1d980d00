//! Tree assembly: flat member records to a rooted family tree.
//!
//! [`FamilyTree`] is an arena keyed by member id with explicit child, parent
//! and spouse indexes built once per assembly. It is a disposable projection
//! of the store and is rebuilt from scratch on every read.
//!
//! Malformed input never panics: members that cannot be attached under the
//! root (missing parent, parent cycles, stray parentless records) are left
//! out and reported as [`AssemblyWarning`]s.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::member::{Gender, Member, MemberId, MemberMetadata, MemberRef, Relationship};
use crate::types::Timestamp;

/// Id of the synthetic root used when no real tree can be shown.
pub const PLACEHOLDER_ROOT_ID: MemberId = 0;

/// Display name of the synthetic placeholder root.
pub const PLACEHOLDER_ROOT_NAME: &str = "Family Root";

// ---------------------------------------------------------------------------
// Marriage edges
// ---------------------------------------------------------------------------

/// An unordered spouse pair, stored with the smaller id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MarriageEdge {
    pub a: MemberId,
    pub b: MemberId,
}

impl MarriageEdge {
    /// Build the edge for a pair in either order.
    pub fn new(x: MemberId, y: MemberId) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    pub fn contains(&self, id: MemberId) -> bool {
        self.a == id || self.b == id
    }

    /// The other end of the edge, if `id` is one end.
    pub fn partner_of(&self, id: MemberId) -> Option<MemberId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Non-fatal problems found while assembling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssemblyWarning {
    /// `parent_id` does not resolve to any member.
    Orphan { id: MemberId, parent_id: MemberId },
    /// The member's parent chain never reaches the root.
    Unreachable { id: MemberId },
    /// `spouse_id` does not resolve to any member.
    DanglingSpouse { id: MemberId, spouse_id: MemberId },
    /// The member is recorded as its own spouse.
    SelfSpouse { id: MemberId },
    /// The spouse exists but does not point back.
    AsymmetricSpouse { id: MemberId, spouse_id: MemberId },
}

impl fmt::Display for AssemblyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyWarning::Orphan { id, parent_id } => {
                write!(f, "member {id} references missing parent {parent_id}")
            }
            AssemblyWarning::Unreachable { id } => {
                write!(f, "member {id} is not reachable from the root")
            }
            AssemblyWarning::DanglingSpouse { id, spouse_id } => {
                write!(f, "member {id} references missing spouse {spouse_id}")
            }
            AssemblyWarning::SelfSpouse { id } => {
                write!(f, "member {id} is linked to itself")
            }
            AssemblyWarning::AsymmetricSpouse { id, spouse_id } => {
                write!(f, "member {id} points at spouse {spouse_id} which does not point back")
            }
        }
    }
}

/// Derive the deduplicated marriage edges of a flat member collection.
///
/// Edges come out in the order their first endpoint appears in `members`.
pub fn marriage_edges(members: &[Member]) -> (Vec<MarriageEdge>, Vec<AssemblyWarning>) {
    let by_id: HashMap<MemberId, &Member> = members.iter().map(|m| (m.id, m)).collect();
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    let mut warnings = Vec::new();

    for member in members {
        let Some(spouse_id) = member.spouse_id else {
            continue;
        };
        if spouse_id == member.id {
            warnings.push(AssemblyWarning::SelfSpouse { id: member.id });
            continue;
        }
        let Some(spouse) = by_id.get(&spouse_id) else {
            warnings.push(AssemblyWarning::DanglingSpouse {
                id: member.id,
                spouse_id,
            });
            continue;
        };
        if spouse.spouse_id != Some(member.id) {
            warnings.push(AssemblyWarning::AsymmetricSpouse {
                id: member.id,
                spouse_id,
            });
        }
        let edge = MarriageEdge::new(member.id, spouse_id);
        if seen.insert(edge) {
            edges.push(edge);
        }
    }

    (edges, warnings)
}

// ---------------------------------------------------------------------------
// Root selection
// ---------------------------------------------------------------------------

/// Pick the root: the explicitly tagged root, else the only parentless
/// member.
pub fn select_root(members: &[Member]) -> Result<MemberId, CoreError> {
    let tagged: Vec<MemberId> = members.iter().filter(|m| m.is_root()).map(|m| m.id).collect();
    match tagged.as_slice() {
        [root] => return Ok(*root),
        [] => {}
        many => {
            return Err(CoreError::RootInvariant(format!(
                "{} members are tagged as root",
                many.len()
            )))
        }
    }

    let parentless: Vec<MemberId> = members
        .iter()
        .filter(|m| m.parent_id.is_none())
        .map(|m| m.id)
        .collect();
    match parentless.as_slice() {
        [root] => Ok(*root),
        [] => Err(CoreError::NoRoot),
        many => Err(CoreError::RootInvariant(format!(
            "no member is tagged as root and {} members have no parent",
            many.len()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Family tree arena
// ---------------------------------------------------------------------------

/// One step of a pre-order traversal.
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub member: &'a Member,
    pub depth: usize,
}

/// The assembled tree.
#[derive(Debug, Clone)]
pub struct FamilyTree {
    root: MemberId,
    members: HashMap<MemberId, Member>,
    children: HashMap<MemberId, Vec<MemberId>>,
    parents: HashMap<MemberId, MemberId>,
    spouses: HashMap<MemberId, MemberId>,
    marriages: Vec<MarriageEdge>,
    warnings: Vec<AssemblyWarning>,
}

impl FamilyTree {
    /// Assemble a tree from an unordered flat collection.
    ///
    /// Children are ordered by `(created_at, id)`. Fails only when no single
    /// root can be chosen (see [`select_root`]).
    pub fn assemble(mut members: Vec<Member>) -> Result<Self, CoreError> {
        members.sort_by_key(|m| (m.created_at, m.id));

        let mut unique = HashSet::new();
        members.retain(|m| unique.insert(m.id));

        let root = select_root(&members)?;
        let known: HashSet<MemberId> = members.iter().map(|m| m.id).collect();

        let mut warnings = Vec::new();
        let mut grouped: HashMap<MemberId, Vec<MemberId>> = HashMap::new();
        for member in &members {
            if member.id == root {
                continue;
            }
            match member.parent_id {
                Some(parent_id) if known.contains(&parent_id) => {
                    grouped.entry(parent_id).or_default().push(member.id);
                }
                Some(parent_id) => warnings.push(AssemblyWarning::Orphan {
                    id: member.id,
                    parent_id,
                }),
                None => {}
            }
        }

        // Walk down from the root; anything not reached is left out.
        let mut attached = HashSet::new();
        let mut children: HashMap<MemberId, Vec<MemberId>> = HashMap::new();
        let mut parents = HashMap::new();
        let mut stack = vec![root];
        attached.insert(root);
        while let Some(current) = stack.pop() {
            let kids: Vec<MemberId> = grouped
                .remove(&current)
                .unwrap_or_default()
                .into_iter()
                .filter(|id| attached.insert(*id))
                .collect();
            for kid in &kids {
                parents.insert(*kid, current);
                stack.push(*kid);
            }
            if !kids.is_empty() {
                children.insert(current, kids);
            }
        }

        let orphaned: HashSet<MemberId> = warnings
            .iter()
            .filter_map(|w| match w {
                AssemblyWarning::Orphan { id, .. } => Some(*id),
                _ => None,
            })
            .collect();
        for member in &members {
            if !attached.contains(&member.id) && !orphaned.contains(&member.id) {
                warnings.push(AssemblyWarning::Unreachable { id: member.id });
            }
        }

        let (edges, spouse_warnings) = marriage_edges(&members);
        warnings.extend(spouse_warnings);

        let marriages: Vec<MarriageEdge> = edges
            .into_iter()
            .filter(|e| attached.contains(&e.a) && attached.contains(&e.b))
            .collect();

        let mut spouses = HashMap::new();
        for edge in &marriages {
            spouses.insert(edge.a, edge.b);
            spouses.insert(edge.b, edge.a);
        }

        let members = members
            .into_iter()
            .filter(|m| attached.contains(&m.id))
            .map(|m| (m.id, m))
            .collect();

        Ok(Self {
            root,
            members,
            children,
            parents,
            spouses,
            marriages,
            warnings,
        })
    }

    /// A tree holding only the synthetic placeholder root.
    pub fn placeholder() -> Self {
        let root = Member {
            id: PLACEHOLDER_ROOT_ID,
            name: PLACEHOLDER_ROOT_NAME.to_string(),
            gender: Gender::Male,
            relationship: Relationship::Root,
            birth_year: None,
            death_year: None,
            photo_url: None,
            spouse_name: None,
            spouse_id: None,
            parent_id: None,
            mother_name: None,
            location: None,
            created_at: Timestamp::default(),
        };
        Self {
            root: root.id,
            members: HashMap::from([(root.id, root)]),
            children: HashMap::new(),
            parents: HashMap::new(),
            spouses: HashMap::new(),
            marriages: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Rebuild the arena from the nested wire shape.
    pub fn from_nested(root: FamilyNode) -> Result<Self, CoreError> {
        let mut flat = Vec::new();
        let mut stack = vec![(root, None)];
        while let Some((node, parent_id)) = stack.pop() {
            let (member, children) = node.into_parts(parent_id);
            let id = member.id;
            flat.push(member);
            stack.extend(children.into_iter().rev().map(|child| (child, Some(id))));
        }
        // Nested order is authoritative; encode it for the creation-order sort.
        for (position, member) in flat.iter_mut().enumerate() {
            member.created_at = Timestamp::default() + chrono::Duration::milliseconds(position as i64);
        }
        Self::assemble(flat)
    }

    pub fn is_placeholder(&self) -> bool {
        self.root == PLACEHOLDER_ROOT_ID && self.members.len() == 1
    }

    pub fn root_id(&self) -> MemberId {
        self.root
    }

    /// How a server call should address `id`. The placeholder root has no
    /// stored record, so it maps to the root sentinel.
    pub fn member_ref(&self, id: MemberId) -> MemberRef {
        if id == PLACEHOLDER_ROOT_ID && self.is_placeholder() {
            MemberRef::Root
        } else {
            MemberRef::Id(id)
        }
    }

    pub fn root(&self) -> &Member {
        &self.members[&self.root]
    }

    pub fn get(&self, id: MemberId) -> Option<&Member> {
        self.members.get(&id)
    }

    pub fn contains(&self, id: MemberId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Direct children of `id` in creation order.
    pub fn children(&self, id: MemberId) -> &[MemberId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_children(&self, id: MemberId) -> bool {
        !self.children(id).is_empty()
    }

    pub fn parent_id(&self, id: MemberId) -> Option<MemberId> {
        self.parents.get(&id).copied()
    }

    pub fn parent(&self, id: MemberId) -> Option<&Member> {
        self.parent_id(id).and_then(|p| self.get(p))
    }

    /// The linked spouse, when both ends are in the tree.
    pub fn spouse(&self, id: MemberId) -> Option<&Member> {
        self.spouses.get(&id).and_then(|s| self.get(*s))
    }

    pub fn marriages(&self) -> &[MarriageEdge] {
        &self.marriages
    }

    /// Both ends of every marriage edge, in edge order.
    pub fn linked_pairs(&self) -> Vec<(&Member, &Member)> {
        self.marriages
            .iter()
            .filter_map(|edge| Some((self.get(edge.a)?, self.get(edge.b)?)))
            .collect()
    }

    pub fn warnings(&self) -> &[AssemblyWarning] {
        &self.warnings
    }

    /// Depth of `id` below the root, if attached.
    pub fn depth(&self, id: MemberId) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent_id(current) {
            depth += 1;
            current = parent;
        }
        Some(depth)
    }

    /// Pre-order traversal from the root.
    pub fn preorder(&self) -> Preorder<'_> {
        self.preorder_from(self.root)
    }

    /// Pre-order traversal of the subtree rooted at `id`.
    pub fn preorder_from(&self, id: MemberId) -> Preorder<'_> {
        let stack = if self.contains(id) { vec![(id, 0)] } else { Vec::new() };
        Preorder { tree: self, stack }
    }

    /// Visit every member in pre-order.
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(Visit<'_>),
    {
        for step in self.preorder() {
            visit(step);
        }
    }

    /// Ids of all descendants of `id`, not including `id`.
    pub fn descendant_ids(&self, id: MemberId) -> Vec<MemberId> {
        self.preorder_from(id).skip(1).map(|v| v.member.id).collect()
    }

    /// Members in pre-order as a flat list.
    pub fn flatten(&self) -> Vec<&Member> {
        self.preorder().map(|v| v.member).collect()
    }

    /// Convert to the nested wire shape.
    pub fn to_nested(&self) -> FamilyNode {
        self.node_at(self.root)
    }

    fn node_at(&self, id: MemberId) -> FamilyNode {
        let member = &self.members[&id];
        let children = self.children(id).iter().map(|c| self.node_at(*c)).collect();
        FamilyNode::from_member(member, children)
    }
}

/// Iterator returned by [`FamilyTree::preorder`].
pub struct Preorder<'a> {
    tree: &'a FamilyTree,
    stack: Vec<(MemberId, usize)>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, depth) = self.stack.pop()?;
        let member = self.tree.get(id)?;
        self.stack
            .extend(self.tree.children(id).iter().rev().map(|c| (*c, depth + 1)));
        Some(Visit { member, depth })
    }
}

// ---------------------------------------------------------------------------
// Nested wire shape
// ---------------------------------------------------------------------------

/// A member with its resolved children, as returned by `GET /family`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyNode {
    pub id: MemberId,
    pub name: String,
    pub gender: Gender,
    pub relationship: Relationship,
    #[serde(default)]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub death_year: Option<i32>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub spouse_name: Option<String>,
    #[serde(default)]
    pub spouse_id: Option<MemberId>,
    #[serde(default)]
    pub metadata: MemberMetadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FamilyNode>,
}

impl FamilyNode {
    fn from_member(member: &Member, children: Vec<FamilyNode>) -> Self {
        Self {
            id: member.id,
            name: member.name.clone(),
            gender: member.gender,
            relationship: member.relationship,
            birth_year: member.birth_year,
            death_year: member.death_year,
            photo_url: member.photo_url.clone(),
            spouse_name: member.spouse_name.clone(),
            spouse_id: member.spouse_id,
            metadata: member.metadata(),
            children,
        }
    }

    fn into_parts(self, parent_id: Option<MemberId>) -> (Member, Vec<FamilyNode>) {
        let member = Member {
            id: self.id,
            name: self.name,
            gender: self.gender,
            relationship: self.relationship,
            birth_year: self.birth_year,
            death_year: self.death_year,
            photo_url: self.photo_url,
            spouse_name: self.spouse_name,
            spouse_id: self.spouse_id,
            parent_id,
            mother_name: self.metadata.mother_name,
            location: self.metadata.location,
            created_at: Timestamp::default(),
        };
        (member, self.children)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
