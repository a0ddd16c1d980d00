//! Read-only views over an assembled [`FamilyTree`].
//!
//! All views walk the tree in pre-order, so ties come out in traversal order.

use std::collections::HashSet;

use crate::member::{Member, MemberId, Relationship};
use crate::tree::FamilyTree;

/// Members whose name contains `query`, ignoring case.
///
/// An empty or whitespace-only query matches nothing.
pub fn search<'a>(tree: &'a FamilyTree, query: &str) -> Vec<&'a Member> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    tree.preorder()
        .map(|v| v.member)
        .filter(|m| m.name.to_lowercase().contains(&needle))
        .collect()
}

/// Members ordered by birth year, unknown years last.
pub fn timeline(tree: &FamilyTree) -> Vec<&Member> {
    let mut members = tree.flatten();
    // `sort_by_key` is stable, so equal years keep traversal order.
    members.sort_by_key(|m| (m.birth_year.is_none(), m.birth_year));
    members
}

/// Members that have a photo, in traversal order.
pub fn gallery(tree: &FamilyTree) -> Vec<&Member> {
    tree.preorder()
        .map(|v| v.member)
        .filter(|m| m.has_photo())
        .collect()
}

/// Everyone shown as a spouse of `id` on its profile.
///
/// Combines the linked spouse, the root's `spouse` children and, for a
/// `spouse` member, the partner it was added under.
pub fn spouses_of(tree: &FamilyTree, id: MemberId) -> Vec<&Member> {
    let Some(member) = tree.get(id) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    if let Some(linked) = member.spouse_id.and_then(|s| tree.get(s)) {
        found.push(linked);
    }
    if member.relationship == Relationship::Root {
        found.extend(
            tree.children(id)
                .iter()
                .filter_map(|c| tree.get(*c))
                .filter(|c| c.relationship == Relationship::Spouse),
        );
    }
    if member.relationship == Relationship::Spouse {
        if let Some(parent) = tree.parent(id) {
            found.push(parent);
        }
    }

    let mut seen = HashSet::new();
    found.retain(|m| m.id != id && seen.insert(m.id));
    found
}

/// Spouse names for a profile: the resolved spouses, or the legacy free-text
/// `spouse_name` when none resolve.
pub fn spouse_names(tree: &FamilyTree, id: MemberId) -> Vec<String> {
    let resolved: Vec<String> = spouses_of(tree, id)
        .into_iter()
        .map(|m| m.name.clone())
        .collect();
    if !resolved.is_empty() {
        return resolved;
    }
    tree.get(id)
        .and_then(|m| m.spouse_name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| vec![name.to_string()])
        .unwrap_or_default()
}

/// Non-root members matching `query` for the management list.
///
/// Unlike [`search`], an empty query lists everyone.
pub fn manageable<'a>(tree: &'a FamilyTree, query: &str) -> Vec<&'a Member> {
    let needle = query.trim().to_lowercase();
    tree.preorder()
        .map(|v| v.member)
        .filter(|m| !m.is_root())
        .filter(|m| needle.is_empty() || m.name.to_lowercase().contains(&needle))
        .collect()
}
