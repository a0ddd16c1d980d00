//! Mutation operations over a [`MemberStore`].
//!
//! Each operation re-establishes the store invariants before returning:
//! spouse links are symmetric, a member has at most one spouse, there is a
//! single root, and no member is left pointing at a deleted parent.
//! Atomicity is the store handle's job (see [`MemberStore`]).

use std::collections::HashSet;

use crate::error::CoreError;
use crate::member::{Member, MemberDraft, MemberId, MemberPatch, MemberRef, Relationship};
use crate::store::{MemberStore, NewMember};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of [`add_member`].
#[derive(Debug, Clone, PartialEq)]
pub struct AddOutcome {
    /// The stored member, including its spouse link when one was made.
    pub member: Member,
    /// Former spouse of the target whose link was cleared to make room.
    pub displaced_spouse: Option<MemberId>,
    /// The store had no root, so the new member became it.
    pub became_root: bool,
}

/// Result of [`delete_member`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Deleted ids, descendants before their ancestors.
    pub deleted: Vec<MemberId>,
    /// Surviving members whose spouse link was cleared.
    pub unlinked: Vec<MemberId>,
}

/// Result of [`link_members`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub first: MemberId,
    pub second: MemberId,
    /// Former partners whose links were cleared.
    pub displaced: Vec<MemberId>,
    /// The pair was already linked; nothing changed.
    pub unchanged: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Clear `member`'s spouse link on both sides. Returns the former partner.
///
/// The partner's side is only cleared if it actually points back, so an
/// asymmetric record never wipes an unrelated link.
async fn detach_spouse<S: MemberStore>(
    store: &mut S,
    member: &Member,
) -> Result<Option<MemberId>, S::Error> {
    let Some(partner_id) = member.spouse_id else {
        return Ok(None);
    };

    if let Some(partner) = store.find(partner_id).await? {
        if partner.spouse_id == Some(member.id) {
            store.set_spouse(partner_id, None).await?;
        }
    }
    store.set_spouse(member.id, None).await?;

    Ok(Some(partner_id))
}

// ---------------------------------------------------------------------------
// Add
// ---------------------------------------------------------------------------

/// Create a member under `target`, optionally linking it as the target's
/// spouse.
///
/// The new member is always placed in the target's parent slot
/// (`parent_id = target`), so a linked spouse renders next to its partner.
/// When `link_as_spouse` is set, any existing spouse of the target is
/// unlinked first. If `target` is the root sentinel and the store has no
/// root yet, the new member becomes the root.
pub async fn add_member<S: MemberStore>(
    store: &mut S,
    target: MemberRef,
    draft: &MemberDraft,
    link_as_spouse: bool,
) -> Result<AddOutcome, S::Error> {
    draft.check()?;

    let target_member = match store.resolve(target).await? {
        Some(member) => member,
        None => {
            return match target {
                MemberRef::Root => {
                    let new = NewMember::from_draft(draft, Relationship::Root, None);
                    let member = store.insert(&new).await?;
                    Ok(AddOutcome {
                        member,
                        displaced_spouse: None,
                        became_root: true,
                    })
                }
                MemberRef::Id(id) => Err(CoreError::member_not_found(id).into()),
            };
        }
    };

    let relationship = match draft.relationship {
        Some(Relationship::Root) => {
            return Err(CoreError::Validation(
                "A family tree has exactly one root member".to_string(),
            )
            .into());
        }
        Some(relationship) => relationship,
        None if link_as_spouse => Relationship::Spouse,
        None => Relationship::Child,
    };

    let displaced_spouse = if link_as_spouse {
        detach_spouse(store, &target_member).await?
    } else {
        None
    };

    let new = NewMember::from_draft(draft, relationship, Some(target_member.id));
    let mut member = store.insert(&new).await?;

    if link_as_spouse {
        store.set_spouse(target_member.id, Some(member.id)).await?;
        store.set_spouse(member.id, Some(target_member.id)).await?;
        member.spouse_id = Some(target_member.id);
    }

    Ok(AddOutcome {
        member,
        displaced_spouse,
        became_root: false,
    })
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Apply a field-level patch to a member and persist it.
pub async fn update_member<S: MemberStore>(
    store: &mut S,
    target: MemberRef,
    patch: &MemberPatch,
) -> Result<Member, S::Error> {
    let mut member = store.require(target).await?;
    patch.apply_to(&mut member)?;
    store.save(&member).await?;
    Ok(member)
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Collect `id` and all of its descendants in pre-order.
///
/// A visited set guards against malformed parent cycles.
pub async fn collect_subtree<S: MemberStore>(
    store: &mut S,
    id: MemberId,
) -> Result<Vec<MemberId>, S::Error> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![id];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        order.push(current);
        let children = store.child_ids(current).await?;
        stack.extend(children.into_iter().rev());
    }

    Ok(order)
}

/// Delete a member together with every descendant.
///
/// Surviving spouses of any deleted member have their link cleared first.
/// Deleting the root empties the whole tree; callers guard against that.
pub async fn delete_member<S: MemberStore>(
    store: &mut S,
    target: MemberRef,
) -> Result<DeleteOutcome, S::Error> {
    let member = store.require(target).await?;
    let subtree = collect_subtree(store, member.id).await?;
    let doomed: HashSet<MemberId> = subtree.iter().copied().collect();

    let mut outcome = DeleteOutcome::default();

    for id in &subtree {
        let Some(record) = store.find(*id).await? else {
            continue;
        };
        let Some(partner_id) = record.spouse_id else {
            continue;
        };
        if doomed.contains(&partner_id) {
            continue;
        }
        if let Some(partner) = store.find(partner_id).await? {
            if partner.spouse_id == Some(record.id) {
                store.set_spouse(partner_id, None).await?;
                outcome.unlinked.push(partner_id);
            }
        }
    }

    for id in subtree.into_iter().rev() {
        if store.remove(id).await? {
            outcome.deleted.push(id);
        }
    }

    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Link / unlink
// ---------------------------------------------------------------------------

/// Link two members as spouses, clearing any existing link on either side.
pub async fn link_members<S: MemberStore>(
    store: &mut S,
    first: MemberRef,
    second: MemberRef,
) -> Result<LinkOutcome, S::Error> {
    let a = store.require(first).await?;
    let b = store.require(second).await?;

    if a.id == b.id {
        return Err(
            CoreError::Validation("A member cannot be linked to themselves".to_string()).into(),
        );
    }

    if a.spouse_id == Some(b.id) && b.spouse_id == Some(a.id) {
        return Ok(LinkOutcome {
            first: a.id,
            second: b.id,
            displaced: Vec::new(),
            unchanged: true,
        });
    }

    let mut displaced = Vec::new();
    for (member, other) in [(&a, &b), (&b, &a)] {
        if member.spouse_id.is_some() && member.spouse_id != Some(other.id) {
            if let Some(former) = detach_spouse(store, member).await? {
                displaced.push(former);
            }
        }
    }

    store.set_spouse(a.id, Some(b.id)).await?;
    store.set_spouse(b.id, Some(a.id)).await?;

    Ok(LinkOutcome {
        first: a.id,
        second: b.id,
        displaced,
        unchanged: false,
    })
}

/// Unlink two members if they point at each other.
///
/// Each side is cleared only if it points at the other. Missing members and
/// already-unlinked pairs are a no-op. Returns whether anything changed.
pub async fn unlink_members<S: MemberStore>(
    store: &mut S,
    first: MemberRef,
    second: MemberRef,
) -> Result<bool, S::Error> {
    let (Some(a), Some(b)) = (store.resolve(first).await?, store.resolve(second).await?) else {
        return Ok(false);
    };

    let mut changed = false;
    for (member, other) in [(&a, &b), (&b, &a)] {
        if member.spouse_id == Some(other.id) {
            store.set_spouse(member.id, None).await?;
            changed = true;
        }
    }

    Ok(changed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
