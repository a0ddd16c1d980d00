//! In-memory [`MemberStore`].
//!
//! Holds the flat member collection in an id-ordered map. Used by tests and
//! by tooling that wants to run the mutation rules without a database.
//!
//! Calls made on a [`MemberSet`] apply immediately, so a mutation that fails
//! halfway leaves its earlier writes behind. Run mutations through
//! [`MemberSet::begin`] to get the all-or-nothing behaviour of a database
//! transaction.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use async_trait::async_trait;

use crate::error::CoreError;
use crate::member::{Member, MemberId};
use crate::store::{MemberStore, NewMember};

/// A flat collection of members keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MemberSet {
    members: BTreeMap<MemberId, Member>,
    next_id: MemberId,
}

impl MemberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from existing records, keeping their ids.
    pub fn from_members(members: impl IntoIterator<Item = Member>) -> Self {
        let members: BTreeMap<MemberId, Member> =
            members.into_iter().map(|m| (m.id, m)).collect();
        let next_id = members.keys().next_back().copied().unwrap_or(0);
        Self { members, next_id }
    }

    /// Start a transaction. Writes go to a working copy that replaces this
    /// set on [`MemberSetTx::commit`] and is discarded when dropped.
    pub fn begin(&mut self) -> MemberSetTx<'_> {
        let work = self.clone();
        MemberSetTx { target: self, work }
    }

    pub fn get(&self, id: MemberId) -> Option<&Member> {
        self.members.get(&id)
    }

    /// Members in creation order.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        let mut ordered: Vec<&Member> = self.members.values().collect();
        ordered.sort_by_key(|m| (m.created_at, m.id));
        ordered.into_iter()
    }

    pub fn to_vec(&self) -> Vec<Member> {
        self.members().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Pairs `(a, b)` where `a.spouse_id = b` but `b` does not point back.
    ///
    /// Empty whenever the spouse symmetry invariant holds.
    pub fn spouse_asymmetries(&self) -> Vec<(MemberId, MemberId)> {
        self.members
            .values()
            .filter_map(|m| {
                let spouse_id = m.spouse_id?;
                let back = self.members.get(&spouse_id).and_then(|s| s.spouse_id);
                (back != Some(m.id)).then_some((m.id, spouse_id))
            })
            .collect()
    }

    fn get_mut(&mut self, id: MemberId) -> Result<&mut Member, CoreError> {
        self.members
            .get_mut(&id)
            .ok_or_else(|| CoreError::member_not_found(id))
    }
}

/// An open transaction on a [`MemberSet`].
pub struct MemberSetTx<'a> {
    target: &'a mut MemberSet,
    work: MemberSet,
}

impl MemberSetTx<'_> {
    pub fn commit(self) {
        *self.target = self.work;
    }
}

impl Deref for MemberSetTx<'_> {
    type Target = MemberSet;

    fn deref(&self) -> &MemberSet {
        &self.work
    }
}

impl DerefMut for MemberSetTx<'_> {
    fn deref_mut(&mut self) -> &mut MemberSet {
        &mut self.work
    }
}

#[async_trait]
impl MemberStore for MemberSet {
    type Error = CoreError;

    async fn find(&mut self, id: MemberId) -> Result<Option<Member>, CoreError> {
        Ok(self.members.get(&id).cloned())
    }

    async fn find_roots(&mut self) -> Result<Vec<Member>, CoreError> {
        Ok(self.members().filter(|m| m.is_root()).cloned().collect())
    }

    async fn list(&mut self) -> Result<Vec<Member>, CoreError> {
        Ok(self.to_vec())
    }

    async fn child_ids(&mut self, parent_id: MemberId) -> Result<Vec<MemberId>, CoreError> {
        Ok(self
            .members()
            .filter(|m| m.parent_id == Some(parent_id))
            .map(|m| m.id)
            .collect())
    }

    async fn insert(&mut self, new: &NewMember) -> Result<Member, CoreError> {
        if let Some(parent_id) = new.parent_id {
            if !self.members.contains_key(&parent_id) {
                return Err(CoreError::member_not_found(parent_id));
            }
        }

        self.next_id += 1;
        let member = Member {
            id: self.next_id,
            name: new.name.clone(),
            gender: new.gender,
            relationship: new.relationship,
            birth_year: new.birth_year,
            death_year: new.death_year,
            photo_url: new.photo_url.clone(),
            spouse_name: new.spouse_name.clone(),
            spouse_id: None,
            parent_id: new.parent_id,
            mother_name: new.mother_name.clone(),
            location: new.location.clone(),
            created_at: chrono::Utc::now(),
        };
        self.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn save(&mut self, member: &Member) -> Result<(), CoreError> {
        let stored = self.get_mut(member.id)?;
        stored.name = member.name.clone();
        stored.gender = member.gender;
        stored.birth_year = member.birth_year;
        stored.death_year = member.death_year;
        stored.photo_url = member.photo_url.clone();
        stored.spouse_name = member.spouse_name.clone();
        stored.mother_name = member.mother_name.clone();
        stored.location = member.location.clone();
        Ok(())
    }

    async fn set_spouse(
        &mut self,
        id: MemberId,
        spouse_id: Option<MemberId>,
    ) -> Result<(), CoreError> {
        if let Some(spouse_id) = spouse_id {
            if !self.members.contains_key(&spouse_id) {
                return Err(CoreError::member_not_found(spouse_id));
            }
        }
        self.get_mut(id)?.spouse_id = spouse_id;
        Ok(())
    }

    async fn remove(&mut self, id: MemberId) -> Result<bool, CoreError> {
        if self.members.values().any(|m| m.parent_id == Some(id)) {
            return Err(CoreError::Conflict(format!(
                "Member {id} still has children"
            )));
        }
        let removed = self.members.remove(&id).is_some();
        // Same effect as the `ON DELETE SET NULL` spouse foreign key.
        for member in self.members.values_mut() {
            if member.spouse_id == Some(id) {
                member.spouse_id = None;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{Gender, MemberRef, Relationship};
    use crate::mutation;
    use crate::tree::tests::{child, married, root};
    use assert_matches::assert_matches;

    fn new_member(name: &str, parent_id: Option<MemberId>) -> NewMember {
        NewMember {
            name: name.to_string(),
            gender: Gender::Female,
            relationship: if parent_id.is_some() {
                Relationship::Child
            } else {
                Relationship::Root
            },
            birth_year: None,
            death_year: None,
            photo_url: None,
            spouse_name: None,
            parent_id,
            mother_name: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let mut set = MemberSet::new();
        let root = set.insert(&new_member("Root", None)).await.unwrap();
        let child = set.insert(&new_member("Child", Some(root.id))).await.unwrap();
        assert!(child.id > root.id);
        assert_eq!(set.child_ids(root.id).await.unwrap(), vec![child.id]);
    }

    #[tokio::test]
    async fn insert_under_missing_parent_fails() {
        let mut set = MemberSet::new();
        let result = set.insert(&new_member("Lost", Some(3))).await;
        assert_matches!(result, Err(CoreError::NotFound { id: 3, .. }));
    }

    #[tokio::test]
    async fn remove_refuses_members_with_children() {
        let mut set = MemberSet::new();
        let root = set.insert(&new_member("Root", None)).await.unwrap();
        set.insert(&new_member("Child", Some(root.id))).await.unwrap();
        assert_matches!(set.remove(root.id).await, Err(CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn remove_clears_dangling_spouse_pointers() {
        let mut set = MemberSet::new();
        let root = set.insert(&new_member("Root", None)).await.unwrap();
        let a = set.insert(&new_member("A", Some(root.id))).await.unwrap();
        set.set_spouse(root.id, Some(a.id)).await.unwrap();
        assert!(set.remove(a.id).await.unwrap());
        assert_eq!(set.get(root.id).unwrap().spouse_id, None);
    }

    /// Root 1, survivor 4 married to 2, and 2/3 parenting each other, so a
    /// delete of 2 unlinks 4 and then fails removing 3.
    fn cyclic_family() -> MemberSet {
        let (two, four) = married(child(2, "Two", 3), child(4, "Four", 1));
        MemberSet::from_members(vec![root(1, "r"), two, child(3, "Three", 2), four])
    }

    #[tokio::test]
    async fn failed_mutation_in_transaction_leaves_set_untouched() {
        let mut set = cyclic_family();
        let before = set.to_vec();

        let mut tx = set.begin();
        let result = mutation::delete_member(&mut *tx, MemberRef::Id(2)).await;
        assert_matches!(result, Err(CoreError::Conflict(_)));
        assert_eq!(tx.get(4).unwrap().spouse_id, None);
        drop(tx);

        assert_eq!(set.to_vec(), before);
        assert_eq!(set.get(4).unwrap().spouse_id, Some(2));
    }

    #[tokio::test]
    async fn failed_mutation_outside_transaction_keeps_partial_writes() {
        let mut set = cyclic_family();
        let result = mutation::delete_member(&mut set, MemberRef::Id(2)).await;
        assert_matches!(result, Err(CoreError::Conflict(_)));
        assert_eq!(set.get(4).unwrap().spouse_id, None);
    }

    #[tokio::test]
    async fn committed_transaction_applies_writes() {
        let mut set = MemberSet::new();
        let mut tx = set.begin();
        let root = tx.insert(&new_member("Root", None)).await.unwrap();
        tx.commit();
        assert_eq!(set.get(root.id).map(|m| m.name.as_str()), Some("Root"));

        let mut tx = set.begin();
        tx.insert(&new_member("Dropped", Some(root.id))).await.unwrap();
        drop(tx);
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn from_members_continues_id_sequence() {
        let mut seed = MemberSet::new();
        let root = seed.insert(&new_member("Root", None)).await.unwrap();
        let mut set = MemberSet::from_members(seed.to_vec());
        let next = set.insert(&new_member("Next", Some(root.id))).await.unwrap();
        assert_eq!(next.id, root.id + 1);
    }
}
