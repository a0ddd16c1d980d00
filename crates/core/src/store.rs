//! The member store seam.
//!
//! [`MemberStore`] is the primitive persistence interface the mutation
//! operations in [`crate::mutation`] are written against. It knows nothing
//! about trees or spouse symmetry; those invariants live in the mutations so
//! the in-memory store and the PostgreSQL store share one implementation of
//! them.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::member::{Gender, Member, MemberDraft, MemberId, MemberRef, Relationship};

/// Fields for inserting a new member row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub name: String,
    pub gender: Gender,
    pub relationship: Relationship,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
    pub photo_url: Option<String>,
    pub spouse_name: Option<String>,
    pub parent_id: Option<MemberId>,
    pub mother_name: Option<String>,
    pub location: Option<String>,
}

impl NewMember {
    /// Build an insert from a validated draft placed under `parent_id`.
    pub fn from_draft(
        draft: &MemberDraft,
        relationship: Relationship,
        parent_id: Option<MemberId>,
    ) -> Self {
        let non_blank = |value: &Option<String>| value.clone().filter(|s| !s.trim().is_empty());
        Self {
            name: draft.name.trim().to_string(),
            gender: draft.gender,
            relationship,
            birth_year: draft.birth_year,
            death_year: draft.death_year,
            photo_url: non_blank(&draft.photo_url),
            spouse_name: non_blank(&draft.spouse_name),
            parent_id,
            mother_name: non_blank(&draft.metadata.mother_name),
            location: non_blank(&draft.metadata.location),
        }
    }
}

/// Primitive operations over canonical member records.
///
/// Each call applies immediately. Callers get all-or-nothing mutations by
/// running them on a transactional handle: a `PgMemberStore` over an open
/// transaction, or a [`crate::memory::MemberSetTx`].
#[async_trait]
pub trait MemberStore: Send {
    type Error: From<CoreError> + Send;

    /// Fetch a member by id.
    async fn find(&mut self, id: MemberId) -> Result<Option<Member>, Self::Error>;

    /// All members tagged `relationship = root`.
    async fn find_roots(&mut self) -> Result<Vec<Member>, Self::Error>;

    /// Every member, in creation order.
    async fn list(&mut self) -> Result<Vec<Member>, Self::Error>;

    /// Ids of the direct children of `parent_id`, in creation order.
    async fn child_ids(&mut self, parent_id: MemberId) -> Result<Vec<MemberId>, Self::Error>;

    /// Insert a member with no spouse link, returning the stored record.
    async fn insert(&mut self, new: &NewMember) -> Result<Member, Self::Error>;

    /// Persist the editable fields of `member` (name through location).
    async fn save(&mut self, member: &Member) -> Result<(), Self::Error>;

    /// Set or clear one side of a spouse link.
    async fn set_spouse(
        &mut self,
        id: MemberId,
        spouse_id: Option<MemberId>,
    ) -> Result<(), Self::Error>;

    /// Remove a single member row. Returns `false` if it did not exist.
    async fn remove(&mut self, id: MemberId) -> Result<bool, Self::Error>;

    /// Resolve a [`MemberRef`] to a stored member, if any.
    ///
    /// The root sentinel resolves to the unique tagged root; more than one
    /// tagged root is a root invariant violation.
    async fn resolve(&mut self, member: MemberRef) -> Result<Option<Member>, Self::Error> {
        match member {
            MemberRef::Id(id) => self.find(id).await,
            MemberRef::Root => {
                let mut roots = self.find_roots().await?;
                match roots.len() {
                    0 => Ok(None),
                    1 => Ok(roots.pop()),
                    n => Err(CoreError::RootInvariant(format!(
                        "expected one root member, found {n}"
                    ))
                    .into()),
                }
            }
        }
    }

    /// Like [`MemberStore::resolve`], but a miss is a `NotFound` error.
    async fn require(&mut self, member: MemberRef) -> Result<Member, Self::Error> {
        match self.resolve(member).await? {
            Some(found) => Ok(found),
            None => Err(match member {
                MemberRef::Id(id) => CoreError::member_not_found(id),
                MemberRef::Root => CoreError::NoRoot,
            }
            .into()),
        }
    }
}
