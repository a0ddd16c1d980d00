//! [`MemberStore`] over a PostgreSQL connection.
//!
//! Handlers open a transaction, wrap it in a [`PgMemberStore`], run one core
//! mutation and commit. A failed mutation drops the transaction, which rolls
//! every partial write back.

use async_trait::async_trait;
use lineage_core::error::CoreError;
use lineage_core::member::{Gender, Member, MemberDraft, MemberId, MemberRef};
use lineage_core::mutation;
use lineage_core::store::{MemberStore, NewMember};
use sqlx::PgConnection;

use crate::models::member::into_members;
use crate::repositories::MemberRepo;
use crate::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A member store bound to one connection, usually a transaction.
pub struct PgMemberStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgMemberStore<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<'c> MemberStore for PgMemberStore<'c> {
    type Error = StoreError;

    async fn find(&mut self, id: MemberId) -> Result<Option<Member>, StoreError> {
        let row = MemberRepo::find_by_id(&mut *self.conn, id).await?;
        Ok(row.map(Member::try_from).transpose()?)
    }

    async fn find_roots(&mut self) -> Result<Vec<Member>, StoreError> {
        let rows = MemberRepo::find_roots(&mut *self.conn).await?;
        Ok(into_members(rows)?)
    }

    async fn list(&mut self) -> Result<Vec<Member>, StoreError> {
        let rows = MemberRepo::list(&mut *self.conn).await?;
        Ok(into_members(rows)?)
    }

    async fn child_ids(&mut self, parent_id: MemberId) -> Result<Vec<MemberId>, StoreError> {
        Ok(MemberRepo::child_ids(&mut *self.conn, parent_id).await?)
    }

    async fn insert(&mut self, new: &NewMember) -> Result<Member, StoreError> {
        let row = MemberRepo::create(&mut *self.conn, new).await?;
        Ok(Member::try_from(row)?)
    }

    async fn save(&mut self, member: &Member) -> Result<(), StoreError> {
        if !MemberRepo::update_fields(&mut *self.conn, member).await? {
            return Err(CoreError::member_not_found(member.id).into());
        }
        Ok(())
    }

    async fn set_spouse(
        &mut self,
        id: MemberId,
        spouse_id: Option<MemberId>,
    ) -> Result<(), StoreError> {
        if !MemberRepo::set_spouse(&mut *self.conn, id, spouse_id).await? {
            return Err(CoreError::member_not_found(id).into());
        }
        Ok(())
    }

    async fn remove(&mut self, id: MemberId) -> Result<bool, StoreError> {
        Ok(MemberRepo::delete(&mut *self.conn, id).await?)
    }
}

/// Create the root member if the table is empty.
///
/// Returns the new root, or `None` when members already exist.
pub async fn seed_root(pool: &DbPool, name: &str) -> Result<Option<Member>, StoreError> {
    let mut tx = pool.begin().await?;
    if MemberRepo::count(&mut *tx).await? > 0 {
        return Ok(None);
    }

    let draft = MemberDraft::new(name, Gender::Male);
    let outcome = {
        let mut store = PgMemberStore::new(&mut *tx);
        mutation::add_member(&mut store, MemberRef::Root, &draft, false).await?
    };
    tx.commit().await?;

    tracing::info!(member_id = outcome.member.id, name = %outcome.member.name, "Seeded root member");
    Ok(Some(outcome.member))
}
