//! Repository for the `members` table.

use lineage_core::member::{Member, MemberId};
use lineage_core::store::NewMember;
use sqlx::PgExecutor;

use crate::models::member::MemberRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, gender, relationship, birth_year, death_year, photo_url, \
     spouse_name, spouse_id, parent_id, mother_name, location, created_at";

/// Creation order; `id` breaks ties between rows inserted in one transaction.
const CREATION_ORDER: &str = "ORDER BY created_at ASC, id ASC";

/// Provides the primitive statements over member rows.
pub struct MemberRepo;

impl MemberRepo {
    /// Insert a member with no spouse link, returning the created row.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewMember,
    ) -> Result<MemberRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO members
                (name, gender, relationship, birth_year, death_year, photo_url,
                 spouse_name, parent_id, mother_name, location)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MemberRow>(&query)
            .bind(&input.name)
            .bind(input.gender.as_str())
            .bind(input.relationship.as_str())
            .bind(input.birth_year)
            .bind(input.death_year)
            .bind(&input.photo_url)
            .bind(&input.spouse_name)
            .bind(input.parent_id)
            .bind(&input.mother_name)
            .bind(&input.location)
            .fetch_one(executor)
            .await
    }

    /// Find a member by id.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: MemberId,
    ) -> Result<Option<MemberRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM members WHERE id = $1");
        sqlx::query_as::<_, MemberRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Every row tagged as the root. More than one is a broken invariant the
    /// caller reports; the unique index normally prevents it.
    pub async fn find_roots<'e, E: PgExecutor<'e>>(
        executor: E,
    ) -> Result<Vec<MemberRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM members WHERE relationship = 'root' {CREATION_ORDER}");
        sqlx::query_as::<_, MemberRow>(&query)
            .fetch_all(executor)
            .await
    }

    /// List all members in creation order.
    pub async fn list<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<MemberRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM members {CREATION_ORDER}");
        sqlx::query_as::<_, MemberRow>(&query)
            .fetch_all(executor)
            .await
    }

    /// Ids of the direct children of `parent_id`, in creation order.
    pub async fn child_ids<'e, E: PgExecutor<'e>>(
        executor: E,
        parent_id: MemberId,
    ) -> Result<Vec<MemberId>, sqlx::Error> {
        let query = format!("SELECT id FROM members WHERE parent_id = $1 {CREATION_ORDER}");
        sqlx::query_scalar::<_, MemberId>(&query)
            .bind(parent_id)
            .fetch_all(executor)
            .await
    }

    /// Number of stored members.
    pub async fn count<'e, E: PgExecutor<'e>>(executor: E) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(executor)
            .await
    }

    /// Overwrite the editable fields of a member. Structural columns
    /// (`relationship`, `parent_id`, `spouse_id`) are never touched here.
    ///
    /// Returns `true` if the row existed.
    pub async fn update_fields<'e, E: PgExecutor<'e>>(
        executor: E,
        member: &Member,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE members SET
                name = $2,
                gender = $3,
                birth_year = $4,
                death_year = $5,
                photo_url = $6,
                spouse_name = $7,
                mother_name = $8,
                location = $9
             WHERE id = $1",
        )
        .bind(member.id)
        .bind(&member.name)
        .bind(member.gender.as_str())
        .bind(member.birth_year)
        .bind(member.death_year)
        .bind(&member.photo_url)
        .bind(&member.spouse_name)
        .bind(&member.mother_name)
        .bind(&member.location)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set or clear one side of a spouse link. Returns `true` if the row
    /// existed.
    pub async fn set_spouse<'e, E: PgExecutor<'e>>(
        executor: E,
        id: MemberId,
        spouse_id: Option<MemberId>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE members SET spouse_id = $2 WHERE id = $1")
            .bind(id)
            .bind(spouse_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a single member row. Returns `true` if a row was removed.
    pub async fn delete<'e, E: PgExecutor<'e>>(
        executor: E,
        id: MemberId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
