//! Row shape of the `members` table.

use lineage_core::error::CoreError;
use lineage_core::member::{Member, MemberId};
use lineage_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `members` table.
///
/// `gender` and `relationship` are stored as text and checked by the schema;
/// they are parsed into the core enums on conversion.
#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    pub id: MemberId,
    pub name: String,
    pub gender: String,
    pub relationship: String,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
    pub photo_url: Option<String>,
    pub spouse_name: Option<String>,
    pub spouse_id: Option<MemberId>,
    pub parent_id: Option<MemberId>,
    pub mother_name: Option<String>,
    pub location: Option<String>,
    pub created_at: Timestamp,
}

impl TryFrom<MemberRow> for Member {
    type Error = CoreError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        let corrupt = |e: CoreError| CoreError::Internal(format!("member {}: {e}", row.id));
        Ok(Member {
            id: row.id,
            gender: row.gender.parse().map_err(corrupt)?,
            relationship: row.relationship.parse().map_err(corrupt)?,
            name: row.name,
            birth_year: row.birth_year,
            death_year: row.death_year,
            photo_url: row.photo_url,
            spouse_name: row.spouse_name,
            spouse_id: row.spouse_id,
            parent_id: row.parent_id,
            mother_name: row.mother_name,
            location: row.location,
            created_at: row.created_at,
        })
    }
}

/// Convert a batch of rows, failing on the first unreadable one.
pub fn into_members(rows: Vec<MemberRow>) -> Result<Vec<Member>, CoreError> {
    rows.into_iter().map(Member::try_from).collect()
}
