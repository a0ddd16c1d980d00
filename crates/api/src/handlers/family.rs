//! Handlers for the `/family` resource.
//!
//! Every mutation runs in one transaction through [`PgMemberStore`]; an
//! error drops the transaction and leaves the store untouched.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use lineage_core::error::CoreError;
use lineage_core::member::{Member, MemberPatch, MemberRef};
use lineage_core::mutation;
use lineage_core::request::{AddMemberRequest, SpousePairRequest};
use lineage_core::store::MemberStore;
use lineage_core::tree::{FamilyNode, FamilyTree};
use lineage_db::models::member::into_members;
use lineage_db::repositories::MemberRepo;
use lineage_db::store::PgMemberStore;

use crate::error::AppResult;
use crate::extract::AppJson;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/family
///
/// An empty store yields the placeholder root.
pub async fn get_tree(State(state): State<AppState>) -> AppResult<Json<DataResponse<FamilyNode>>> {
    let members = into_members(MemberRepo::list(&state.pool).await?)?;
    if members.is_empty() {
        return Ok(Json(DataResponse {
            data: FamilyTree::placeholder().to_nested(),
        }));
    }

    let count = members.len();
    let tree = FamilyTree::assemble(members).map_err(|e| match e {
        CoreError::NoRoot => {
            CoreError::RootInvariant(format!("none of {count} members qualifies as root"))
        }
        other => other,
    })?;
    for warning in tree.warnings() {
        tracing::warn!(%warning, "Family tree assembly warning");
    }

    Ok(Json(DataResponse {
        data: tree.to_nested(),
    }))
}

/// POST /api/family/members
pub async fn add_member(
    State(state): State<AppState>,
    AppJson(input): AppJson<AddMemberRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Member>>)> {
    let mut tx = state.pool.begin().await?;
    let outcome = {
        let mut store = PgMemberStore::new(&mut *tx);
        mutation::add_member(
            &mut store,
            input.parent_id,
            &input.member,
            input.should_link_spouse,
        )
        .await?
    };
    tx.commit().await?;

    if let Some(former) = outcome.displaced_spouse {
        tracing::info!(
            member_id = outcome.member.id,
            displaced_spouse_id = former,
            "Previous spouse unlinked by new spouse"
        );
    }
    tracing::info!(
        member_id = outcome.member.id,
        parent_id = ?outcome.member.parent_id,
        relationship = outcome.member.relationship.as_str(),
        linked_spouse = input.should_link_spouse,
        became_root = outcome.became_root,
        "Family member added"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: outcome.member,
        }),
    ))
}

/// PUT /api/family/members/{id}
pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(patch): AppJson<MemberPatch>,
) -> AppResult<Json<DataResponse<Member>>> {
    let target: MemberRef = id.parse()?;

    let mut tx = state.pool.begin().await?;
    let member = {
        let mut store = PgMemberStore::new(&mut *tx);
        mutation::update_member(&mut store, target, &patch).await?
    };
    tx.commit().await?;

    tracing::info!(member_id = member.id, "Family member updated");
    Ok(Json(DataResponse { data: member }))
}

/// DELETE /api/family/members/{id}
///
/// Removes the member and every descendant. The root cannot be deleted.
pub async fn delete_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let target: MemberRef = id.parse()?;

    let mut tx = state.pool.begin().await?;
    let outcome = {
        let mut store = PgMemberStore::new(&mut *tx);
        let member = store.require(target).await?;
        if member.is_root() {
            return Err(CoreError::Conflict(
                "The root member cannot be deleted".to_string(),
            )
            .into());
        }
        mutation::delete_member(&mut store, MemberRef::Id(member.id)).await?
    };
    tx.commit().await?;

    tracing::info!(
        deleted = ?outcome.deleted,
        unlinked = ?outcome.unlinked,
        "Family members deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/family/link
pub async fn link(
    State(state): State<AppState>,
    AppJson(input): AppJson<SpousePairRequest>,
) -> AppResult<StatusCode> {
    let mut tx = state.pool.begin().await?;
    let outcome = {
        let mut store = PgMemberStore::new(&mut *tx);
        mutation::link_members(&mut store, input.member_id1, input.member_id2).await?
    };
    tx.commit().await?;

    for former in &outcome.displaced {
        tracing::info!(
            displaced_spouse_id = former,
            "Previous spouse unlinked by relink"
        );
    }
    tracing::info!(
        first = outcome.first,
        second = outcome.second,
        unchanged = outcome.unchanged,
        "Spouses linked"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/family/unlink
///
/// Idempotent: unlinking a pair that is not linked still succeeds.
pub async fn unlink(
    State(state): State<AppState>,
    AppJson(input): AppJson<SpousePairRequest>,
) -> AppResult<StatusCode> {
    let mut tx = state.pool.begin().await?;
    let changed = {
        let mut store = PgMemberStore::new(&mut *tx);
        mutation::unlink_members(&mut store, input.member_id1, input.member_id2).await?
    };
    tx.commit().await?;

    tracing::info!(
        first = %input.member_id1,
        second = %input.member_id2,
        changed,
        "Spouses unlinked"
    );
    Ok(StatusCode::NO_CONTENT)
}
