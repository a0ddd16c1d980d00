//! FamilyView against an in-process stub server.

mod common;

use assert_matches::assert_matches;
use common::{spawn, Stub};
use lineage_client::api::{FamilyApi, Operation};
use lineage_client::error::ClientError;
use lineage_client::view::FamilyView;
use lineage_core::member::{Gender, MemberDraft, MemberId, MemberPatch, MemberRef};

async fn session(stub: &Stub) -> FamilyView {
    let base = spawn(stub.clone()).await;
    FamilyView::new(FamilyApi::new(format!("{base}/api")))
}

fn draft(name: &str, birth_year: Option<i32>) -> MemberDraft {
    let draft = MemberDraft::new(name, Gender::Female);
    match birth_year {
        Some(year) => draft.with_birth_year(year),
        None => draft,
    }
}

/// Root with one child and a linked spouse. Returns (root, child, spouse).
async fn seed(view: &mut FamilyView) -> (MemberId, MemberId, MemberId) {
    let root = view
        .add_member(MemberRef::Root, draft("Sidafa Sano", Some(1950)), false)
        .await
        .unwrap();
    let child = view
        .add_member(MemberRef::Root, draft("Amina Sano", Some(1990)), false)
        .await
        .unwrap();
    let spouse = view
        .add_member(MemberRef::Root, draft("Awa", None), true)
        .await
        .unwrap();
    (root.id, child.id, spouse.id)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_server_loads_placeholder() {
    let stub = Stub::default();
    let mut view = session(&stub).await;
    view.load().await.unwrap();
    assert!(view.tree().is_placeholder());
    assert_eq!(view.tree().root().name, "Family Root");
}

#[tokio::test]
async fn first_member_added_under_placeholder_becomes_root() {
    let stub = Stub::default();
    let mut view = session(&stub).await;
    view.load().await.unwrap();

    let shown_root = view.tree().root_id();
    let first = view
        .add_member(MemberRef::Id(shown_root), draft("Sidafa Sano", Some(1950)), false)
        .await
        .unwrap();

    assert!(first.is_root());
    assert!(!view.tree().is_placeholder());
    assert_eq!(view.tree().root_id(), first.id);

    let child = view
        .add_member(MemberRef::Id(first.id), draft("Amina Sano", Some(1990)), false)
        .await
        .unwrap();
    assert_eq!(view.tree().children(first.id), &[child.id]);
}

#[tokio::test]
async fn load_failure_falls_back_to_placeholder() {
    let stub = Stub::default();
    let mut view = session(&stub).await;
    seed(&mut view).await;
    assert_eq!(view.tree().len(), 3);

    stub.set_fail_all(true);
    let err = view.load().await.unwrap_err();
    assert_eq!(err.operation, Operation::FetchTree);
    assert_eq!(err.to_string(), "Failed to fetch family tree");
    assert!(view.tree().is_placeholder());
}

// ---------------------------------------------------------------------------
// Mutate then re-fetch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn each_mutation_refetches_the_tree() {
    let stub = Stub::default();
    let mut view = session(&stub).await;
    let (root, child, spouse) = seed(&mut view).await;
    assert_eq!(stub.tree_fetches(), 3);

    assert_eq!(view.tree().root_id(), root);
    assert_eq!(view.tree().children(root), &[child, spouse]);
    assert_eq!(view.tree().spouse(root).map(|m| m.id), Some(spouse));
    let found: Vec<&str> = view.search("ami").iter().map(|m| m.name.as_str()).collect();
    assert_eq!(found, vec!["Amina Sano"]);
}

#[tokio::test]
async fn failed_mutation_leaves_local_tree_unchanged() {
    let stub = Stub::default();
    let mut view = session(&stub).await;
    let (_, child, _) = seed(&mut view).await;
    let fetches = stub.tree_fetches();

    stub.set_fail_mutations(true);
    let err = view
        .add_member(MemberRef::Id(child), draft("Khalil", None), false)
        .await
        .unwrap_err();
    assert_eq!(err.operation, Operation::AddMember);
    assert_eq!(err.to_string(), "Failed to add member");
    assert_eq!(err.source.status(), Some(500));

    let err = view.link_members(MemberRef::Root, MemberRef::Id(child)).await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to link members");

    assert_eq!(view.tree().len(), 3);
    assert_eq!(stub.tree_fetches(), fetches);
}

#[tokio::test]
async fn delete_removes_subtree_after_refetch() {
    let stub = Stub::default();
    let mut view = session(&stub).await;
    let (_, child, _) = seed(&mut view).await;
    let grandchild = view
        .add_member(MemberRef::Id(child), draft("Khalil", None), false)
        .await
        .unwrap();

    view.delete_member(MemberRef::Id(child)).await.unwrap();
    assert!(!view.tree().contains(child));
    assert!(!view.tree().contains(grandchild.id));
}

#[tokio::test]
async fn update_and_unlink_round_trip() {
    let stub = Stub::default();
    let mut view = session(&stub).await;
    let (root, _, spouse) = seed(&mut view).await;

    let patch = MemberPatch {
        name: Some("Sidafa S.".to_string()),
        ..Default::default()
    };
    let updated = view.update_member(MemberRef::Root, &patch).await.unwrap();
    assert_eq!(updated.name, "Sidafa S.");
    assert_eq!(view.tree().root().name, "Sidafa S.");

    view.unlink_members(MemberRef::Id(root), MemberRef::Id(spouse)).await.unwrap();
    assert!(view.tree().spouse(root).is_none());
    assert!(view.linked_pairs().is_empty());
}

#[tokio::test]
async fn server_errors_carry_status_and_body() {
    let stub = Stub::default();
    let base = spawn(stub).await;
    let api = FamilyApi::new(format!("{base}/api"));

    let err = api.delete_member(MemberRef::Id(404)).await.unwrap_err();
    assert_matches!(err, ClientError::Api { status: 404, ref body } if body.contains("NOT_FOUND"));
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[tokio::test]
async fn timeline_puts_unknown_years_last() {
    let stub = Stub::default();
    let mut view = session(&stub).await;
    seed(&mut view).await;
    let years: Vec<Option<i32>> = view.timeline().iter().map(|m| m.birth_year).collect();
    assert_eq!(years, vec![Some(1950), Some(1990), None]);
}

#[tokio::test]
async fn manage_list_excludes_root() {
    let stub = Stub::default();
    let mut view = session(&stub).await;
    let (root, child, spouse) = seed(&mut view).await;
    let ids: Vec<MemberId> = view.manageable("").iter().map(|m| m.id).collect();
    assert!(!ids.contains(&root));
    assert!(ids.contains(&child) && ids.contains(&spouse));
}

// ---------------------------------------------------------------------------
// Chart carry-over
// ---------------------------------------------------------------------------

#[tokio::test]
async fn collapsed_nodes_survive_refetch() {
    let stub = Stub::default();
    let mut view = session(&stub).await;
    let (_, child, _) = seed(&mut view).await;
    let grandchild = view
        .add_member(MemberRef::Id(child), draft("Khalil", None), false)
        .await
        .unwrap();

    let now = view.now();
    let chart = view.open_chart(800.0, 600.0);
    assert!(chart.toggle(child, now));

    let sibling = view
        .add_member(MemberRef::Id(child), draft("Mariam", None), false)
        .await
        .unwrap();

    let chart = view.chart().unwrap();
    assert!(chart.is_collapsed(child));
    assert!(chart.tree().contains(sibling.id));
    assert!(!chart.layout().contains(grandchild.id));
    assert!(!chart.layout().contains(sibling.id));
}
