//! Client session over the family API.
//!
//! [`FamilyView`] never updates the tree optimistically. A mutation is sent,
//! and only after the server accepts it is the whole tree fetched again. A
//! failed mutation leaves the local tree exactly as it was and reports which
//! operation failed.

use std::fmt;
use std::time::{Duration, Instant};

use lineage_core::chart::ChartState;
use lineage_core::error::CoreError;
use lineage_core::member::{Member, MemberDraft, MemberId, MemberPatch, MemberRef};
use lineage_core::query;
use lineage_core::request::AddMemberRequest;
use lineage_core::tree::FamilyTree;

use crate::api::{FamilyApi, Operation};
use crate::error::ClientError;

/// A failed call, labelled with the operation that failed.
#[derive(Debug)]
pub struct OperationError {
    pub operation: Operation,
    pub source: ClientError,
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation.failure_message())
    }
}

impl std::error::Error for OperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

fn labelled(operation: Operation) -> impl FnOnce(ClientError) -> OperationError {
    move |source| {
        tracing::warn!(error = %source, "{}", operation.failure_message());
        OperationError { operation, source }
    }
}

pub struct FamilyView {
    api: FamilyApi,
    tree: FamilyTree,
    chart: Option<ChartState>,
    clock: Instant,
}

impl FamilyView {
    /// A session that shows the placeholder root until [`FamilyView::load`]
    /// succeeds.
    pub fn new(api: FamilyApi) -> Self {
        Self {
            api,
            tree: FamilyTree::placeholder(),
            chart: None,
            clock: Instant::now(),
        }
    }

    pub fn api(&self) -> &FamilyApi {
        &self.api
    }

    pub fn tree(&self) -> &FamilyTree {
        &self.tree
    }

    /// Time since the session started, the clock the chart runs on.
    pub fn now(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Fetch the tree from the server.
    ///
    /// On a transport failure or a server-side root invariant violation the
    /// session falls back to the placeholder root so it stays usable; the
    /// error is still returned for display.
    pub async fn load(&mut self) -> Result<(), OperationError> {
        match self.fetch().await {
            Ok(tree) => {
                self.replace_tree(tree);
                Ok(())
            }
            Err(err) => {
                self.replace_tree(FamilyTree::placeholder());
                Err(err)
            }
        }
    }

    /// Fetch the tree again, keeping the current one if the fetch fails.
    pub async fn refresh(&mut self) -> Result<(), OperationError> {
        let tree = self.fetch().await?;
        self.replace_tree(tree);
        Ok(())
    }

    async fn fetch(&self) -> Result<FamilyTree, OperationError> {
        let node = self
            .api
            .get_family_tree()
            .await
            .map_err(labelled(Operation::FetchTree))?;

        match FamilyTree::from_nested(node) {
            Ok(tree) => {
                for warning in tree.warnings() {
                    tracing::warn!(%warning, "Family tree assembly warning");
                }
                Ok(tree)
            }
            Err(CoreError::RootInvariant(msg)) => {
                tracing::warn!(error = %msg, "Root invariant violated, showing placeholder");
                Ok(FamilyTree::placeholder())
            }
            Err(other) => Err(labelled(Operation::FetchTree)(other.into())),
        }
    }

    fn replace_tree(&mut self, tree: FamilyTree) {
        let now = self.now();
        if let Some(chart) = &mut self.chart {
            chart.set_tree(tree.clone(), now);
        }
        self.tree = tree;
    }

    // ---- mutations ----

    /// Ids taken from the displayed tree; the placeholder root becomes the
    /// root sentinel.
    fn addressed(&self, member: MemberRef) -> MemberRef {
        match member {
            MemberRef::Id(id) => self.tree.member_ref(id),
            MemberRef::Root => MemberRef::Root,
        }
    }

    /// Add a member under `parent`, optionally as the parent's spouse.
    pub async fn add_member(
        &mut self,
        parent: MemberRef,
        draft: MemberDraft,
        link_as_spouse: bool,
    ) -> Result<Member, OperationError> {
        let request = AddMemberRequest {
            parent_id: self.addressed(parent),
            member: draft,
            should_link_spouse: link_as_spouse,
        };
        let member = self
            .api
            .add_member(&request)
            .await
            .map_err(labelled(Operation::AddMember))?;
        self.refresh().await?;
        Ok(member)
    }

    pub async fn update_member(
        &mut self,
        member: MemberRef,
        patch: &MemberPatch,
    ) -> Result<Member, OperationError> {
        let updated = self
            .api
            .update_member(self.addressed(member), patch)
            .await
            .map_err(labelled(Operation::UpdateMember))?;
        self.refresh().await?;
        Ok(updated)
    }

    /// Delete a member and its whole subtree.
    pub async fn delete_member(&mut self, member: MemberRef) -> Result<(), OperationError> {
        self.api
            .delete_member(self.addressed(member))
            .await
            .map_err(labelled(Operation::DeleteMember))?;
        self.refresh().await
    }

    pub async fn link_members(
        &mut self,
        first: MemberRef,
        second: MemberRef,
    ) -> Result<(), OperationError> {
        self.api
            .link_members(self.addressed(first), self.addressed(second))
            .await
            .map_err(labelled(Operation::LinkMembers))?;
        self.refresh().await
    }

    pub async fn unlink_members(
        &mut self,
        first: MemberRef,
        second: MemberRef,
    ) -> Result<(), OperationError> {
        self.api
            .unlink_members(self.addressed(first), self.addressed(second))
            .await
            .map_err(labelled(Operation::UnlinkMembers))?;
        self.refresh().await
    }

    // ---- views ----

    pub fn search(&self, text: &str) -> Vec<&Member> {
        query::search(&self.tree, text)
    }

    pub fn timeline(&self) -> Vec<&Member> {
        query::timeline(&self.tree)
    }

    pub fn gallery(&self) -> Vec<&Member> {
        query::gallery(&self.tree)
    }

    pub fn spouses_of(&self, id: MemberId) -> Vec<&Member> {
        query::spouses_of(&self.tree, id)
    }

    /// Names to show as spouses on a profile, falling back to the legacy
    /// free-text spouse name.
    pub fn spouse_names(&self, id: MemberId) -> Vec<String> {
        query::spouse_names(&self.tree, id)
    }

    /// Non-root members for the manage list, filtered by `text`.
    pub fn manageable(&self, text: &str) -> Vec<&Member> {
        query::manageable(&self.tree, text)
    }

    /// Linked spouse pairs, each listed once.
    pub fn linked_pairs(&self) -> Vec<(&Member, &Member)> {
        self.tree.linked_pairs()
    }

    // ---- chart ----

    /// Show the chart in a `width` x `height` window. Replaces any existing
    /// chart state.
    pub fn open_chart(&mut self, width: f64, height: f64) -> &mut ChartState {
        let now = self.now();
        self.chart.insert(ChartState::new(self.tree.clone(), width, height, now))
    }

    pub fn chart(&self) -> Option<&ChartState> {
        self.chart.as_ref()
    }

    pub fn chart_mut(&mut self) -> Option<&mut ChartState> {
        self.chart.as_mut()
    }

    pub fn close_chart(&mut self) {
        self.chart = None;
    }
}
