//! REST client for the family API.

use std::fmt;

use lineage_core::member::{Member, MemberPatch, MemberRef};
use lineage_core::request::{AddMemberRequest, SpousePairRequest};
use lineage_core::tree::FamilyNode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ClientError;

/// The calls a session can make, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FetchTree,
    AddMember,
    UpdateMember,
    DeleteMember,
    LinkMembers,
    UnlinkMembers,
}

impl Operation {
    /// Message shown to the user when the call fails.
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::FetchTree => "Failed to fetch family tree",
            Operation::AddMember => "Failed to add member",
            Operation::UpdateMember => "Failed to update member",
            Operation::DeleteMember => "Failed to delete member",
            Operation::LinkMembers => "Failed to link members",
            Operation::UnlinkMembers => "Failed to unlink members",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.failure_message())
    }
}

#[derive(Deserialize)]
struct DataResponse<T> {
    data: T,
}

/// HTTP client for one family API server.
#[derive(Debug, Clone)]
pub struct FamilyApi {
    client: reqwest::Client,
    api_url: String,
}

impl FamilyApi {
    /// * `api_url` - Base URL including the `/api` prefix, e.g.
    ///   `http://localhost:3001/api`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// `GET /family`: the assembled nested tree.
    pub async fn get_family_tree(&self) -> Result<FamilyNode, ClientError> {
        let response = self
            .client
            .get(format!("{}/family", self.api_url))
            .send()
            .await?;
        Self::parse_data(response).await
    }

    /// `POST /family/members`: returns the created member.
    pub async fn add_member(&self, request: &AddMemberRequest) -> Result<Member, ClientError> {
        let response = self
            .client
            .post(format!("{}/family/members", self.api_url))
            .json(request)
            .send()
            .await?;
        Self::parse_data(response).await
    }

    /// `PUT /family/members/{id}`: returns the updated member.
    pub async fn update_member(
        &self,
        member: MemberRef,
        patch: &MemberPatch,
    ) -> Result<Member, ClientError> {
        let response = self
            .client
            .put(format!("{}/family/members/{member}", self.api_url))
            .json(patch)
            .send()
            .await?;
        Self::parse_data(response).await
    }

    /// `DELETE /family/members/{id}`: removes the member and its subtree.
    pub async fn delete_member(&self, member: MemberRef) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(format!("{}/family/members/{member}", self.api_url))
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// `POST /family/link`.
    pub async fn link_members(&self, first: MemberRef, second: MemberRef) -> Result<(), ClientError> {
        self.post_pair("link", first, second).await
    }

    /// `POST /family/unlink`.
    pub async fn unlink_members(
        &self,
        first: MemberRef,
        second: MemberRef,
    ) -> Result<(), ClientError> {
        self.post_pair("unlink", first, second).await
    }

    // ---- private helpers ----

    async fn post_pair(
        &self,
        action: &str,
        first: MemberRef,
        second: MemberRef,
    ) -> Result<(), ClientError> {
        let body = SpousePairRequest {
            member_id1: first,
            member_id2: second,
        };
        let response = self
            .client
            .post(format!("{}/family/{action}", self.api_url))
            .json(&body)
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ClientError::Api`] containing
    /// the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse the `data` field of a successful `{ "data": ... }` body.
    async fn parse_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        let envelope: DataResponse<T> = serde_json::from_slice(&bytes)?;
        Ok(envelope.data)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ClientError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
