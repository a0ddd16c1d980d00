//! Request bodies of the family HTTP API, shared by server and client.

use serde::{Deserialize, Serialize};

use crate::member::{MemberDraft, MemberRef};

/// Body of `POST /family/members`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    /// Member the new one is placed under; may be the root sentinel.
    pub parent_id: MemberRef,
    pub member: MemberDraft,
    /// Link the new member as the parent's spouse.
    #[serde(default)]
    pub should_link_spouse: bool,
}

/// Body of `POST /family/link` and `POST /family/unlink`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpousePairRequest {
    pub member_id1: MemberRef,
    pub member_id2: MemberRef,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::Gender;
    use serde_json::json;

    #[test]
    fn add_request_uses_camel_case_and_defaults() {
        let request: AddMemberRequest = serde_json::from_value(json!({
            "parentId": "root",
            "member": {"name": "Awa", "gender": "female"}
        }))
        .unwrap();
        assert_eq!(request.parent_id, MemberRef::Root);
        assert_eq!(request.member.gender, Gender::Female);
        assert!(!request.should_link_spouse);
    }

    #[test]
    fn pair_request_field_names() {
        let pair = SpousePairRequest {
            member_id1: MemberRef::Id(2),
            member_id2: MemberRef::Root,
        };
        assert_eq!(
            serde_json::to_value(pair).unwrap(),
            json!({"memberId1": 2, "memberId2": "root"})
        );
    }
}
