//! Family member records, drafts and partial updates.
//!
//! [`Member`] is the flat record the store owns. [`MemberDraft`] is the input
//! for creating one and [`MemberPatch`] the field-level update, where an
//! absent field is left untouched and an explicit `null` (or empty string)
//! clears an optional field.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use validator::Validate;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Identifier of a family member.
pub type MemberId = DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum allowed length for a member name.
pub const MAX_NAME_LENGTH: usize = 200;

/// Path/body token that stands for "whichever member is the root".
pub const ROOT_SENTINEL: &str = "root";

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl FromStr for Gender {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(CoreError::Validation(format!(
                "Invalid gender '{other}'. Must be one of: male, female"
            ))),
        }
    }
}

/// Structural role of a member relative to its parent slot in the tree.
///
/// This is not a biological relationship: a `Spouse` member is stored under
/// its partner as a pseudo-child so it renders next to them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Root,
    Spouse,
    #[default]
    Child,
}

impl Relationship {
    pub fn as_str(self) -> &'static str {
        match self {
            Relationship::Root => "root",
            Relationship::Spouse => "spouse",
            Relationship::Child => "child",
        }
    }
}

impl FromStr for Relationship {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(Relationship::Root),
            "spouse" => Ok(Relationship::Spouse),
            "child" => Ok(Relationship::Child),
            other => Err(CoreError::Validation(format!(
                "Invalid relationship '{other}'. Must be one of: root, spouse, child"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

/// Display-only attributes grouped the way the tree wire shape nests them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberMetadata {
    #[serde(default)]
    pub mother_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// A flat member record as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub gender: Gender,
    pub relationship: Relationship,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
    pub photo_url: Option<String>,
    /// Free-text spouse name kept from before spouses were linked records.
    pub spouse_name: Option<String>,
    pub spouse_id: Option<MemberId>,
    pub parent_id: Option<MemberId>,
    pub mother_name: Option<String>,
    pub location: Option<String>,
    pub created_at: Timestamp,
}

impl Member {
    pub fn is_root(&self) -> bool {
        self.relationship == Relationship::Root
    }

    /// Whether the member has a usable photo reference.
    pub fn has_photo(&self) -> bool {
        self.photo_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    pub fn metadata(&self) -> MemberMetadata {
        MemberMetadata {
            mother_name: self.mother_name.clone(),
            location: self.location.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Member references (id or root sentinel)
// ---------------------------------------------------------------------------

/// A member id as callers supply it: either a concrete id or the `root`
/// sentinel, which stores resolve to the actual root record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberRef {
    Root,
    Id(MemberId),
}

impl From<MemberId> for MemberRef {
    fn from(id: MemberId) -> Self {
        MemberRef::Id(id)
    }
}

impl FromStr for MemberRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == ROOT_SENTINEL {
            return Ok(MemberRef::Root);
        }
        s.parse::<MemberId>()
            .map(MemberRef::Id)
            .map_err(|_| CoreError::Validation(format!("Invalid member id '{s}'")))
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberRef::Root => f.write_str(ROOT_SENTINEL),
            MemberRef::Id(id) => write!(f, "{id}"),
        }
    }
}

impl Serialize for MemberRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MemberRef::Root => serializer.serialize_str(ROOT_SENTINEL),
            MemberRef::Id(id) => serializer.serialize_i64(*id),
        }
    }
}

impl<'de> Deserialize<'de> for MemberRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(id) => Ok(MemberRef::Id(id)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

/// Accepts an integer, a numeric string, `""` or `null` for a year field.
fn lenient_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    let to_year = |value: i64| {
        i32::try_from(value).map_err(|_| serde::de::Error::custom(format!("year {value} out of range")))
    };

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(value)) => to_year(value).map(Some),
        Some(Raw::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            let value = text
                .parse::<i64>()
                .map_err(|_| serde::de::Error::custom(format!("invalid year '{text}'")))?;
            to_year(value).map(Some)
        }
    }
}

/// Present-but-empty year clears the field.
fn patch_year<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Option<i32>>, D::Error> {
    lenient_year(deserializer).map(Some)
}

/// Present-but-empty (or `null`) text clears the field.
fn patch_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Option<String>>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(Some(value.filter(|s| !s.trim().is_empty())))
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for creating a member.
///
/// Has no `spouseId`: spouse links are only created through the linking
/// operations.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MemberDraft {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<Relationship>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub birth_year: Option<i32>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub death_year: Option<i32>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub spouse_name: Option<String>,
    #[serde(default)]
    pub metadata: MemberMetadata,
}

impl MemberDraft {
    /// A minimal draft with just a name and gender.
    pub fn new(name: impl Into<String>, gender: Gender) -> Self {
        Self {
            name: name.into(),
            gender,
            relationship: None,
            birth_year: None,
            death_year: None,
            photo_url: None,
            spouse_name: None,
            metadata: MemberMetadata::default(),
        }
    }

    pub fn with_birth_year(mut self, year: i32) -> Self {
        self.birth_year = Some(year);
        self
    }

    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationship = Some(relationship);
        self
    }

    /// Check all draft constraints.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        validate_name(&self.name)?;
        validate_years(self.birth_year, self.death_year)
    }
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    #[serde(
        default,
        deserialize_with = "patch_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "patch_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub mother_name: Option<Option<String>>,
}

/// Field-level update for a member (all fields optional).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(
        default,
        deserialize_with = "patch_year",
        skip_serializing_if = "Option::is_none"
    )]
    pub birth_year: Option<Option<i32>>,
    #[serde(
        default,
        deserialize_with = "patch_year",
        skip_serializing_if = "Option::is_none"
    )]
    pub death_year: Option<Option<i32>>,
    #[serde(
        default,
        deserialize_with = "patch_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataPatch>,
}

impl MemberPatch {
    pub fn is_empty(&self) -> bool {
        self == &MemberPatch::default()
    }

    /// Apply the present fields to `member`, then validate the result.
    ///
    /// On error `member` is left untouched.
    pub fn apply_to(&self, member: &mut Member) -> Result<(), CoreError> {
        let mut updated = member.clone();

        if let Some(name) = &self.name {
            validate_name(name)?;
            updated.name = name.trim().to_string();
        }
        if let Some(gender) = self.gender {
            updated.gender = gender;
        }
        if let Some(birth_year) = self.birth_year {
            updated.birth_year = birth_year;
        }
        if let Some(death_year) = self.death_year {
            updated.death_year = death_year;
        }
        if let Some(photo_url) = &self.photo_url {
            updated.photo_url = photo_url.clone();
        }
        if let Some(metadata) = &self.metadata {
            if let Some(location) = &metadata.location {
                updated.location = location.clone();
            }
            if let Some(mother_name) = &metadata.mother_name {
                updated.mother_name = mother_name.clone();
            }
        }

        validate_years(updated.birth_year, updated.death_year)?;
        *member = updated;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a member name: non-blank and within [`MAX_NAME_LENGTH`].
pub fn validate_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Member name must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Member name must not exceed {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// A death year, when both are known, must not precede the birth year.
pub fn validate_years(birth_year: Option<i32>, death_year: Option<i32>) -> Result<(), CoreError> {
    match (birth_year, death_year) {
        (Some(birth), Some(death)) if death < birth => Err(CoreError::Validation(format!(
            "Death year {death} is before birth year {birth}"
        ))),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
