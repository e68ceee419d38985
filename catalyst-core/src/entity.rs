//! Entity references for embeddable content

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::CoreError;

/// Content types that can own embeddings
///
/// Kinds sort by their storage identifier ([`EntityKind::as_str`]), so
/// in-memory ordering agrees with `entity_type` ordering in SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Funding proposal
    Proposal,
    /// Community grouping proposals around a theme
    Community,
    /// Proposer group
    Group,
    /// Ideascale proposer profile
    IdeascaleProfile,
    /// Community review of a proposal
    Review,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Proposal,
        EntityKind::Community,
        EntityKind::Group,
        EntityKind::IdeascaleProfile,
        EntityKind::Review,
    ];

    /// Stable identifier used in storage and URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Proposal => "proposal",
            EntityKind::Community => "community",
            EntityKind::Group => "group",
            EntityKind::IdeascaleProfile => "ideascale_profile",
            EntityKind::Review => "review",
        }
    }
}

impl Ord for EntityKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for EntityKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "proposal" | "proposals" => Ok(EntityKind::Proposal),
            "community" | "communities" => Ok(EntityKind::Community),
            "group" | "groups" => Ok(EntityKind::Group),
            "ideascale_profile" | "ideascale-profile" | "profile" => {
                Ok(EntityKind::IdeascaleProfile)
            }
            "review" | "reviews" => Ok(EntityKind::Review),
            _ => Err(CoreError::unknown_kind(s)),
        }
    }
}

/// Reference to a single embeddable entity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn proposal(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Proposal, id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
