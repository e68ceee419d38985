//! Swipe session feedback

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{CoreError, CoreResult};

/// Direction of a single swipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    /// Right swipe (liked)
    Right,
    /// Left swipe (disliked)
    Left,
}

/// One swipe from a session log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swipe {
    pub entity_id: String,
    pub direction: SwipeDirection,
}

impl Swipe {
    pub fn right(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            direction: SwipeDirection::Right,
        }
    }

    pub fn left(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            direction: SwipeDirection::Left,
        }
    }
}

/// Liked and disliked ids from one feedback session
///
/// The two sets are always disjoint. Empty sets are valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackSet {
    liked_ids: BTreeSet<String>,
    disliked_ids: BTreeSet<String>,
}

impl FeedbackSet {
    /// Build a feedback set, rejecting ids present on both sides
    pub fn new<L, D>(liked: L, disliked: D) -> CoreResult<Self>
    where
        L: IntoIterator,
        L::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        let liked_ids: BTreeSet<String> = liked.into_iter().map(Into::into).collect();
        let disliked_ids: BTreeSet<String> = disliked.into_iter().map(Into::into).collect();

        let overlap: Vec<String> = liked_ids.intersection(&disliked_ids).cloned().collect();
        if !overlap.is_empty() {
            return Err(CoreError::OverlappingFeedback(overlap));
        }

        Ok(Self {
            liked_ids,
            disliked_ids,
        })
    }

    /// Fold an ordered swipe log; the latest swipe for an id wins
    pub fn from_swipes<I>(swipes: I) -> Self
    where
        I: IntoIterator<Item = Swipe>,
    {
        let mut set = Self::default();
        for swipe in swipes {
            match swipe.direction {
                SwipeDirection::Right => {
                    set.disliked_ids.remove(&swipe.entity_id);
                    set.liked_ids.insert(swipe.entity_id);
                }
                SwipeDirection::Left => {
                    set.liked_ids.remove(&swipe.entity_id);
                    set.disliked_ids.insert(swipe.entity_id);
                }
            }
        }
        set
    }

    pub fn liked_ids(&self) -> &BTreeSet<String> {
        &self.liked_ids
    }

    pub fn disliked_ids(&self) -> &BTreeSet<String> {
        &self.disliked_ids
    }

    /// Every id the user has already swiped on
    pub fn swiped_ids(&self) -> impl Iterator<Item = &String> {
        self.liked_ids.iter().chain(self.disliked_ids.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.liked_ids.is_empty() && self.disliked_ids.is_empty()
    }
}
