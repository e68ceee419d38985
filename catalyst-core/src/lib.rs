//! Core types for the Catalyst Explorer recommendation engine
//!
//! This crate defines the shared data structures used across the workspace:
//! polymorphic entity references, swipe feedback sets, and the ranked search
//! results that the recommender re-orders.

pub mod entity;
pub mod error;
pub mod feedback;
pub mod search;

pub use entity::{EntityKind, EntityRef};
pub use error::{CoreError, CoreResult};
pub use feedback::{FeedbackSet, Swipe, SwipeDirection};
pub use search::RankedResult;
