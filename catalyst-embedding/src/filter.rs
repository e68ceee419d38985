//! Typed metadata predicates for pre-filtering similarity candidates

use catalyst_core::EntityKind;
use serde::{Deserialize, Serialize};

use crate::types::{EmbeddingMetadata, EmbeddingRecord};

/// Comparison operator for ordered fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CmpOp {
    pub fn compare<T: PartialOrd>(&self, lhs: &T, rhs: &T) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Lte => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Gte => lhs >= rhs,
        }
    }
}

/// A single condition over a record's kind or metadata
///
/// A condition on a metadata value the record does not carry never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum Predicate {
    Kind { any_of: Vec<EntityKind> },
    FundingYear { op: CmpOp, value: i32 },
    AmountRequested { op: CmpOp, value: f64 },
    FundLabel { any_of: Vec<String> },
    CampaignTitle { any_of: Vec<String> },
    Currency { any_of: Vec<String> },
    Funded { value: bool },
}

impl Predicate {
    pub fn matches(&self, kind: EntityKind, metadata: &EmbeddingMetadata) -> bool {
        match self {
            Predicate::Kind { any_of } => any_of.contains(&kind),
            Predicate::FundingYear { op, value } => metadata
                .funding_year
                .is_some_and(|year| op.compare(&year, value)),
            Predicate::AmountRequested { op, value } => metadata
                .amount_requested
                .is_some_and(|amount| op.compare(&amount, value)),
            Predicate::FundLabel { any_of } => one_of(metadata.fund_label.as_deref(), any_of),
            Predicate::CampaignTitle { any_of } => {
                one_of(metadata.campaign_title.as_deref(), any_of)
            }
            Predicate::Currency { any_of } => one_of(metadata.currency.as_deref(), any_of),
            Predicate::Funded { value } => metadata.is_funded == *value,
        }
    }
}

fn one_of(actual: Option<&str>, any_of: &[String]) -> bool {
    actual.is_some_and(|actual| any_of.iter().any(|candidate| candidate == actual))
}

/// Conjunction of predicates; an empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    #[serde(default)]
    pub all: Vec<Predicate>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.all.push(predicate);
        self
    }

    pub fn kind(self, kind: EntityKind) -> Self {
        self.with(Predicate::Kind { any_of: vec![kind] })
    }

    pub fn fund(self, label: impl Into<String>) -> Self {
        self.with(Predicate::FundLabel {
            any_of: vec![label.into()],
        })
    }

    pub fn funding_year(self, op: CmpOp, value: i32) -> Self {
        self.with(Predicate::FundingYear { op, value })
    }

    pub fn amount_requested(self, op: CmpOp, value: f64) -> Self {
        self.with(Predicate::AmountRequested { op, value })
    }

    pub fn funded(self, value: bool) -> Self {
        self.with(Predicate::Funded { value })
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn matches(&self, kind: EntityKind, metadata: &EmbeddingMetadata) -> bool {
        self.all.iter().all(|p| p.matches(kind, metadata))
    }

    pub fn matches_record(&self, record: &EmbeddingRecord) -> bool {
        self.matches(record.entity.kind, &record.metadata)
    }
}
