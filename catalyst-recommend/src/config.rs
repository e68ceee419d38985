//! Recommender configuration

use catalyst_core::EntityKind;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Multiplier applied to the AI score before adding the search rank
pub const DEFAULT_BLEND_WEIGHT: f64 = 100.0;

/// Embedding field used when a request names none
pub const DEFAULT_FIELD: &str = "combined";

/// Configuration for scoring and blending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderConfig {
    /// `final_score = ai_score * blend_weight + ranking_total`
    pub blend_weight: f64,
    pub default_field: String,
    /// Kind of entity that feedback ids and candidates refer to
    pub entity_kind: EntityKind,
    /// Swipes per side needed for full evidence in the confidence estimate
    pub confidence_saturation: f64,
    pub default_limit: usize,
    /// Minimum similarity for free-form similarity queries
    pub similarity_threshold: f64,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            blend_weight: DEFAULT_BLEND_WEIGHT,
            default_field: DEFAULT_FIELD.to_string(),
            entity_kind: EntityKind::Proposal,
            confidence_saturation: 3.0,
            default_limit: 20,
            similarity_threshold: 0.7,
        }
    }
}

impl RecommenderConfig {
    /// Load configuration from environment variables
    ///
    /// Every variable is optional; unset ones keep their defaults:
    /// - CATALYST_BLEND_WEIGHT
    /// - CATALYST_EMBEDDING_FIELD
    /// - CATALYST_ENTITY_KIND
    /// - CATALYST_CONFIDENCE_SATURATION
    /// - CATALYST_DEFAULT_LIMIT
    /// - CATALYST_SIMILARITY_THRESHOLD
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(weight) = parse_var::<f64, _>(&lookup, "CATALYST_BLEND_WEIGHT")? {
            if !weight.is_finite() {
                return Err(ConfigError::invalid("CATALYST_BLEND_WEIGHT", weight));
            }
            config.blend_weight = weight;
        }

        if let Some(field) = lookup("CATALYST_EMBEDDING_FIELD") {
            if field.trim().is_empty() {
                return Err(ConfigError::invalid("CATALYST_EMBEDDING_FIELD", field));
            }
            config.default_field = field.trim().to_string();
        }

        if let Some(kind) = lookup("CATALYST_ENTITY_KIND") {
            config.entity_kind = kind
                .parse()
                .map_err(|_| ConfigError::invalid("CATALYST_ENTITY_KIND", &kind))?;
        }

        if let Some(saturation) = parse_var::<f64, _>(&lookup, "CATALYST_CONFIDENCE_SATURATION")? {
            if !(saturation.is_finite() && saturation >= 1.0) {
                return Err(ConfigError::invalid("CATALYST_CONFIDENCE_SATURATION", saturation));
            }
            config.confidence_saturation = saturation;
        }

        if let Some(limit) = parse_var::<usize, _>(&lookup, "CATALYST_DEFAULT_LIMIT")? {
            if limit == 0 {
                return Err(ConfigError::invalid("CATALYST_DEFAULT_LIMIT", limit));
            }
            config.default_limit = limit;
        }

        if let Some(threshold) = parse_var::<f64, _>(&lookup, "CATALYST_SIMILARITY_THRESHOLD")? {
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(ConfigError::invalid("CATALYST_SIMILARITY_THRESHOLD", threshold));
            }
            config.similarity_threshold = threshold;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid(name, raw)),
        None => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

impl ConfigError {
    fn invalid(name: &str, value: impl ToString) -> Self {
        ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = RecommenderConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RecommenderConfig::default());
        assert_eq!(config.blend_weight, 100.0);
        assert_eq!(config.default_field, "combined");
    }

    #[test]
    fn test_overrides() {
        let config = RecommenderConfig::from_lookup(lookup(&[
            ("CATALYST_BLEND_WEIGHT", "25.5"),
            ("CATALYST_EMBEDDING_FIELD", " title "),
            ("CATALYST_ENTITY_KIND", "community"),
            ("CATALYST_CONFIDENCE_SATURATION", "5"),
            ("CATALYST_DEFAULT_LIMIT", "50"),
            ("CATALYST_SIMILARITY_THRESHOLD", "0.4"),
        ]))
        .unwrap();

        assert_eq!(config.blend_weight, 25.5);
        assert_eq!(config.default_field, "title");
        assert_eq!(config.entity_kind, EntityKind::Community);
        assert_eq!(config.confidence_saturation, 5.0);
        assert_eq!(config.default_limit, 50);
        assert_eq!(config.similarity_threshold, 0.4);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for (name, value) in [
            ("CATALYST_BLEND_WEIGHT", "lots"),
            ("CATALYST_ENTITY_KIND", "fund"),
            ("CATALYST_CONFIDENCE_SATURATION", "0.5"),
            ("CATALYST_DEFAULT_LIMIT", "0"),
            ("CATALYST_SIMILARITY_THRESHOLD", "1.5"),
            ("CATALYST_EMBEDDING_FIELD", "  "),
        ] {
            let err = RecommenderConfig::from_lookup(lookup(&[(name, value)])).unwrap_err();
            assert!(err.to_string().contains(name), "{name} should be reported");
        }
    }
}
