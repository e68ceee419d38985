//! Recommendation service
//!
//! Entry point used by the HTTP layer. Resolves request defaults from
//! [`RecommenderConfig`], builds the session's preference profile and hands
//! it to the [`Scorer`].

use std::collections::BTreeSet;
use std::sync::Arc;

use catalyst_core::{EntityKind, FeedbackSet, RankedResult};
use catalyst_embedding::{MetadataFilter, SimilarityMatch, VectorStore};
use tracing::{debug, info, instrument, warn};

use crate::config::RecommenderConfig;
use crate::error::Result;
use crate::profile::{PreferenceModeler, PreferenceProfile};
use crate::scorer::{Recommendations, Scorer};

/// Parameters for a recommendation request
#[derive(Debug, Clone, Default)]
pub struct RecommendationRequest {
    pub feedback: FeedbackSet,
    /// Embedding field; the configured default when `None`
    pub field: Option<String>,
    /// Ids never to recommend, on top of the already swiped ones
    pub exclude_ids: BTreeSet<String>,
    /// Explicit candidate pool; every embedded entity of the configured kind
    /// when `None`
    pub candidate_ids: Option<Vec<String>>,
    /// Pre-filter applied to the candidate pool
    pub filter: Option<MetadataFilter>,
    /// Maximum entries; the configured default when `None`
    pub limit: Option<usize>,
}

impl RecommendationRequest {
    pub fn new(feedback: FeedbackSet) -> Self {
        Self {
            feedback,
            ..Default::default()
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn exclude<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.exclude_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn candidates<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.candidate_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Stateless recommendation service over a vector store
pub struct RecommendationService<S: VectorStore> {
    store: Arc<S>,
    config: RecommenderConfig,
}

impl<S: VectorStore> RecommendationService<S> {
    pub fn new(store: Arc<S>, config: RecommenderConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn resolve_field<'a>(&'a self, field: Option<&'a str>) -> &'a str {
        field.unwrap_or(&self.config.default_field)
    }

    fn scorer(&self) -> Scorer<'_, S> {
        Scorer::new(self.store.as_ref(), self.config.entity_kind)
            .with_confidence_saturation(self.config.confidence_saturation)
    }

    /// Reduce a feedback set to its preference profile
    pub fn build_profile(&self, feedback: &FeedbackSet, field: Option<&str>) -> Result<PreferenceProfile> {
        let field = self.resolve_field(field);
        PreferenceModeler::new(self.store.as_ref(), self.config.entity_kind).build_profile(feedback, field)
    }

    /// Recommend unseen entities for a swipe session
    ///
    /// Already swiped ids are always excluded.
    #[instrument(skip(self, request))]
    pub fn recommend(&self, request: &RecommendationRequest) -> Result<Recommendations> {
        let field = self.resolve_field(request.field.as_deref());
        let limit = request.limit.unwrap_or(self.config.default_limit);
        let profile = self.build_profile(&request.feedback, Some(field))?;

        let mut exclude = request.exclude_ids.clone();
        exclude.extend(request.feedback.swiped_ids().cloned());

        let scorer = self.scorer();
        let recommendations = match (&request.candidate_ids, &request.filter) {
            (Some(ids), None) => scorer.recommend(&profile, ids.iter().cloned(), &exclude, limit)?,
            (Some(ids), Some(filter)) => {
                let pool: BTreeSet<&String> = ids.iter().filter(|id| !exclude.contains(*id)).collect();
                let mut records = Vec::with_capacity(pool.len());
                let mut missing = Vec::new();
                for id in pool {
                    match self.store.get(self.config.entity_kind, id, field) {
                        Ok(Some(record)) if filter.matches_record(&record) => records.push(record),
                        Ok(Some(_)) => debug!("Candidate {} filtered out", id),
                        Ok(None) => missing.push(id.clone()),
                        Err(e) => {
                            warn!(
                                "Failed to fetch embedding for {}:{}: {}",
                                self.config.entity_kind, id, e
                            );
                            missing.push(id.clone());
                        }
                    }
                }
                let mut recommendations = scorer.recommend_records(&profile, records, &exclude, limit)?;
                recommendations.missing = missing;
                recommendations
            }
            (None, filter) => {
                let pool_filter = filter
                    .clone()
                    .unwrap_or_default()
                    .kind(self.config.entity_kind);
                let records = self.store.scan(field, Some(&pool_filter))?;
                scorer.recommend_records(&profile, records, &exclude, limit)?
            }
        };

        info!(
            "Recommended {} {}(s) from field '{}' (liked={}, disliked={}, missing candidates={})",
            recommendations.entries.len(),
            self.config.entity_kind,
            field,
            profile.sample_size.liked,
            profile.sample_size.disliked,
            recommendations.missing.len()
        );
        Ok(recommendations)
    }

    /// Re-rank search results with the session's preference profile
    #[instrument(skip(self, results, feedback), fields(results = results.len()))]
    pub fn enhance_search_results(
        &self,
        results: Vec<RankedResult>,
        feedback: &FeedbackSet,
        field: Option<&str>,
    ) -> Result<Vec<RankedResult>> {
        let profile = self.build_profile(feedback, field)?;
        self.scorer()
            .enhance_search_results(&profile, results, self.config.blend_weight)
    }

    /// Nearest neighbours of a precomputed query vector
    pub fn similar_to(
        &self,
        query: &[f32],
        field: Option<&str>,
        limit: Option<usize>,
        threshold: Option<f64>,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SimilarityMatch>> {
        let field = self.resolve_field(field);
        let limit = limit.unwrap_or(self.config.default_limit);
        let threshold = threshold.unwrap_or(self.config.similarity_threshold);

        Ok(self.store.similar_to(query, field, limit, threshold, filter)?)
    }

    /// Entities most similar to an existing entity, excluding itself
    ///
    /// An entity without an embedding has no neighbours.
    pub fn similar_to_entity(
        &self,
        kind: EntityKind,
        entity_id: &str,
        field: Option<&str>,
        limit: Option<usize>,
        threshold: Option<f64>,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SimilarityMatch>> {
        let field = self.resolve_field(field);
        let Some(source) = self.store.get(kind, entity_id, field)? else {
            debug!("No '{}' embedding for {}:{}", field, kind, entity_id);
            return Ok(Vec::new());
        };

        let limit = limit.unwrap_or(self.config.default_limit);
        let mut matches = self.similar_to(
            &source.vector,
            Some(field),
            Some(limit.saturating_add(1)),
            threshold,
            filter,
        )?;
        matches.retain(|m| m.record.entity != source.entity);
        matches.truncate(limit);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalyst_core::EntityRef;
    use catalyst_embedding::{EmbeddingMetadata, EmbeddingRecord, InMemoryEmbeddingStore};

    fn proposal(id: &str, vector: Vec<f32>, fund: &str) -> EmbeddingRecord {
        EmbeddingRecord::new(EntityRef::proposal(id), "combined", vector).with_metadata(
            EmbeddingMetadata {
                fund_label: Some(fund.to_string()),
                ..Default::default()
            },
        )
    }

    fn service() -> RecommendationService<InMemoryEmbeddingStore> {
        let store = InMemoryEmbeddingStore::from_records(vec![
            proposal("liked", vec![1.0, 0.0], "Fund 11"),
            proposal("disliked", vec![0.0, 1.0], "Fund 11"),
            proposal("close", vec![0.95, 0.05], "Fund 12"),
            proposal("far", vec![0.1, 0.9], "Fund 12"),
            proposal("mid", vec![0.6, 0.4], "Fund 11"),
            EmbeddingRecord::new(
                EntityRef::new(EntityKind::Community, "community"),
                "combined",
                vec![1.0, 0.0],
            ),
        ])
        .unwrap();
        RecommendationService::new(Arc::new(store), RecommenderConfig::default())
    }

    #[test]
    fn test_recommend_whole_field_excludes_swiped_and_other_kinds() {
        let service = service();
        let feedback = FeedbackSet::new(["liked"], ["disliked"]).unwrap();

        let recs = service.recommend(&RecommendationRequest::new(feedback)).unwrap();

        let ids: Vec<_> = recs.entries.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["close", "mid", "far"]);
        assert!(recs.missing.is_empty());
    }

    #[test]
    fn test_recommend_with_filter_and_explicit_exclusions() {
        let service = service();
        let feedback = FeedbackSet::new(["liked"], Vec::<String>::new()).unwrap();
        let request = RecommendationRequest::new(feedback)
            .filter(MetadataFilter::new().fund("Fund 12"))
            .exclude(["close"]);

        let recs = service.recommend(&request).unwrap();

        let ids: Vec<_> = recs.entries.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["far"]);
    }

    #[test]
    fn test_recommend_explicit_candidates() {
        let service = service();
        let feedback = FeedbackSet::new(["liked"], ["disliked"]).unwrap();
        let request = RecommendationRequest::new(feedback)
            .candidates(["far", "liked", "ghost", "mid"])
            .limit(1);

        let recs = service.recommend(&request).unwrap();

        assert_eq!(recs.entries.len(), 1);
        assert_eq!(recs.entries[0].entity_id, "mid");
        assert_eq!(recs.missing, vec!["ghost"]);
    }

    #[test]
    fn test_recommend_explicit_candidates_with_filter() {
        let service = service();
        let feedback = FeedbackSet::new(["liked"], Vec::<String>::new()).unwrap();
        let request = RecommendationRequest::new(feedback)
            .candidates(["close", "mid", "ghost"])
            .filter(MetadataFilter::new().fund("Fund 11"));

        let recs = service.recommend(&request).unwrap();

        let ids: Vec<_> = recs.entries.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["mid"]);
        assert_eq!(recs.missing, vec!["ghost"]);
    }

    /// Store whose lookups fail for one id
    struct FailingLookup {
        inner: InMemoryEmbeddingStore,
        broken_id: &'static str,
    }

    impl VectorStore for FailingLookup {
        fn get(
            &self,
            kind: EntityKind,
            entity_id: &str,
            field: &str,
        ) -> catalyst_embedding::Result<Option<EmbeddingRecord>> {
            if entity_id == self.broken_id {
                return Err(catalyst_embedding::EmbeddingError::Database("disk I/O error".into()));
            }
            self.inner.get(kind, entity_id, field)
        }

        fn scan(
            &self,
            field: &str,
            filter: Option<&MetadataFilter>,
        ) -> catalyst_embedding::Result<Vec<EmbeddingRecord>> {
            self.inner.scan(field, filter)
        }

        fn dimension(&self, field: &str) -> catalyst_embedding::Result<Option<usize>> {
            self.inner.dimension(field)
        }
    }

    #[test]
    fn test_failed_candidate_lookup_is_reported_missing() {
        let inner = InMemoryEmbeddingStore::from_records(vec![
            proposal("liked", vec![1.0, 0.0], "Fund 11"),
            proposal("mid", vec![0.6, 0.4], "Fund 11"),
            proposal("broken", vec![1.0, 0.0], "Fund 11"),
        ])
        .unwrap();
        let store = FailingLookup {
            inner,
            broken_id: "broken",
        };
        let service = RecommendationService::new(Arc::new(store), RecommenderConfig::default());
        let feedback = FeedbackSet::new(["liked"], Vec::<String>::new()).unwrap();
        let request = RecommendationRequest::new(feedback)
            .candidates(["mid", "broken"])
            .filter(MetadataFilter::new().fund("Fund 11"));

        let recs = service.recommend(&request).unwrap();

        let ids: Vec<_> = recs.entries.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["mid"]);
        assert_eq!(recs.missing, vec!["broken"]);
    }

    #[test]
    fn test_enhance_uses_configured_weight() {
        let store = Arc::clone(service().store());
        let config = RecommenderConfig {
            blend_weight: 10.0,
            ..Default::default()
        };
        let service = RecommendationService::new(store, config);
        let feedback = FeedbackSet::new(["liked"], Vec::<String>::new()).unwrap();

        let results = vec![RankedResult::new("far", 15.0), RankedResult::new("close", 8.0)];
        let ranked = service.enhance_search_results(results, &feedback, None).unwrap();

        // close: ~0.9986 * 10 + 8 > far: ~0.1104 * 10 + 15
        assert_eq!(ranked[0].id, "close");
        assert!(ranked[0].final_score > ranked[1].final_score);
    }

    #[test]
    fn test_similar_to_entity_skips_itself() {
        let service = service();

        let matches = service
            .similar_to_entity(EntityKind::Proposal, "liked", None, Some(2), Some(0.0), None)
            .unwrap();

        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.record.entity.id != "liked"));
        // The community shares the exact same vector
        assert_eq!(matches[0].record.entity.kind, EntityKind::Community);

        let none = service
            .similar_to_entity(EntityKind::Proposal, "ghost", None, None, None, None)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_similar_to_defaults_threshold() {
        let service = service();
        let matches = service.similar_to(&[0.0, 1.0], None, None, None, None).unwrap();

        // Default threshold 0.7 keeps only the "disliked" and "far" proposals
        let ids: Vec<_> = matches.iter().map(|m| m.record.entity.id.as_str()).collect();
        assert_eq!(ids, vec!["disliked", "far"]);
    }
}
