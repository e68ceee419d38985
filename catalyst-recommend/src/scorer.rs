//! Candidate scoring, recommendation ranking and search re-ranking

use std::collections::BTreeSet;

use catalyst_core::{EntityKind, RankedResult};
use catalyst_embedding::{cosine_similarity, EmbeddingRecord, VectorStore};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::profile::{CoverageGap, PreferenceProfile, SampleSize};

/// Share of confidence granted regardless of how far apart the two
/// similarities are
pub const SEPARATION_FLOOR: f64 = 0.5;

/// Confidence (0.0 - 1.0) in a candidate's score
///
/// Evidence grows with the number of swipes on either side until it
/// saturates; it is zero when neither side has any sample. Evidence is then
/// scaled by how decisively the score separates preference from avoidance.
pub fn confidence(sample_size: SampleSize, score: f64, saturation: f64) -> f64 {
    let saturation = saturation.max(1.0);
    let evidence = |n: usize| (n as f64 / saturation).min(1.0);

    let combined = 1.0 - (1.0 - evidence(sample_size.liked)) * (1.0 - evidence(sample_size.disliked));
    let separation = (score.abs() / 2.0).min(1.0);

    combined * (SEPARATION_FLOOR + (1.0 - SEPARATION_FLOOR) * separation)
}

/// Similarities of one candidate to a profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateScore {
    pub preference_similarity: f64,
    pub avoidance_similarity: f64,
    /// `preference_similarity - avoidance_similarity`
    pub score: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationEntry {
    pub entity_id: String,
    pub preference_similarity: f64,
    pub avoidance_similarity: f64,
    pub score: f64,
    pub confidence: f64,
}

/// Ranked recommendations plus the coverage report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recommendations {
    pub entries: Vec<RecommendationEntry>,
    /// Candidates dropped because they have no embedding
    pub missing: Vec<String>,
    pub sample_size: SampleSize,
    /// Feedback ids that could not contribute to the profile
    pub feedback_gaps: CoverageGap,
}

/// Scores candidates of one entity kind against a preference profile
pub struct Scorer<'a, S: VectorStore + ?Sized> {
    store: &'a S,
    kind: EntityKind,
    confidence_saturation: f64,
}

impl<'a, S: VectorStore + ?Sized> Scorer<'a, S> {
    pub fn new(store: &'a S, kind: EntityKind) -> Self {
        Self {
            store,
            kind,
            confidence_saturation: 3.0,
        }
    }

    pub fn with_confidence_saturation(mut self, saturation: f64) -> Self {
        self.confidence_saturation = saturation;
        self
    }

    /// Score a single candidate vector
    ///
    /// A side without a centroid contributes a similarity of 0.
    pub fn score(&self, profile: &PreferenceProfile, vector: &[f32]) -> Result<CandidateScore> {
        let preference_similarity = match &profile.preference_vector {
            Some(preference) => cosine_similarity(preference, vector)?,
            None => 0.0,
        };
        let avoidance_similarity = match &profile.avoidance_vector {
            Some(avoidance) => cosine_similarity(avoidance, vector)?,
            None => 0.0,
        };
        let score = preference_similarity - avoidance_similarity;

        Ok(CandidateScore {
            preference_similarity,
            avoidance_similarity,
            score,
            confidence: confidence(profile.sample_size, score, self.confidence_saturation),
        })
    }

    /// Rank a pool of candidate ids
    ///
    /// Excluded ids never appear in the output. Candidates without an
    /// embedding in the profile's field are listed in `missing` instead of
    /// being ranked.
    pub fn recommend<I>(
        &self,
        profile: &PreferenceProfile,
        candidate_pool: I,
        exclude_ids: &BTreeSet<String>,
        limit: usize,
    ) -> Result<Recommendations>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let pool: BTreeSet<String> = candidate_pool
            .into_iter()
            .map(Into::into)
            .filter(|id| !exclude_ids.contains(id))
            .collect();

        let mut records = Vec::with_capacity(pool.len());
        let mut missing = Vec::new();
        for id in pool {
            match self.fetch(&id, &profile.field) {
                Some(record) => records.push(record),
                None => missing.push(id),
            }
        }

        let mut recommendations = self.recommend_records(profile, records, exclude_ids, limit)?;
        recommendations.missing = missing;
        Ok(recommendations)
    }

    /// Rank candidates whose embeddings are already resolved
    pub fn recommend_records(
        &self,
        profile: &PreferenceProfile,
        records: Vec<EmbeddingRecord>,
        exclude_ids: &BTreeSet<String>,
        limit: usize,
    ) -> Result<Recommendations> {
        let mut seen = BTreeSet::new();
        let mut entries = Vec::with_capacity(records.len());

        for record in records {
            let id = record.entity.id;
            if exclude_ids.contains(&id) || !seen.insert(id.clone()) {
                continue;
            }
            let scored = self.score(profile, &record.vector)?;
            entries.push(RecommendationEntry {
                entity_id: id,
                preference_similarity: scored.preference_similarity,
                avoidance_similarity: scored.avoidance_similarity,
                score: scored.score,
                confidence: scored.confidence,
            });
        }

        let scored_count = entries.len();
        entries.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        entries.truncate(limit);

        debug!(
            "Scored {} candidates, returning {} (limit {})",
            scored_count,
            entries.len(),
            limit
        );

        Ok(Recommendations {
            entries,
            missing: Vec::new(),
            sample_size: profile.sample_size,
            feedback_gaps: profile.missing.clone(),
        })
    }

    /// Blend the profile score into an existing search ranking
    ///
    /// `final_score = ai_score * weight + ranking_total`. Results without an
    /// embedding keep `ai_score = 0`. Equal final scores keep their input
    /// order.
    pub fn enhance_search_results(
        &self,
        profile: &PreferenceProfile,
        mut results: Vec<RankedResult>,
        weight: f64,
    ) -> Result<Vec<RankedResult>> {
        let mut resolved = 0usize;
        for result in &mut results {
            result.ai_score = match self.fetch(&result.id, &profile.field) {
                Some(record) => {
                    resolved += 1;
                    self.score(profile, &record.vector)?.score
                }
                None => 0.0,
            };
            result.final_score = result.ai_score * weight + result.ranking_total;
        }

        results.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));

        info!(
            "Re-ranked {} search results ({} with embeddings, weight {})",
            results.len(),
            resolved,
            weight
        );
        Ok(results)
    }

    fn fetch(&self, id: &str, field: &str) -> Option<EmbeddingRecord> {
        match self.store.get(self.kind, id, field) {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to fetch embedding for {}:{}: {}", self.kind, id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalyst_core::EntityRef;
    use catalyst_embedding::InMemoryEmbeddingStore;

    fn store(records: &[(&str, Vec<f32>)]) -> InMemoryEmbeddingStore {
        InMemoryEmbeddingStore::from_records(records.iter().map(|(id, vector)| {
            EmbeddingRecord::new(EntityRef::proposal(*id), "combined", vector.clone())
        }))
        .unwrap()
    }

    fn profile(
        preference: Option<Vec<f32>>,
        avoidance: Option<Vec<f32>>,
        liked: usize,
        disliked: usize,
    ) -> PreferenceProfile {
        PreferenceProfile {
            preference_vector: preference,
            avoidance_vector: avoidance,
            sample_size: SampleSize { liked, disliked },
            ..PreferenceProfile::empty("combined")
        }
    }

    #[test]
    fn test_confidence_zero_without_samples() {
        for score in [-2.0, -0.3, 0.0, 0.7, 2.0] {
            assert_eq!(confidence(SampleSize::default(), score, 3.0), 0.0);
        }
    }

    #[test]
    fn test_confidence_monotone_in_sample_size() {
        for score in [0.0, 0.4, 1.2, 2.0] {
            let mut previous = 0.0;
            for liked in 0..6 {
                for disliked in 0..6 {
                    let c = confidence(SampleSize { liked, disliked }, score, 3.0);
                    assert!((0.0..=1.0).contains(&c));
                    let fewer_liked = confidence(
                        SampleSize {
                            liked: liked.saturating_sub(1),
                            disliked,
                        },
                        score,
                        3.0,
                    );
                    assert!(c >= fewer_liked);
                }
                let c = confidence(SampleSize { liked, disliked: 0 }, score, 3.0);
                assert!(c >= previous);
                previous = c;
            }
        }
    }

    #[test]
    fn test_confidence_lower_when_similarities_cancel() {
        let sample = SampleSize { liked: 3, disliked: 3 };
        assert!(confidence(sample, 0.05, 3.0) < confidence(sample, 1.5, 3.0));
        assert_eq!(confidence(sample, 2.0, 3.0), 1.0);
    }

    #[test]
    fn test_score_without_avoidance_equals_preference() {
        let store = store(&[]);
        let scorer = Scorer::new(&store, EntityKind::Proposal);
        let profile = profile(Some(vec![1.0, 0.0]), None, 2, 0);

        let scored = scorer.score(&profile, &[0.6, 0.8]).unwrap();
        assert_eq!(scored.avoidance_similarity, 0.0);
        assert_eq!(scored.score, scored.preference_similarity);
        assert!((scored.score - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_recommend_excludes_and_reports_missing() {
        let store = store(&[
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.9, 0.1]),
            ("c", vec![0.0, 1.0]),
        ]);
        let scorer = Scorer::new(&store, EntityKind::Proposal);
        let profile = profile(Some(vec![1.0, 0.0]), None, 1, 0);
        let exclude: BTreeSet<String> = ["a".to_string()].into();

        let recs = scorer
            .recommend(&profile, ["a", "b", "c", "ghost", "b"], &exclude, 10)
            .unwrap();

        let ids: Vec<_> = recs.entries.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(recs.missing, vec!["ghost"]);
        assert_eq!(recs.sample_size.liked, 1);
    }

    #[test]
    fn test_recommend_limit_and_tie_break() {
        let store = store(&[
            ("d", vec![1.0, 0.0]),
            ("b", vec![2.0, 0.0]),
            ("c", vec![0.0, 1.0]),
            ("a", vec![3.0, 0.0]),
        ]);
        let scorer = Scorer::new(&store, EntityKind::Proposal);
        let profile = profile(Some(vec![1.0, 0.0]), None, 1, 0);

        let recs = scorer
            .recommend(&profile, ["d", "c", "b", "a"], &BTreeSet::new(), 3)
            .unwrap();

        let ids: Vec<_> = recs.entries.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "d"]);
    }

    #[test]
    fn test_recommend_without_signal_scores_zero() {
        let store = store(&[("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);
        let scorer = Scorer::new(&store, EntityKind::Proposal);

        let recs = scorer
            .recommend(&PreferenceProfile::empty("combined"), ["b", "a"], &BTreeSet::new(), 5)
            .unwrap();

        assert_eq!(recs.entries.len(), 2);
        assert!(recs.entries.iter().all(|e| e.score == 0.0 && e.confidence == 0.0));
        assert_eq!(recs.entries[0].entity_id, "a");
    }

    #[test]
    fn test_recommend_dimension_mismatch_is_fatal() {
        let store = store(&[("a", vec![1.0, 0.0])]);
        let scorer = Scorer::new(&store, EntityKind::Proposal);
        let profile = profile(Some(vec![1.0, 0.0, 0.0]), None, 1, 0);

        assert!(scorer.recommend(&profile, ["a"], &BTreeSet::new(), 5).is_err());
    }

    #[test]
    fn test_enhance_blends_and_keeps_order_for_ties() {
        let store = store(&[("x", vec![1.0, 0.0]), ("y", vec![0.0, 1.0])]);
        let scorer = Scorer::new(&store, EntityKind::Proposal);
        let profile = profile(Some(vec![1.0, 0.0]), None, 1, 0);

        let results = vec![
            RankedResult::new("n1", 80.0),
            RankedResult::new("y", 90.0),
            RankedResult::new("n2", 80.0),
            RankedResult::new("x", 10.0),
        ];

        let ranked = scorer.enhance_search_results(&profile, results, 100.0).unwrap();
        let ids: Vec<_> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "n1", "n2"]);

        let x = &ranked[0];
        assert!((x.ai_score - 1.0).abs() < 1e-6);
        assert!((x.final_score - 110.0).abs() < 1e-4);
        assert_eq!(x.ranking_total, 10.0);
        assert_eq!(ranked[2].ai_score, 0.0);
        assert_eq!(ranked[2].final_score, 80.0);
    }
}
