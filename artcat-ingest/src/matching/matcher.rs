//! Hierarchical filename → variant matcher
//!
//! Each catalog entry is classified against a pattern; the first rule that
//! applies wins for that entry:
//!
//! | Tier           | Confidence | Applies when                                               |
//! |----------------|-----------:|------------------------------------------------------------|
//! | `Exact`        | 100        | pattern defaulted with trailing `99`s equals the entry      |
//! | `Hierarchical` | 90         | 1 or 2 explicit variants form a prefix of the entry's       |
//! | `ProductLevel` | 70         | pattern is artwork + type only, entry shares both           |
//!
//! Placeholder segments never broaden a match: a pattern with any explicit
//! `99` variant only ever matches exactly. No match is an empty result, not
//! an error. Ambiguity (several candidates) is left to human review.

use super::extractor::{FilenameExtractor, SkuPattern};
use crate::ident::sku::{CompositeSku, VARIANT_SLOTS};
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Matching errors
#[derive(Debug, Error)]
pub enum MatchError {
    /// Pass stopped on request; partial candidates are discarded
    #[error("Matching cancelled after {files_processed} files")]
    Cancelled { files_processed: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How specific a proposed match is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Hierarchical,
    ProductLevel,
}

impl MatchTier {
    /// Confidence score for the tier
    pub fn confidence(self) -> u8 {
        match self {
            MatchTier::Exact => 100,
            MatchTier::Hierarchical => 90,
            MatchTier::ProductLevel => 70,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::Hierarchical => "hierarchical",
            MatchTier::ProductLevel => "product_level",
        }
    }
}

/// Proposed file → variant assignment awaiting review
///
/// Immutable once created; approval produces a separate assignment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub id: Uuid,
    pub source_filename: String,
    pub pattern: SkuPattern,
    pub target: CompositeSku,
    pub tier: MatchTier,
    pub confidence: u8,
    pub justification: String,
    pub proposed_at: DateTime<Utc>,
}

/// Tier of `entry` for `pattern`, if any
pub fn classify(pattern: &SkuPattern, entry: &CompositeSku) -> Option<MatchTier> {
    if entry.artwork() != pattern.artwork() || entry.type_code() != pattern.type_code() {
        return None;
    }

    if pattern.to_sku() == entry {
        return Some(MatchTier::Exact);
    }

    if pattern.has_placeholder() {
        return None;
    }

    let given = pattern.variants();
    match given.len() {
        0 => Some(MatchTier::ProductLevel),
        n if n < VARIANT_SLOTS && entry.variants()[..n] == *given => Some(MatchTier::Hierarchical),
        _ => None,
    }
}

fn justification(pattern: &SkuPattern, entry: &CompositeSku, tier: MatchTier) -> String {
    match tier {
        MatchTier::Exact => format!("Pattern {} equals {}", pattern, entry),
        MatchTier::Hierarchical => format!(
            "Pattern {} is a prefix of {} ({} of {} variant dimensions given)",
            pattern,
            entry,
            pattern.variants().len(),
            VARIANT_SLOTS
        ),
        MatchTier::ProductLevel => format!(
            "Pattern {} names artwork and type only; applies to {}",
            pattern, entry
        ),
    }
}

/// Match one pattern against a catalog
///
/// Candidates follow catalog iteration order.
pub fn match_pattern<'a, I>(
    source_filename: &str,
    pattern: &SkuPattern,
    catalog: I,
) -> Vec<MatchCandidate>
where
    I: IntoIterator<Item = &'a CompositeSku>,
{
    let proposed_at = Utc::now();

    let candidates: Vec<MatchCandidate> = catalog
        .into_iter()
        .filter_map(|entry| {
            let tier = classify(pattern, entry)?;
            Some(MatchCandidate {
                id: Uuid::new_v4(),
                source_filename: source_filename.to_string(),
                pattern: pattern.clone(),
                target: entry.clone(),
                tier,
                confidence: tier.confidence(),
                justification: justification(pattern, entry, tier),
                proposed_at,
            })
        })
        .collect();

    debug!(
        filename = source_filename,
        pattern = %pattern,
        candidates = candidates.len(),
        "Matched pattern"
    );

    candidates
}

/// Result of matching many filenames
#[derive(Debug, Clone, Default)]
pub struct BatchMatch {
    pub candidates: Vec<MatchCandidate>,
    /// Filenames without an identifier-shaped prefix
    pub unrecognized: Vec<String>,
    /// Filenames with a pattern but no qualifying catalog entry
    pub unmatched: Vec<String>,
}

/// Matches filenames against an in-memory catalog
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    extractor: FilenameExtractor,
}

impl Matcher {
    pub fn new(extractor: FilenameExtractor) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &FilenameExtractor {
        &self.extractor
    }

    /// Extract and match a single filename
    pub fn match_file(
        &self,
        filename: &str,
        catalog: &BTreeSet<CompositeSku>,
    ) -> Option<Vec<MatchCandidate>> {
        let pattern = self.extractor.extract(filename)?;
        Some(match_pattern(filename, &pattern, catalog))
    }

    /// Match many filenames, checking `cancel` between files
    pub fn match_files<'f, I>(
        &self,
        filenames: I,
        catalog: &BTreeSet<CompositeSku>,
        cancel: &CancellationToken,
    ) -> Result<BatchMatch, MatchError>
    where
        I: IntoIterator<Item = &'f str>,
    {
        let mut batch = BatchMatch::default();

        for (files_processed, filename) in filenames.into_iter().enumerate() {
            if cancel.is_cancelled() {
                info!(files_processed, "Matching cancelled");
                return Err(MatchError::Cancelled { files_processed });
            }

            match self.match_file(filename, catalog) {
                None => batch.unrecognized.push(filename.to_string()),
                Some(candidates) if candidates.is_empty() => {
                    batch.unmatched.push(filename.to_string())
                }
                Some(candidates) => batch.candidates.extend(candidates),
            }
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::extractor::extract;

    fn catalog(skus: &[&str]) -> BTreeSet<CompositeSku> {
        skus.iter().map(|s| CompositeSku::parse(s).unwrap()).collect()
    }

    fn run(pattern: &str, skus: &[&str]) -> Vec<(String, MatchTier, u8)> {
        let pattern = SkuPattern::from_segments(pattern).unwrap();
        match_pattern("file.jpg", &pattern, &catalog(skus))
            .into_iter()
            .map(|c| (c.target.to_compact_string(), c.tier, c.confidence))
            .collect()
    }

    const TEE: [&str; 3] = ["10A001-UTS-00-01", "10A001-UTS-00-02", "10A001-UTS-01-00"];

    #[test]
    fn test_partial_pattern_expands_hierarchically() {
        assert_eq!(
            run("10A001-UTS-00", &TEE),
            vec![
                ("10A001-UTS-00-01".to_string(), MatchTier::Hierarchical, 90),
                ("10A001-UTS-00-02".to_string(), MatchTier::Hierarchical, 90),
            ]
        );
    }

    #[test]
    fn test_exact_pattern_yields_single_exact_candidate() {
        assert_eq!(
            run("10A001-UTS-00-01", &TEE),
            vec![("10A001-UTS-00-01".to_string(), MatchTier::Exact, 100)]
        );
    }

    #[test]
    fn test_product_level_pattern_covers_all_variants() {
        let results = run("10A001-UTS", &TEE);
        assert_eq!(results.len(), 3);
        assert!(results
            .iter()
            .all(|(_, tier, confidence)| *tier == MatchTier::ProductLevel && *confidence == 70));
    }

    #[test]
    fn test_product_level_pattern_exact_on_placeholder_entry() {
        let results = run("10A001-DIG", &["10A001-DIG", "10A001-DIG-00"]);
        assert_eq!(
            results,
            vec![
                ("10A001-DIG-00".to_string(), MatchTier::ProductLevel, 70),
                ("10A001-DIG".to_string(), MatchTier::Exact, 100),
            ]
        );
    }

    #[test]
    fn test_placeholder_pattern_never_broadens() {
        let skus = ["10A001-DIG-99-99-99", "10A001-DIG-00-01", "10A001-DIG-99-01"];
        assert_eq!(
            run("10A001-DIG-99-99-99", &skus),
            vec![("10A001-DIG".to_string(), MatchTier::Exact, 100)]
        );
        // explicit 99 in a partial pattern narrows to exact-or-nothing
        assert_eq!(
            run("10A001-DIG-99", &skus),
            vec![("10A001-DIG".to_string(), MatchTier::Exact, 100)]
        );
        assert!(run("10A001-DIG-99-99-99", &["10A001-DIG-00-01"]).is_empty());
    }

    #[test]
    fn test_other_artwork_or_type_never_matches() {
        assert!(run("10A002-UTS", &TEE).is_empty());
        assert!(run("10A001-PST-00", &TEE).is_empty());
    }

    #[test]
    fn test_full_pattern_without_exact_entry_is_empty() {
        assert!(run("10A001-UTS-00-01-05", &TEE).is_empty());
    }

    #[test]
    fn test_two_variant_prefix() {
        let results = run("10A001-UTS-00-01", &["10A001-UTS-00-01-03", "10A001-UTS-00-02-03"]);
        assert_eq!(
            results,
            vec![("10A001-UTS-00-01-03".to_string(), MatchTier::Hierarchical, 90)]
        );
    }

    #[test]
    fn test_candidate_carries_source_and_justification() {
        let pattern = extract("10A001-UTS-00_front.jpg").unwrap();
        let candidates = match_pattern("10A001-UTS-00_front.jpg", &pattern, &catalog(&TEE));
        assert_eq!(candidates[0].source_filename, "10A001-UTS-00_front.jpg");
        assert!(candidates[0].justification.contains("10A001-UTS-00-01-99"));
        assert_ne!(candidates[0].id, candidates[1].id);
    }

    #[test]
    fn test_batch_sorts_files_into_outcomes() {
        let matcher = Matcher::default();
        let batch = matcher
            .match_files(
                ["10A001-UTS-00_a.jpg", "notes.txt", "10A009-UTS_b.jpg"],
                &catalog(&TEE),
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(batch.candidates.len(), 2);
        assert_eq!(batch.unrecognized, vec!["notes.txt".to_string()]);
        assert_eq!(batch.unmatched, vec!["10A009-UTS_b.jpg".to_string()]);
    }

    #[test]
    fn test_batch_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = Matcher::default()
            .match_files(["10A001-UTS_a.jpg"], &catalog(&TEE), &cancel)
            .unwrap_err();
        assert!(matches!(err, MatchError::Cancelled { files_processed: 0 }));
    }

    #[test]
    fn test_confidence_ordering_follows_tier_specificity() {
        assert!(MatchTier::Exact.confidence() > MatchTier::Hierarchical.confidence());
        assert!(MatchTier::Hierarchical.confidence() > MatchTier::ProductLevel.confidence());
    }
}
