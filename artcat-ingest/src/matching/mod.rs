//! Asset filename matching
//!
//! filename → [`extractor`] pattern → [`matcher`] candidates. Candidates are
//! proposals only; nothing is committed until a reviewer approves one.

pub mod extractor;
pub mod matcher;

pub use extractor::{extract, FilenameExtractor, SkuPattern, DEFAULT_SUFFIX_SEPARATOR};
pub use matcher::{
    classify, match_pattern, BatchMatch, MatchCandidate, MatchError, MatchTier, Matcher,
};
