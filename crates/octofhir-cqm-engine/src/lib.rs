//! Component canonicalization, matching, and complexity scoring
//!
//! The engine behind the measure-authoring component library:
//! - Canonical identity hashing so semantically identical components
//!   deduplicate regardless of how or when they were created
//! - Exact, structural, and name-fallback matching of parsed candidates
//!   against a library snapshot, with approval-aware prioritization
//! - Fuzzy similarity scoring and field-level diffing for import review
//! - Deterministic recursive complexity scoring for components and
//!   criteria trees
//! - Usage validation of a measure's element links
//!
//! Every operation is a pure function of its inputs: callers inject a
//! [`LibrarySnapshot`] and batch work reuses one snapshot so all matches
//! observe the same atomic view of the library.

pub mod complexity;
pub mod error;
pub mod identity;
pub mod matching;
pub mod similarity;
pub mod snapshot;
pub mod validation;

pub use complexity::{
    nesting_depth, score_atomic, score_clause, score_clause_tree, score_component,
    score_data_element,
};
pub use error::{EngineError, EngineResult};
pub use identity::{
    atomic_identity_hash, atomic_identity_key, component_hash, content_hash,
    normalize_value_set_name, parsed_hash,
};
pub use matching::{MatchOutcome, find_exact_match, find_match_prioritizing_approved};
pub use similarity::{
    DEFAULT_SIMILARITY_THRESHOLD, FieldDiff, SimilarityMatch, diff_components, find_similar,
    find_similar_default, similarity_score,
};
pub use snapshot::LibrarySnapshot;
pub use validation::{UsageReport, UsageWarning, UsageWarningKind, validate_usage};
