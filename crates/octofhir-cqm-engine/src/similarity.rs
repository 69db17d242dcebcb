//! Fuzzy similarity scoring and field-level diffing
//!
//! Similarity is defined only between an atomic candidate and an atomic
//! library component - composites are compared structurally by the matching
//! module, never fuzzily, so any composite on either side scores 0. The
//! score is coarse by design: OID equality is the gate (0 without it), then
//! 0.70 base plus 0.15 each for matching timing operator and reference.
//!
//! Diffs are purely descriptive: ordered field-by-field comparisons rendered
//! for human review during import reconciliation. Neither side is mutated.

use crate::identity::parsed_hash;
use crate::snapshot::LibrarySnapshot;
use octofhir_cqm_model::{
    AtomicComponent, ComponentKind, LibraryComponent, ParsedAtomic, ParsedComponent,
    TimingExpression,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Default inclusion threshold for similarity listings
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;

/// Base score once the value-set OID matches
const OID_MATCH_BASE: f64 = 0.70;
/// Bonus for a matching timing operator or reference
const TIMING_FIELD_BONUS: f64 = 0.15;

/// One near-match suggestion for human review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityMatch {
    /// Library component being suggested
    pub component_id: String,
    /// Similarity in [0, 1]
    pub score: f64,
    /// Field-level differences against the candidate
    pub diffs: Vec<FieldDiff>,
}

/// A single field-level difference between a library component and a
/// candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDiff {
    /// Field name, e.g. "timingOperator"
    pub field: String,
    /// Library component's value ("none" when absent)
    pub expected: String,
    /// Candidate's value ("none" when absent)
    pub actual: String,
    /// Human-readable description of the difference
    pub description: String,
}

impl FieldDiff {
    fn new(field: &str, expected: String, actual: String) -> Self {
        let description = format!("{field} differs: expected {expected}, found {actual}");
        Self {
            field: field.to_string(),
            expected,
            actual,
            description,
        }
    }
}

/// Render an optional value as "none" when absent
fn render_opt(value: Option<String>) -> String {
    value.unwrap_or_else(|| "none".to_string())
}

fn timing_operator(timing: Option<&TimingExpression>) -> Option<String> {
    timing.map(|t| t.operator.as_str().to_string())
}

fn timing_quantity(timing: Option<&TimingExpression>) -> Option<String> {
    timing.and_then(|t| t.quantity).map(|q| q.to_string())
}

fn timing_unit(timing: Option<&TimingExpression>) -> Option<String> {
    timing.and_then(|t| t.unit).map(|u| u.as_str().to_string())
}

fn timing_position(timing: Option<&TimingExpression>) -> Option<String> {
    timing.and_then(|t| t.position.clone())
}

fn timing_reference(timing: Option<&TimingExpression>) -> Option<String> {
    timing.and_then(|t| t.reference.clone())
}

/// Similarity between an atomic candidate and a library component
///
/// 0 unless both sides are atomic and the OIDs match exactly; then 0.70,
/// +0.15 for a matching effective timing operator, +0.15 for a matching
/// effective timing reference, capped at 1.0.
pub fn similarity_score(candidate: &ParsedComponent, component: &LibraryComponent) -> f64 {
    let (Some(candidate_atomic), Some(library_atomic)) =
        (candidate.as_atomic(), component.as_atomic())
    else {
        return 0.0;
    };
    let Some(candidate_oid) = candidate_atomic.value_set_oid.as_deref() else {
        return 0.0;
    };
    if candidate_oid != library_atomic.value_set.oid {
        return 0.0;
    }

    let mut score = OID_MATCH_BASE;
    let candidate_operator = candidate_atomic
        .timing
        .as_ref()
        .map_or(octofhir_cqm_model::TimingOperator::During, |t| t.operator);
    let library_operator = library_atomic
        .timing
        .as_ref()
        .map_or(octofhir_cqm_model::TimingOperator::During, |t| t.operator);
    if candidate_operator == library_operator {
        score += TIMING_FIELD_BONUS;
    }

    let candidate_reference = candidate_atomic
        .timing
        .as_ref()
        .map_or(octofhir_cqm_model::DEFAULT_REFERENCE, |t| {
            t.effective_reference()
        });
    let library_reference = library_atomic
        .timing
        .as_ref()
        .map_or(octofhir_cqm_model::DEFAULT_REFERENCE, |t| {
            t.effective_reference()
        });
    if candidate_reference == library_reference {
        score += TIMING_FIELD_BONUS;
    }

    score.min(1.0)
}

/// Similar components above the default 0.5 threshold
pub fn find_similar_default(
    candidate: &ParsedComponent,
    snapshot: &LibrarySnapshot,
) -> Vec<SimilarityMatch> {
    find_similar(candidate, snapshot, DEFAULT_SIMILARITY_THRESHOLD)
}

/// Similar components at or above a threshold, best first
///
/// Exact-hash matches are excluded so a component never shows up both as an
/// exact match and as a near-match suggestion.
pub fn find_similar(
    candidate: &ParsedComponent,
    snapshot: &LibrarySnapshot,
    threshold: f64,
) -> Vec<SimilarityMatch> {
    let candidate_hash = parsed_hash(candidate);
    let mut matches: Vec<SimilarityMatch> = snapshot
        .iter_active()
        .filter(|component| snapshot.hash_of(&component.id) != Some(candidate_hash.as_str()))
        .filter_map(|component| {
            let score = similarity_score(candidate, component);
            (score >= threshold).then(|| SimilarityMatch {
                component_id: component.id.clone(),
                score,
                diffs: diff_components(component, candidate),
            })
        })
        .collect();
    // Stable sort keeps library order among equal scores
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    matches
}

fn diff_atomic(library: &AtomicComponent, candidate: &ParsedAtomic) -> Vec<FieldDiff> {
    let mut diffs = Vec::new();
    let fields: [(&str, Option<String>, Option<String>); 7] = [
        (
            "valueSetOid",
            Some(library.value_set.oid.clone()),
            candidate.value_set_oid.clone(),
        ),
        (
            "timingOperator",
            timing_operator(library.timing.as_ref()),
            timing_operator(candidate.timing.as_ref()),
        ),
        (
            "timingQuantity",
            timing_quantity(library.timing.as_ref()),
            timing_quantity(candidate.timing.as_ref()),
        ),
        (
            "timingUnit",
            timing_unit(library.timing.as_ref()),
            timing_unit(candidate.timing.as_ref()),
        ),
        (
            "timingPosition",
            timing_position(library.timing.as_ref()),
            timing_position(candidate.timing.as_ref()),
        ),
        (
            "timingReference",
            timing_reference(library.timing.as_ref()),
            timing_reference(candidate.timing.as_ref()),
        ),
        (
            "negation",
            Some(library.negation.to_string()),
            Some(candidate.negation.to_string()),
        ),
    ];
    for (field, expected, actual) in fields {
        if expected != actual {
            diffs.push(FieldDiff::new(field, render_opt(expected), render_opt(actual)));
        }
    }
    diffs
}

/// Ordered field-level differences between a library component and a
/// candidate
///
/// Atomics compare value-set OID and each timing field plus negation;
/// composites compare operator and child count; a variant mismatch yields a
/// single `kind` entry.
pub fn diff_components(library: &LibraryComponent, candidate: &ParsedComponent) -> Vec<FieldDiff> {
    match (&library.kind, candidate) {
        (ComponentKind::Atomic(lib), ParsedComponent::Atomic(cand)) => diff_atomic(lib, cand),
        (ComponentKind::Composite(lib), ParsedComponent::Composite(cand)) => {
            let mut diffs = Vec::new();
            if lib.operator != cand.operator {
                diffs.push(FieldDiff::new(
                    "operator",
                    lib.operator.as_str().to_string(),
                    cand.operator.as_str().to_string(),
                ));
            }
            if lib.children.len() != cand.children.len() {
                diffs.push(FieldDiff::new(
                    "childCount",
                    lib.children.len().to_string(),
                    cand.children.len().to_string(),
                ));
            }
            diffs
        }
        (ComponentKind::Atomic(_), ParsedComponent::Composite(_)) => {
            vec![FieldDiff::new(
                "kind",
                "atomic".to_string(),
                "composite".to_string(),
            )]
        }
        (ComponentKind::Composite(_), ParsedComponent::Atomic(_)) => {
            vec![FieldDiff::new(
                "kind",
                "composite".to_string(),
                "atomic".to_string(),
            )]
        }
    }
}
