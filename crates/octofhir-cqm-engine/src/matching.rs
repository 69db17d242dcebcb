//! Candidate-to-library matching
//!
//! Matching strategies, in order of preference:
//! 1. Hash-exact: the candidate's content hash hits the snapshot's index
//! 2. Structural composite: a library composite with the same operator whose
//!    resolved atomic children carry the same identity hashes as the
//!    candidate's own children, order ignored - catches composites assembled
//!    from different child records over identical underlying atomics
//! 3. Name fallback: normalized value-set name equality plus equal effective
//!    timing and negation, for atomic candidates when nothing else hit
//!
//! The approval-prioritized variant layers library lifecycle on top: an
//! approved match wins outright, a non-approved match is reported together
//! with an approved alternative covering the same value set when one exists.

use crate::identity::{atomic_identity_hash, normalize_value_set_name, parsed_hash};
use crate::snapshot::LibrarySnapshot;
use octofhir_cqm_model::{
    CompositeComponent, LibraryComponent, ParsedAtomic, ParsedComponent, ParsedComposite,
    TimingOperator, DEFAULT_REFERENCE,
};
use serde::{Deserialize, Serialize};

/// Result of an approval-prioritized match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    /// Matched library component, when any strategy hit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    /// Whether the matched component is approved
    #[serde(default)]
    pub is_approved: bool,
    /// Approved component covering the candidate's value set, suggested as
    /// an upgrade when only a non-approved match was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_approved_id: Option<String>,
}

impl MatchOutcome {
    /// No strategy matched
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_match(&self) -> bool {
        self.component_id.is_some()
    }
}

/// Effective timing operator for fallback comparisons: `during` when absent
fn effective_operator(timing: Option<&octofhir_cqm_model::TimingExpression>) -> TimingOperator {
    timing.map_or(TimingOperator::During, |t| t.operator)
}

/// Effective timing reference for fallback comparisons: the measurement
/// period when absent
fn effective_reference(timing: Option<&octofhir_cqm_model::TimingExpression>) -> &str {
    timing.map_or(DEFAULT_REFERENCE, |t| t.effective_reference())
}

/// Find an exact (hash or structural) match, falling back to name matching
/// for atomic candidates
pub fn find_exact_match<'a>(
    candidate: &ParsedComponent,
    snapshot: &'a LibrarySnapshot,
) -> Option<&'a LibraryComponent> {
    let hash = parsed_hash(candidate);
    if let Some(component) = snapshot.first_active_for_hash(&hash) {
        return Some(component);
    }
    match candidate {
        ParsedComponent::Composite(composite) => structural_composite_match(composite, snapshot),
        ParsedComponent::Atomic(atomic) => name_fallback_match(atomic, snapshot),
    }
}

/// Identity hashes of a parsed composite's children, sorted; `None` when any
/// child is itself composite (structural matching is one level deep)
fn candidate_child_hashes(composite: &ParsedComposite) -> Option<Vec<String>> {
    let mut hashes = composite
        .children
        .iter()
        .map(|child| {
            child.as_atomic().map(|atomic| {
                atomic_identity_hash(
                    atomic.value_set_oid.as_deref(),
                    atomic.timing.as_ref(),
                    atomic.negation,
                )
            })
        })
        .collect::<Option<Vec<String>>>()?;
    hashes.sort();
    Some(hashes)
}

/// Identity hashes of a library composite's resolved children, sorted;
/// `None` when a child dangles or resolves to a non-atomic
fn library_child_hashes(
    composite: &CompositeComponent,
    snapshot: &LibrarySnapshot,
) -> Option<Vec<String>> {
    let mut hashes = composite
        .children
        .iter()
        .map(|reference| {
            let child = snapshot.resolve(reference)?;
            let atomic = child.as_atomic()?;
            Some(atomic_identity_hash(
                Some(&atomic.value_set.oid),
                atomic.timing.as_ref(),
                atomic.negation,
            ))
        })
        .collect::<Option<Vec<String>>>()?;
    hashes.sort();
    Some(hashes)
}

/// Structural match for composite candidates: same operator, same child
/// count, identical sorted atomic identity hashes
fn structural_composite_match<'a>(
    candidate: &ParsedComposite,
    snapshot: &'a LibrarySnapshot,
) -> Option<&'a LibraryComponent> {
    let candidate_hashes = candidate_child_hashes(candidate)?;
    snapshot.iter_active().find(|component| {
        let Some(composite) = component.as_composite() else {
            return false;
        };
        if composite.operator != candidate.operator
            || composite.children.len() != candidate.children.len()
        {
            return false;
        }
        library_child_hashes(composite, snapshot)
            .is_some_and(|hashes| hashes == candidate_hashes)
    })
}

/// Name fallback for atomic candidates: normalized value-set name equality
/// plus equal effective timing operator/reference and negation flag
fn name_fallback_match<'a>(
    candidate: &ParsedAtomic,
    snapshot: &'a LibrarySnapshot,
) -> Option<&'a LibraryComponent> {
    let candidate_name = normalize_value_set_name(&candidate.value_set_name);
    if candidate_name.is_empty() {
        return None;
    }
    let candidate_operator = effective_operator(candidate.timing.as_ref());
    let candidate_reference = effective_reference(candidate.timing.as_ref());

    snapshot.iter_active().find(|component| {
        let Some(atomic) = component.as_atomic() else {
            return false;
        };
        normalize_value_set_name(&atomic.value_set.name) == candidate_name
            && effective_operator(atomic.timing.as_ref()) == candidate_operator
            && effective_reference(atomic.timing.as_ref()) == candidate_reference
            && atomic.negation == candidate.negation
    })
}

/// First active approved atomic covering the given value-set OID, any timing
fn alternate_approved<'a>(
    oid: &str,
    exclude_id: &str,
    snapshot: &'a LibrarySnapshot,
) -> Option<&'a LibraryComponent> {
    snapshot.iter_active().find(|component| {
        component.is_approved()
            && component.id != exclude_id
            && component.primary_oid() == Some(oid)
    })
}

/// Match preferring approved components
///
/// Scans the library once: the first approved hash/structural match
/// short-circuits; otherwise the first non-approved match is reported along
/// with an approved alternative sharing the candidate's value-set OID when
/// one exists. Name fallback runs last, its approval status reported as
/// found. Archived components never match.
pub fn find_match_prioritizing_approved(
    candidate: &ParsedComponent,
    snapshot: &LibrarySnapshot,
) -> MatchOutcome {
    let candidate_hash = parsed_hash(candidate);
    let candidate_structural = candidate
        .as_composite()
        .and_then(|c| candidate_child_hashes(c).map(|hashes| (c.operator, hashes)));

    let mut non_approved: Option<&LibraryComponent> = None;
    for component in snapshot.iter_active() {
        let hash_hit = snapshot.hash_of(&component.id) == Some(candidate_hash.as_str());
        let structural_hit = !hash_hit
            && match (&candidate_structural, component.as_composite()) {
                (Some((operator, candidate_hashes)), Some(composite)) => {
                    composite.operator == *operator
                        && composite.children.len() == candidate_hashes.len()
                        && library_child_hashes(composite, snapshot)
                            .is_some_and(|hashes| &hashes == candidate_hashes)
                }
                _ => false,
            };
        if !(hash_hit || structural_hit) {
            continue;
        }
        if component.is_approved() {
            return MatchOutcome {
                component_id: Some(component.id.clone()),
                is_approved: true,
                alternate_approved_id: None,
            };
        }
        non_approved.get_or_insert(component);
    }

    if let Some(component) = non_approved {
        let alternate = candidate
            .as_atomic()
            .and_then(|atomic| atomic.value_set_oid.as_deref())
            .and_then(|oid| alternate_approved(oid, &component.id, snapshot));
        return MatchOutcome {
            component_id: Some(component.id.clone()),
            is_approved: false,
            alternate_approved_id: alternate.map(|c| c.id.clone()),
        };
    }

    if let ParsedComponent::Atomic(atomic) = candidate {
        if let Some(component) = name_fallback_match(atomic, snapshot) {
            return MatchOutcome {
                component_id: Some(component.id.clone()),
                is_approved: component.is_approved(),
                alternate_approved_id: None,
            };
        }
    }

    MatchOutcome::none()
}
