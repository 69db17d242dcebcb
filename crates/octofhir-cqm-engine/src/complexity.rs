//! Recursive complexity scoring
//!
//! Deterministic rule set shared by library components and criteria trees:
//!
//! | Factor | Rule |
//! |---|---|
//! | atomic base | 1 |
//! | timing | 1 bare, 2 with a quantity or position qualifier |
//! | negation | +2 |
//! | zero codes | floor the atomic at 4 (forces at least MEDIUM) |
//! | children | sum of resolved child scores; dangling children contribute 0 |
//! | AND | child count - 1 when combined with AND (OR/NOT never penalized) |
//! | nesting | 2 x deepest composite-child nesting |
//!
//! All walks carry a visited set: trees are acyclic by construction upstream,
//! but a cyclic graph must surface as [`EngineError::CycleDetected`], never
//! as infinite recursion.

use crate::error::{EngineError, EngineResult};
use crate::snapshot::LibrarySnapshot;
use octofhir_cqm_model::{
    AtomicComponent, ClauseTree, ComplexityFactors, ComponentComplexity, ComponentKind,
    CompositeOperator, DataElement, LibraryComponent, LogicalClause,
};
use std::collections::HashSet;

/// Penalty added for a negated criterion
const NEGATION_PENALTY: u32 = 2;

/// Score an atomic component
///
/// `max(1 + timing clauses + negation penalty, zero-code floor)`; the floor
/// flags components whose value set has no cached codes for review.
pub fn score_atomic(atomic: &AtomicComponent) -> ComponentComplexity {
    let timing_clauses = match &atomic.timing {
        None => 0,
        Some(timing) if timing.has_extra_clause() => 2,
        Some(_) => 1,
    };
    ComponentComplexity::from_factors(ComplexityFactors {
        base: 1,
        timing_clauses,
        negations: if atomic.negation { NEGATION_PENALTY } else { 0 },
        zero_codes: atomic.value_set.codes.is_empty(),
        ..ComplexityFactors::default()
    })
}

/// Score a library component against a snapshot
///
/// Composites sum each resolved child's cached score (computing it on the
/// fly when no cache exists), add the AND penalty, and add twice the deepest
/// composite-child nesting. Dangling children are skipped, not errors.
pub fn score_component(
    component: &LibraryComponent,
    snapshot: &LibrarySnapshot,
) -> EngineResult<ComponentComplexity> {
    let mut visiting = HashSet::new();
    score_component_inner(component, snapshot, &mut visiting)
}

fn score_component_inner(
    component: &LibraryComponent,
    snapshot: &LibrarySnapshot,
    visiting: &mut HashSet<String>,
) -> EngineResult<ComponentComplexity> {
    match &component.kind {
        ComponentKind::Atomic(atomic) => Ok(score_atomic(atomic)),
        ComponentKind::Composite(composite) => {
            if !visiting.insert(component.id.clone()) {
                return Err(EngineError::cycle(&component.id));
            }
            let mut children_sum = 0;
            let mut max_child_depth = 0;
            for reference in &composite.children {
                let Some(child) = snapshot.resolve(reference) else {
                    log::debug!(
                        "composite {}: skipping dangling child {}",
                        component.id,
                        reference.component_id
                    );
                    continue;
                };
                let child_score = match &child.complexity {
                    Some(cached) => cached.score,
                    None => score_component_inner(child, snapshot, visiting)?.score,
                };
                children_sum += child_score;
                if child.is_composite() {
                    let depth = nesting_depth_inner(child, snapshot, visiting)? + 1;
                    max_child_depth = max_child_depth.max(depth);
                }
            }
            visiting.remove(&component.id);

            let child_count = composite.children.len() as u32;
            let and_operators = if composite.operator == CompositeOperator::And && child_count > 1 {
                child_count - 1
            } else {
                0
            };
            Ok(ComponentComplexity::from_factors(ComplexityFactors {
                children_sum,
                and_operators,
                nesting_depth: 2 * max_child_depth,
                ..ComplexityFactors::default()
            }))
        }
    }
}

/// Nesting depth of a component: 0 for atomics, max composite-child depth
/// plus one for composites
pub fn nesting_depth(
    component: &LibraryComponent,
    snapshot: &LibrarySnapshot,
) -> EngineResult<u32> {
    let mut visiting = HashSet::new();
    nesting_depth_inner(component, snapshot, &mut visiting)
}

fn nesting_depth_inner(
    component: &LibraryComponent,
    snapshot: &LibrarySnapshot,
    visiting: &mut HashSet<String>,
) -> EngineResult<u32> {
    let Some(composite) = component.as_composite() else {
        return Ok(0);
    };
    if !visiting.insert(component.id.clone()) {
        return Err(EngineError::cycle(&component.id));
    }
    let mut depth = 0;
    for reference in &composite.children {
        let Some(child) = snapshot.resolve(reference) else {
            continue;
        };
        if child.is_composite() {
            depth = depth.max(nesting_depth_inner(child, snapshot, visiting)? + 1);
        }
    }
    visiting.remove(&component.id);
    Ok(depth)
}

/// Negation wording a criterion description may carry in place of an
/// explicit flag
fn mentions_negation(description: &str) -> bool {
    let lowered = description.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| matches!(word, "no" | "not" | "without" | "never" | "denies" | "absence" | "absent"))
}

/// Score a criteria-tree leaf
///
/// `1 + timing override + timing window + negation (explicit flag or
/// wording)`; non-demographic leaves with no value sets are floored at 4.
pub fn score_data_element(element: &DataElement) -> u32 {
    let mut score = 1;
    if element.timing_override.is_some() {
        score += 1;
    }
    if element.timing_window.is_some() {
        score += 1;
    }
    if element.negation || mentions_negation(&element.description) {
        score += NEGATION_PENALTY;
    }
    if element.value_sets.is_empty() && !element.element_type.is_demographic() {
        score = score.max(octofhir_cqm_model::ZERO_CODES_FLOOR);
    }
    score
}

/// Score a single clause and everything below it
pub fn score_clause(tree: &ClauseTree, clause: &LogicalClause) -> EngineResult<ComponentComplexity> {
    let mut visiting = HashSet::new();
    let total = clause_score_inner(tree, clause, &mut visiting)?;
    // Split the clause's own AND penalty out of the sum so the factor
    // breakdown reproduces the score
    let and_operators = clause_and_penalty(clause);
    Ok(ComponentComplexity::from_factors(ComplexityFactors {
        children_sum: total - and_operators,
        and_operators,
        ..ComplexityFactors::default()
    }))
}

/// Score a whole criteria tree: the sum over its root clauses
pub fn score_clause_tree(tree: &ClauseTree) -> EngineResult<ComponentComplexity> {
    let mut children_sum = 0;
    for root in tree.roots() {
        let mut visiting = HashSet::new();
        children_sum += clause_score_inner(tree, root, &mut visiting)?;
    }
    Ok(ComponentComplexity::from_factors(ComplexityFactors {
        children_sum,
        ..ComplexityFactors::default()
    }))
}

fn clause_and_penalty(clause: &LogicalClause) -> u32 {
    let child_count = clause.child_count() as u32;
    if clause.operator == CompositeOperator::And && child_count > 1 {
        child_count - 1
    } else {
        0
    }
}

fn clause_score_inner(
    tree: &ClauseTree,
    clause: &LogicalClause,
    visiting: &mut HashSet<String>,
) -> EngineResult<u32> {
    if !visiting.insert(clause.id.clone()) {
        return Err(EngineError::cycle(&clause.id));
    }
    let mut score = clause_and_penalty(clause);
    for child in tree.children_of(clause) {
        score += clause_score_inner(tree, child, visiting)?;
    }
    for element in &clause.data_elements {
        score += score_data_element(element);
    }
    visiting.remove(&clause.id);
    Ok(score)
}
