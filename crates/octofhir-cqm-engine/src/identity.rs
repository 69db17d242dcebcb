//! Canonical identity keys and content hashing
//!
//! Two components are interchangeable for reuse exactly when their canonical
//! identity keys are equal, and the content hash is a stable 8-hex-digit
//! fingerprint of that key:
//! - atomic key: `(oid, timing operator, quantity, unit, position, reference,
//!   negation)` - value-set *codes* are deliberately excluded, the OID is the
//!   source of truth and cached code lists may be refreshed independently
//! - composite key: `(operator, lexicographically sorted child hashes)` -
//!   child order is display-only and never affects identity
//!
//! The serialization order of the key fields and the hash recurrence are a
//! cross-implementation contract: identical components must produce identical
//! hashes bit-for-bit everywhere.

use crate::error::{EngineError, EngineResult};
use crate::snapshot::LibrarySnapshot;
use octofhir_cqm_model::{
    ComponentKind, CompositeOperator, LibraryComponent, ParsedComponent, TimingExpression,
};
use std::collections::HashSet;

/// Hash token contributed by a composite child that cannot be resolved.
/// Never equal to a real 8-hex-digit hash, so a composite with a dangling
/// child can never hash-collide with a fully resolved one.
const MISSING_CHILD_TOKEN: &str = "missing";

/// 32-bit rolling content hash over a canonical string
///
/// Seeded at 5381; per character `h = h*33 + h + code` with wrapping
/// arithmetic, rendered as 8 lowercase hex digits. The recurrence and seed
/// are part of the identity contract and must not change.
pub fn content_hash(input: &str) -> String {
    let mut hash: u32 = 5381;
    for ch in input.chars() {
        hash = hash
            .wrapping_mul(33)
            .wrapping_add(hash)
            .wrapping_add(ch as u32);
    }
    format!("{hash:08x}")
}

/// Encode an optional field into the canonical key
///
/// Absent fields become the explicit marker `~`; present fields are prefixed
/// with `=`, so a value can never collide with absence however it
/// stringifies.
fn key_field(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("={v}"),
        None => "~".to_string(),
    }
}

/// Canonical identity key for an atomic criterion
///
/// Field order is fixed: oid, operator, quantity, unit, position, reference,
/// negation.
pub fn atomic_identity_key(
    oid: Option<&str>,
    timing: Option<&TimingExpression>,
    negation: bool,
) -> String {
    let quantity = timing.and_then(|t| t.quantity).map(|q| q.to_string());
    format!(
        "atomic|{}|{}|{}|{}|{}|{}|{}",
        key_field(oid),
        key_field(timing.map(|t| t.operator.as_str())),
        key_field(quantity.as_deref()),
        key_field(timing.and_then(|t| t.unit).map(|u| u.as_str())),
        key_field(timing.and_then(|t| t.position.as_deref())),
        key_field(timing.and_then(|t| t.reference.as_deref())),
        negation
    )
}

/// Hash of an atomic identity key; shared by library hashing, parsed-candidate
/// hashing, and structural composite matching
pub fn atomic_identity_hash(
    oid: Option<&str>,
    timing: Option<&TimingExpression>,
    negation: bool,
) -> String {
    content_hash(&atomic_identity_key(oid, timing, negation))
}

fn composite_identity_key(operator: CompositeOperator, sorted_child_hashes: &[String]) -> String {
    format!(
        "composite|{}|{}",
        operator.as_str(),
        sorted_child_hashes.join(",")
    )
}

/// Content hash of a library component
///
/// Composite children are resolved to their *current* component through the
/// snapshot (archived components still resolve), hashed individually, then
/// sorted before hashing the composite. Dangling children contribute a
/// stable marker token. A reference cycle yields [`EngineError::CycleDetected`]
/// rather than infinite recursion.
pub fn component_hash(
    component: &LibraryComponent,
    snapshot: &LibrarySnapshot,
) -> EngineResult<String> {
    let mut visiting = HashSet::new();
    component_hash_inner(component, snapshot, &mut visiting)
}

fn component_hash_inner(
    component: &LibraryComponent,
    snapshot: &LibrarySnapshot,
    visiting: &mut HashSet<String>,
) -> EngineResult<String> {
    match &component.kind {
        ComponentKind::Atomic(atomic) => Ok(atomic_identity_hash(
            Some(&atomic.value_set.oid),
            atomic.timing.as_ref(),
            atomic.negation,
        )),
        ComponentKind::Composite(composite) => {
            if !visiting.insert(component.id.clone()) {
                return Err(EngineError::cycle(&component.id));
            }
            let mut child_hashes = Vec::with_capacity(composite.children.len());
            for child_ref in &composite.children {
                match snapshot.get(&child_ref.component_id) {
                    Some(child) => {
                        child_hashes.push(component_hash_inner(child, snapshot, visiting)?);
                    }
                    None => {
                        log::debug!(
                            "composite {} references missing child {}",
                            component.id,
                            child_ref.component_id
                        );
                        child_hashes.push(MISSING_CHILD_TOKEN.to_string());
                    }
                }
            }
            visiting.remove(&component.id);
            child_hashes.sort();
            Ok(content_hash(&composite_identity_key(
                composite.operator,
                &child_hashes,
            )))
        }
    }
}

/// Content hash of a parsed candidate
///
/// Parsed children are inline owned values, so no snapshot resolution is
/// needed and no cycle is possible.
pub fn parsed_hash(candidate: &ParsedComponent) -> String {
    match candidate {
        ParsedComponent::Atomic(atomic) => atomic_identity_hash(
            atomic.value_set_oid.as_deref(),
            atomic.timing.as_ref(),
            atomic.negation,
        ),
        ParsedComponent::Composite(composite) => {
            let mut child_hashes: Vec<String> =
                composite.children.iter().map(parsed_hash).collect();
            child_hashes.sort();
            content_hash(&composite_identity_key(composite.operator, &child_hashes))
        }
    }
}

/// Normalize a value-set name for fallback matching: lowercase, collapse
/// whitespace, then strip a trailing "value set" suffix
///
/// Collapsing runs first so a doubled space inside the suffix ("Value  Set")
/// still strips.
pub fn normalize_value_set_name(name: &str) -> String {
    let collapsed = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let stripped = collapsed.strip_suffix("value set").unwrap_or(&collapsed);
    stripped.trim_end().to_string()
}
