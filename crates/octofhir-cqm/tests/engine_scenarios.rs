//! End-to-end engine scenarios
//!
//! Exercises the canonicalization, matching, scoring, and validation paths
//! the way the import/linking collaborator drives them: build one library
//! snapshot, run a batch of candidates and audits against it.

use octofhir_cqm::{
    ApprovalStatus, AtomicComponent, Code, ComponentReference, CompositeComponent,
    CompositeOperator, ElementType, LibraryComponent, LibrarySnapshot, MeasureElement,
    ParsedAtomic, ParsedComponent, ParsedComposite, ResourceType, TimingExpression, ValueSet,
    component_hash, find_exact_match, find_match_prioritizing_approved, find_similar_default,
    parsed_hash, score_component, validate_usage,
};
use pretty_assertions::assert_eq;

const COLONOSCOPY_OID: &str = "2.16.840.1.113883.3.464.1003.108.12.1020";
const OFFICE_VISIT_OID: &str = "2.16.840.1.113883.3.464.1003.101.12.1001";

fn atomic_component(id: &str, name: &str, oid: &str, codes: Vec<Code>) -> LibraryComponent {
    LibraryComponent::new_atomic(
        id,
        name,
        AtomicComponent {
            value_set: ValueSet::new(oid, name).with_codes(codes),
            additional_value_sets: Vec::new(),
            timing: Some(TimingExpression::during_measurement_period()),
            negation: false,
            resource_type: ResourceType::Procedure,
            gender_value: None,
        },
    )
}

fn cpt(code: &str) -> Code {
    Code {
        code: code.to_string(),
        system: "CPT".to_string(),
        display: None,
        version: None,
    }
}

fn parsed_atomic(name: &str, oid: &str) -> ParsedComponent {
    ParsedComponent::Atomic(ParsedAtomic {
        name: name.to_string(),
        value_set_oid: Some(oid.to_string()),
        value_set_name: name.to_string(),
        timing: Some(TimingExpression::during_measurement_period()),
        negation: false,
        resource_type: ResourceType::Procedure,
        gender_value: None,
    })
}

/// An approved component matches a candidate with identical identity fields
/// but a different cached code list
#[test]
fn exact_match_ignores_refreshed_code_lists() {
    let library = atomic_component(
        "comp-1",
        "Colonoscopy",
        COLONOSCOPY_OID,
        vec![cpt("45378"), cpt("45380")],
    )
    .with_status(ApprovalStatus::Approved);
    let snapshot = LibrarySnapshot::from_components([library]);

    // Candidate was parsed before the value set refresh; no codes attached
    let candidate = parsed_atomic("Colonoscopy", COLONOSCOPY_OID);
    let outcome = find_match_prioritizing_approved(&candidate, &snapshot);

    assert_eq!(outcome.component_id.as_deref(), Some("comp-1"));
    assert!(outcome.is_approved);
    assert!(outcome.alternate_approved_id.is_none());
}

/// Library and candidate hashes agree regardless of which side they are
/// computed on
#[test]
fn library_and_parsed_hashes_agree_for_identical_atomics() {
    let library = atomic_component("comp-1", "Colonoscopy", COLONOSCOPY_OID, vec![cpt("45378")]);
    let snapshot = LibrarySnapshot::from_components([library.clone()]);

    let candidate = parsed_atomic("Colonoscopy", COLONOSCOPY_OID);
    assert_eq!(
        component_hash(&library, &snapshot).unwrap(),
        parsed_hash(&candidate)
    );
}

/// A composite assembled from different child records over identical atomics,
/// with its children in reverse order, still matches structurally
#[test]
fn structural_composite_match_over_reversed_children() {
    let snapshot = LibrarySnapshot::from_components([
        atomic_component("child-a", "Colonoscopy", COLONOSCOPY_OID, vec![cpt("45378")]),
        atomic_component(
            "child-b",
            "Office Visit",
            OFFICE_VISIT_OID,
            vec![cpt("99213")],
        ),
        LibraryComponent::new_composite(
            "screening",
            "Screening or Visit",
            CompositeComponent {
                operator: CompositeOperator::Or,
                children: vec![
                    ComponentReference::new("child-a"),
                    ComponentReference::new("child-b"),
                ],
            },
        ),
    ]);

    let candidate = ParsedComponent::Composite(ParsedComposite {
        name: "Visit or Screening".to_string(),
        operator: CompositeOperator::Or,
        children: vec![
            parsed_atomic("Office Visit", OFFICE_VISIT_OID),
            parsed_atomic("Colonoscopy", COLONOSCOPY_OID),
        ],
    });

    let matched = find_exact_match(&candidate, &snapshot);
    assert_eq!(matched.map(|c| c.id.as_str()), Some("screening"));
}

/// Order of children never affects a composite's identity hash
#[test]
fn composite_identity_is_child_order_independent() {
    let children_forward = vec![
        ComponentReference::new("child-a"),
        ComponentReference::new("child-b"),
    ];
    let children_reversed = vec![
        ComponentReference::new("child-b"),
        ComponentReference::new("child-a"),
    ];
    let snapshot = LibrarySnapshot::from_components([
        atomic_component("child-a", "Colonoscopy", COLONOSCOPY_OID, vec![]),
        atomic_component("child-b", "Office Visit", OFFICE_VISIT_OID, vec![]),
        LibraryComponent::new_composite(
            "forward",
            "Forward",
            CompositeComponent {
                operator: CompositeOperator::Or,
                children: children_forward,
            },
        ),
        LibraryComponent::new_composite(
            "reversed",
            "Reversed",
            CompositeComponent {
                operator: CompositeOperator::Or,
                children: children_reversed,
            },
        ),
    ]);

    assert_eq!(snapshot.hash_of("forward"), snapshot.hash_of("reversed"));
}

/// A composite with a dangling child still scores (the child contributes 0)
/// and the audit reports the dangling link as a warning, never an error
#[test]
fn dangling_references_degrade_gracefully() {
    let snapshot = LibrarySnapshot::from_components([
        atomic_component("child-a", "Colonoscopy", COLONOSCOPY_OID, vec![cpt("45378")]),
        LibraryComponent::new_composite(
            "partial",
            "Partially resolvable",
            CompositeComponent {
                operator: CompositeOperator::Or,
                children: vec![
                    ComponentReference::new("child-a"),
                    ComponentReference::new("deleted-long-ago"),
                ],
            },
        ),
    ]);

    let complexity = score_component(snapshot.get("partial").unwrap(), &snapshot).unwrap();
    assert_eq!(complexity.score, 2); // child-a alone: base 1 + bare timing 1

    let elements = vec![
        MeasureElement::new("e1", ElementType::Procedure)
            .with_oid(COLONOSCOPY_OID)
            .with_component("deleted-long-ago"),
    ];
    let report = validate_usage(&elements, &snapshot);
    assert_eq!(report.unlinked, 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(
        report.warnings[0].kind,
        octofhir_cqm::UsageWarningKind::NoLibraryMatch
    );
}

/// Similarity suggestions exclude exact matches and order best-first
#[test]
fn similarity_suggestions_for_import_review() {
    let lookback = TimingExpression::new(octofhir_cqm::TimingOperator::Within)
        .with_quantity(10, octofhir_cqm::TimingUnit::Years)
        .with_reference("Measurement Period");
    let mut ten_year = atomic_component(
        "lookback",
        "Colonoscopy",
        COLONOSCOPY_OID,
        vec![cpt("45378")],
    );
    if let octofhir_cqm::ComponentKind::Atomic(atomic) = &mut ten_year.kind {
        atomic.timing = Some(lookback);
    }
    let snapshot = LibrarySnapshot::from_components([
        atomic_component("exact", "Colonoscopy", COLONOSCOPY_OID, vec![cpt("45378")]),
        ten_year,
    ]);

    let candidate = parsed_atomic("Colonoscopy", COLONOSCOPY_OID);
    let suggestions = find_similar_default(&candidate, &snapshot);

    // The exact twin is excluded; the ten-year lookback is a near match:
    // OID base 0.70 + reference bonus 0.15
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].component_id, "lookback");
    assert!((suggestions[0].score - 0.85).abs() < 1e-9);
    assert!(
        suggestions[0]
            .diffs
            .iter()
            .any(|d| d.field == "timingOperator")
    );
}

/// Full audit: counts partition the audited elements and approved upgrades
/// drive validity
#[test]
fn measure_audit_counts_and_validity() {
    let snapshot = LibrarySnapshot::from_components([
        atomic_component("approved", "Colonoscopy", COLONOSCOPY_OID, vec![cpt("45378")])
            .with_status(ApprovalStatus::Approved),
        atomic_component(
            "draft",
            "Office Visit",
            OFFICE_VISIT_OID,
            vec![cpt("99213")],
        ),
    ]);

    let elements = vec![
        // Correctly linked to the approved component
        MeasureElement::new("e1", ElementType::Procedure)
            .with_oid(COLONOSCOPY_OID)
            .with_component("approved"),
        // Linked to a draft with no approved alternative: tolerated
        MeasureElement::new("e2", ElementType::Encounter)
            .with_oid(OFFICE_VISIT_OID)
            .with_component("draft"),
        // Demographic, excluded from the audit entirely
        MeasureElement::new("e3", ElementType::Demographic),
    ];

    let report = validate_usage(&elements, &snapshot);
    assert_eq!(report.total_elements, 2);
    assert_eq!(report.linked_to_approved, 1);
    assert_eq!(report.linked_to_draft, 1);
    assert_eq!(report.unlinked, 0);
    assert!(report.is_valid);

    // Unlink e1: the approved component now sits unused and validity flips
    let elements = vec![
        MeasureElement::new("e1", ElementType::Procedure).with_oid(COLONOSCOPY_OID),
    ];
    let report = validate_usage(&elements, &snapshot);
    assert!(!report.is_valid);
    assert_eq!(
        report.warnings[0].suggested_component_id.as_deref(),
        Some("approved")
    );
}

/// Wire shapes for the UI collaborator serialize with stable field names
#[test]
fn match_outcome_serializes_camel_case() {
    let snapshot = LibrarySnapshot::from_components([atomic_component(
        "comp-1",
        "Colonoscopy",
        COLONOSCOPY_OID,
        vec![cpt("45378")],
    )
    .with_status(ApprovalStatus::Approved)]);
    let outcome =
        find_match_prioritizing_approved(&parsed_atomic("Colonoscopy", COLONOSCOPY_OID), &snapshot);

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["componentId"], "comp-1");
    assert_eq!(json["isApproved"], true);
}
