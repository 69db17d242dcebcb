//! Measure usage validation
//!
//! Audits a measure's flattened data elements against a library snapshot:
//! every element should ideally be linked to an approved, non-duplicated
//! component. Elements without a meaningful value-set OID (demographics,
//! pure age constraints) are excluded from the audit entirely.
//!
//! A measure stays valid when its only blemishes are unavoidable -
//! unapproved links with no approved alternative do not invalidate it; an
//! approved component sitting unused while an element is unlinked or linked
//! to a draft does.

use crate::snapshot::LibrarySnapshot;
use octofhir_cqm_model::{LibraryComponent, MeasureElement};
use serde::{Deserialize, Serialize};

/// Kind of audit finding for one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageWarningKind {
    /// An approved component covers this element's value set but the element
    /// is unlinked or linked to a draft - suggests an upgrade
    ApprovedAvailable,
    /// Linked to a non-approved component with no better alternative
    UnapprovedComponent,
    /// Link points at a component id absent from the snapshot
    NoLibraryMatch,
}

/// One audit finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageWarning {
    /// Element the finding applies to
    pub element_id: String,
    pub kind: UsageWarningKind,
    pub message: String,
    /// Approved component suggested as the upgrade, for
    /// [`UsageWarningKind::ApprovedAvailable`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_component_id: Option<String>,
}

/// Result of auditing a measure's elements against the library
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    /// No approved component is being left on the table
    pub is_valid: bool,
    /// Audited elements (after exclusions)
    pub total_elements: usize,
    pub linked_to_approved: usize,
    pub linked_to_draft: usize,
    pub unlinked: usize,
    pub warnings: Vec<UsageWarning>,
}

/// First active approved component covering a value-set OID
fn approved_for_oid<'a>(oid: &str, snapshot: &'a LibrarySnapshot) -> Option<&'a LibraryComponent> {
    snapshot
        .iter_active()
        .find(|component| component.is_approved() && component.primary_oid() == Some(oid))
}

/// Audit a measure's flattened elements against a library snapshot
///
/// Counting invariant: `linked_to_approved + linked_to_draft + unlinked ==
/// total_elements`. A dangling link counts as unlinked - it links to nothing
/// in the current snapshot - and additionally raises
/// [`UsageWarningKind::NoLibraryMatch`].
pub fn validate_usage(elements: &[MeasureElement], snapshot: &LibrarySnapshot) -> UsageReport {
    let mut report = UsageReport::default();

    for element in elements.iter().filter(|e| e.has_meaningful_oid()) {
        report.total_elements += 1;
        let Some(oid) = element.value_set_oid.as_deref() else {
            continue; // unreachable behind has_meaningful_oid
        };
        let approved = approved_for_oid(oid, snapshot);

        match element.component_id.as_deref() {
            Some(component_id) => match snapshot.get(component_id) {
                Some(component) if component.is_approved() => {
                    report.linked_to_approved += 1;
                }
                Some(component) => {
                    report.linked_to_draft += 1;
                    match approved.filter(|alt| alt.id != component.id) {
                        Some(alternate) => report.warnings.push(UsageWarning {
                            element_id: element.element_id.clone(),
                            kind: UsageWarningKind::ApprovedAvailable,
                            message: format!(
                                "Element is linked to {} component {} but approved component {} covers value set {}",
                                component.status, component.id, alternate.id, oid
                            ),
                            suggested_component_id: Some(alternate.id.clone()),
                        }),
                        None => report.warnings.push(UsageWarning {
                            element_id: element.element_id.clone(),
                            kind: UsageWarningKind::UnapprovedComponent,
                            message: format!(
                                "Element is linked to {} component {} and no approved alternative covers value set {}",
                                component.status, component.id, oid
                            ),
                            suggested_component_id: None,
                        }),
                    }
                }
                None => {
                    report.unlinked += 1;
                    report.warnings.push(UsageWarning {
                        element_id: element.element_id.clone(),
                        kind: UsageWarningKind::NoLibraryMatch,
                        message: format!(
                            "Element links to component {component_id} which is absent from the library"
                        ),
                        suggested_component_id: None,
                    });
                }
            },
            None => {
                report.unlinked += 1;
                if let Some(alternate) = approved {
                    report.warnings.push(UsageWarning {
                        element_id: element.element_id.clone(),
                        kind: UsageWarningKind::ApprovedAvailable,
                        message: format!(
                            "Element is unlinked but approved component {} covers value set {}",
                            alternate.id, oid
                        ),
                        suggested_component_id: Some(alternate.id.clone()),
                    });
                }
            }
        }
    }

    report.is_valid = !report
        .warnings
        .iter()
        .any(|w| w.kind == UsageWarningKind::ApprovedAvailable);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_cqm_model::{
        ApprovalStatus, AtomicComponent, ElementType, ResourceType, TimingExpression, ValueSet,
    };
    use pretty_assertions::assert_eq;

    fn component(id: &str, oid: &str, status: ApprovalStatus) -> LibraryComponent {
        LibraryComponent::new_atomic(
            id,
            format!("Component {id}"),
            AtomicComponent {
                value_set: ValueSet::new(oid, format!("Value set {oid}")),
                additional_value_sets: Vec::new(),
                timing: Some(TimingExpression::during_measurement_period()),
                negation: false,
                resource_type: ResourceType::Procedure,
                gender_value: None,
            },
        )
        .with_status(status)
    }

    fn element(id: &str, oid: &str) -> MeasureElement {
        MeasureElement::new(id, ElementType::Procedure).with_oid(oid)
    }

    #[test]
    fn test_counts_partition_elements() {
        let snapshot = LibrarySnapshot::from_components([
            component("approved", "1.1.1", ApprovalStatus::Approved),
            component("draft", "2.2.2", ApprovalStatus::Draft),
        ]);
        let elements = vec![
            element("e1", "1.1.1").with_component("approved"),
            element("e2", "2.2.2").with_component("draft"),
            element("e3", "3.3.3"),
            element("e4", "4.4.4").with_component("ghost"),
        ];
        let report = validate_usage(&elements, &snapshot);
        assert_eq!(report.total_elements, 4);
        assert_eq!(report.linked_to_approved, 1);
        assert_eq!(report.linked_to_draft, 1);
        assert_eq!(report.unlinked, 2);
        assert_eq!(
            report.linked_to_approved + report.linked_to_draft + report.unlinked,
            report.total_elements
        );
    }

    #[test]
    fn test_demographics_and_missing_oids_excluded() {
        let snapshot = LibrarySnapshot::new();
        let elements = vec![
            MeasureElement::new("age", ElementType::Demographic).with_oid("1.2.3"),
            MeasureElement::new("gender", ElementType::Demographic),
            MeasureElement::new("no-oid", ElementType::Condition),
        ];
        let report = validate_usage(&elements, &snapshot);
        assert_eq!(report.total_elements, 0);
        assert!(report.warnings.is_empty());
        assert!(report.is_valid);
    }

    #[test]
    fn test_approved_available_for_unlinked_element() {
        let snapshot = LibrarySnapshot::from_components([component(
            "approved",
            "1.1.1",
            ApprovalStatus::Approved,
        )]);
        let report = validate_usage(&[element("e1", "1.1.1")], &snapshot);
        assert!(!report.is_valid);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, UsageWarningKind::ApprovedAvailable);
        assert_eq!(
            report.warnings[0].suggested_component_id.as_deref(),
            Some("approved")
        );
    }

    #[test]
    fn test_draft_link_with_approved_alternative() {
        let snapshot = LibrarySnapshot::from_components([
            component("draft", "1.1.1", ApprovalStatus::Draft),
            component("approved", "1.1.1", ApprovalStatus::Approved),
        ]);
        let report = validate_usage(&[element("e1", "1.1.1").with_component("draft")], &snapshot);
        assert!(!report.is_valid);
        assert_eq!(report.warnings[0].kind, UsageWarningKind::ApprovedAvailable);
        assert_eq!(
            report.warnings[0].suggested_component_id.as_deref(),
            Some("approved")
        );
    }

    #[test]
    fn test_unapproved_link_without_alternative_stays_valid() {
        let snapshot =
            LibrarySnapshot::from_components([component("draft", "1.1.1", ApprovalStatus::Draft)]);
        let report = validate_usage(&[element("e1", "1.1.1").with_component("draft")], &snapshot);
        // Unavoidable - warned about, but does not invalidate the measure
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0].kind,
            UsageWarningKind::UnapprovedComponent
        );
    }

    #[test]
    fn test_dangling_link_warns_without_failing() {
        let snapshot = LibrarySnapshot::new();
        let report = validate_usage(&[element("e1", "1.1.1").with_component("ghost")], &snapshot);
        assert!(report.is_valid);
        assert_eq!(report.unlinked, 1);
        assert_eq!(report.warnings[0].kind, UsageWarningKind::NoLibraryMatch);
    }

    #[test]
    fn test_archived_link_counts_as_draft() {
        let snapshot = LibrarySnapshot::from_components([component(
            "old",
            "1.1.1",
            ApprovalStatus::Archived,
        )]);
        let report = validate_usage(&[element("e1", "1.1.1").with_component("old")], &snapshot);
        assert_eq!(report.linked_to_draft, 1);
        assert_eq!(
            report.warnings[0].kind,
            UsageWarningKind::UnapprovedComponent
        );
    }
}
