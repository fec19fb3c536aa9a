// Unit tests for the warning gate

use security_server::core::models::Warning;
use security_server::services::warnings::{gate, service_change_warnings, GateDecision};
use std::collections::BTreeSet;

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn test_no_changes_no_warnings() {
    let warnings = service_change_warnings(&BTreeSet::new(), &BTreeSet::new(), Vec::new());
    assert!(warnings.is_empty());
    assert_eq!(gate(warnings, false), GateDecision::Proceed);
}

#[test]
fn test_removal_only() {
    let warnings = service_change_warnings(&BTreeSet::new(), &set(&["getRandom.v1"]), Vec::new());
    assert_eq!(warnings, vec![Warning::new(Warning::REMOVING_SERVICES, vec!["getRandom.v1".into()])]);
}

#[test]
fn test_ignore_lets_everything_through() {
    let warnings = service_change_warnings(
        &set(&["b.v1", "a.v1"]),
        &set(&["c.v1"]),
        vec!["schema warning".into()],
    );
    assert_eq!(warnings.len(), 3);
    assert_eq!(warnings[0].metadata, vec!["a.v1", "b.v1"]);

    assert_eq!(gate(warnings.clone(), true), GateDecision::Proceed);
    match gate(warnings.clone(), false) {
        GateDecision::Refuse(refused) => assert_eq!(refused, warnings),
        GateDecision::Proceed => panic!("warnings must refuse without ignore"),
    }
}
