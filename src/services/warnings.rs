// Warning/ignore gate

use crate::core::errors::ServerError;
use crate::core::models::Warning;
use std::collections::BTreeSet;
use tracing::warn;

/// Outcome of consulting the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Refuse(Vec<Warning>),
}

impl GateDecision {
    pub fn into_result(self) -> Result<(), ServerError> {
        match self {
            Self::Proceed => Ok(()),
            Self::Refuse(warnings) => Err(ServerError::Warnings(warnings)),
        }
    }
}

/// Decide whether a mutation with `warnings` may go ahead
pub fn gate(warnings: Vec<Warning>, ignore_warnings: bool) -> GateDecision {
    if warnings.is_empty() {
        return GateDecision::Proceed;
    }

    if ignore_warnings {
        for warning in &warnings {
            warn!(code = %warning.code, metadata = ?warning.metadata, "Ignoring warning");
        }
        return GateDecision::Proceed;
    }

    GateDecision::Refuse(warnings)
}

/// Warnings produced by a service-set change and WSDL validation
pub fn service_change_warnings(
    added: &BTreeSet<String>,
    removed: &BTreeSet<String>,
    validation_warnings: Vec<String>,
) -> Vec<Warning> {
    let mut warnings = Vec::new();
    if !added.is_empty() {
        warnings.push(Warning::new(Warning::ADDING_SERVICES, added.iter().cloned().collect()));
    }
    if !removed.is_empty() {
        warnings.push(Warning::new(Warning::REMOVING_SERVICES, removed.iter().cloned().collect()));
    }
    if !validation_warnings.is_empty() {
        warnings.push(Warning::new(Warning::WSDL_VALIDATION_WARNINGS, validation_warnings));
    }
    warnings
}
