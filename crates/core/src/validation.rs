//! Sequence validation -- pure logic over the stage registry.
//!
//! Two gates exist. [`can_append`] answers "may this stage be added at all?"
//! and only checks that prerequisites are present somewhere. [`validate_sequence`]
//! checks the whole sequence, including relative order, and is what gates
//! submission. Dependency checks use the first occurrence of a kind, so
//! duplicate kinds are not distinguished from each other.
//!
//! Kinds missing from the registry are treated permissively: they can always
//! be appended and carry no dependency rule of their own.

use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::stages::{self, kinds, Dependency, InputKind};
use crate::types::NodeId;
use crate::workflow::WorkflowNode;

pub const UPLOAD_REQUIRED: &str = "Upload component is required";
pub const PREVIEW_REQUIRED: &str =
    "Preview component is required (will be auto-added after image upload)";

// ---------------------------------------------------------------------------
// Append gate
// ---------------------------------------------------------------------------

/// Outcome of [`can_append`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AppendDecision {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn denied(reason: String) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Check whether a stage of `kind` may be added to `existing`.
pub fn can_append(kind: &str, existing: &[WorkflowNode]) -> AppendDecision {
    let existing_kinds: Vec<&str> = existing.iter().map(|n| n.kind.as_str()).collect();
    can_append_kind(kind, &existing_kinds)
}

/// [`can_append`] over a list of kind tags.
pub fn can_append_kind(kind: &str, existing: &[&str]) -> AppendDecision {
    let Some(stage) = stages::lookup(kind) else {
        return AppendDecision::allowed();
    };

    let mut missing: Vec<&str> = Vec::new();
    for dep in stage.requires {
        let satisfied = dep.kinds().iter().any(|k| existing.contains(k));
        if !satisfied {
            missing.extend(dep.kinds().iter().map(|k| stages::display_name(k)));
        }
    }

    if missing.is_empty() {
        AppendDecision::allowed()
    } else {
        AppendDecision::denied(format!("Requires: {}", missing.join(", ")))
    }
}

// ---------------------------------------------------------------------------
// Sequence validation
// ---------------------------------------------------------------------------

/// Validate a full sequence. Returns every violation found, in sequence order;
/// an empty list means the sequence is runnable.
pub fn validate_sequence(nodes: &[WorkflowNode]) -> Vec<String> {
    let sequence: Vec<&str> = nodes.iter().map(|n| n.kind.as_str()).collect();
    validate_kinds(&sequence)
}

/// [`validate_sequence`] over a list of kind tags.
pub fn validate_kinds(sequence: &[&str]) -> Vec<String> {
    let mut errors = Vec::new();

    if !sequence.contains(&kinds::UPLOAD) {
        errors.push(UPLOAD_REQUIRED.to_string());
    }
    if !sequence.contains(&kinds::PREVIEW) {
        errors.push(PREVIEW_REQUIRED.to_string());
    }

    let first_index = |kind: &str| sequence.iter().position(|k| *k == kind);

    for (index, kind) in sequence.iter().enumerate() {
        let Some(stage) = stages::lookup(kind) else {
            continue;
        };

        for dep in stage.requires {
            match dep {
                Dependency::Stage(required) => match first_index(*required) {
                    None => errors.push(format!(
                        "{} requires {}",
                        stage.name,
                        stages::display_name(required)
                    )),
                    Some(at) if at > index => errors.push(must_come_after(stage.name, required)),
                    Some(_) => {}
                },
                Dependency::AnyOf(alternatives) => {
                    let present: Vec<(&str, usize)> = alternatives
                        .iter()
                        .filter_map(|alt| first_index(*alt).map(|at| (*alt, at)))
                        .collect();

                    if present.is_empty() {
                        let names: Vec<&str> =
                            alternatives.iter().map(|k| stages::display_name(k)).collect();
                        errors.push(format!(
                            "{} requires one of: {}",
                            stage.name,
                            names.join(", ")
                        ));
                    } else {
                        errors.extend(
                            present
                                .into_iter()
                                .filter(|(_, at)| *at > index)
                                .map(|(alt, _)| must_come_after(stage.name, alt)),
                        );
                    }
                }
            }
        }
    }

    errors
}

/// Like [`validate_sequence`], but as a `Result` for callers about to submit.
pub fn ensure_runnable(nodes: &[WorkflowNode]) -> Result<(), CoreError> {
    let errors = validate_sequence(nodes);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(errors.join("; ")))
    }
}

fn must_come_after(name: &str, required: &str) -> String {
    format!("{name} must come after {}", stages::display_name(required))
}

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// A form value that does not satisfy its field schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub node_id: NodeId,
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Check a node's form values against its stage's field schema.
///
/// Read-only fields are filled by the server and never reported as missing.
/// Unknown kinds and fields outside the schema pass.
pub fn check_field_values(node: &WorkflowNode) -> Vec<FieldViolation> {
    let Some(stage) = stages::lookup(&node.kind) else {
        return Vec::new();
    };

    let mut violations = Vec::new();
    for field in stage.fields {
        let value = node.fields.get(field.name);
        let violation = |message: String| FieldViolation {
            node_id: node.id,
            field: field.name.to_string(),
            message,
            value: value.cloned(),
        };

        if is_blank(value) {
            if field.required && !field.readonly {
                violations.push(violation(format!("{} is required", field.label)));
            }
            continue;
        }

        if field.input != InputKind::Range {
            continue;
        }
        let Some(range) = field.range else {
            continue;
        };

        match value.and_then(Value::as_f64) {
            None => violations.push(violation(format!("{} must be a number", field.label))),
            Some(n) if n < range.min || n > range.max => violations.push(violation(format!(
                "{} must be between {} and {}",
                field.label, range.min, range.max
            ))),
            Some(_) => {}
        }
    }

    violations
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
