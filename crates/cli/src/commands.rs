//! Command implementations.
//!
//! Commands return values (or rendered text) rather than printing, so the
//! binary decides how output and exit codes are produced.

use std::path::Path;

use imgflow_comfyui::api::{ComfyUIApi, SubmitResponse, UploadResponse};
use imgflow_comfyui::document::to_external_document;
use imgflow_core::stages;
use imgflow_core::validation::{check_field_values, ensure_runnable, validate_sequence, FieldViolation};
use imgflow_core::workflow::Sequence;

use crate::error::CliError;

/// Read and parse a sequence file.
pub fn load_sequence(path: &Path) -> Result<Sequence, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Sequence::from_json(&raw)?)
}

/// One line per pickable stage: icon, kind, name and flags.
pub fn render_stages() -> String {
    let mut out = String::new();
    for stage in stages::list_available() {
        let mut flags = Vec::new();
        if stage.required {
            flags.push("required");
        }
        if stage.optional {
            flags.push("optional");
        }
        if stage.is_final {
            flags.push("final");
        }

        out.push_str(&format!("{} {:<8} {}", stage.icon, stage.kind, stage.name));
        if !flags.is_empty() {
            out.push_str(&format!(" ({})", flags.join(", ")));
        }
        out.push('\n');
    }
    out
}

/// Result of `imgflow check`.
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Sequence-level errors; these block submission.
    pub errors: Vec<String>,
    /// Form values outside their schema; reported but not blocking.
    pub violations: Vec<FieldViolation>,
}

impl CheckReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.is_valid() {
            out.push_str("Sequence is valid\n");
        }
        for error in &self.errors {
            out.push_str(&format!("error: {error}\n"));
        }
        for violation in &self.violations {
            out.push_str(&format!(
                "warning: node {} field {}: {}\n",
                violation.node_id, violation.field, violation.message
            ));
        }
        out
    }
}

pub fn check(sequence: &Sequence) -> CheckReport {
    CheckReport {
        errors: validate_sequence(&sequence.nodes),
        violations: sequence.nodes.iter().flat_map(check_field_values).collect(),
    }
}

/// The ComfyUI document for a sequence, as pretty JSON.
pub fn convert(sequence: &Sequence) -> Result<String, CliError> {
    let document = to_external_document(&sequence.nodes, &sequence.connections());
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Validate, then submit. Invalid sequences are never sent.
pub async fn submit(api: &ComfyUIApi, sequence: &Sequence) -> Result<SubmitResponse, CliError> {
    ensure_runnable(&sequence.nodes)?;

    for violation in sequence.nodes.iter().flat_map(check_field_values) {
        tracing::warn!(
            node_id = violation.node_id,
            field = %violation.field,
            "{}",
            violation.message,
        );
    }

    Ok(api.submit_workflow(&sequence.nodes, &sequence.connections()).await?)
}

/// What `imgflow submit` prints: the prompt id, or the queue number when
/// the server did not return one.
pub fn submit_label(response: &SubmitResponse) -> String {
    match (&response.prompt_id, response.number) {
        (Some(id), _) => id.clone(),
        (None, Some(number)) => format!("queued (#{number})"),
        (None, None) => "queued".to_string(),
    }
}

/// Upload an image file under its own file name.
pub async fn upload(api: &ComfyUIApi, path: &Path) -> Result<UploadResponse, CliError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    Ok(api.upload_image(&file_name, bytes).await?)
}

/// The stored name reported by ComfyUI, falling back to the name sent.
pub fn upload_label(response: &UploadResponse, sent: &Path) -> String {
    response
        .name
        .clone()
        .or_else(|| sent.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

pub async fn history(api: &ComfyUIApi) -> Result<String, CliError> {
    let history = api.fetch_history().await?;
    Ok(serde_json::to_string_pretty(&history)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use imgflow_core::error::CoreError;
    use imgflow_core::workflow::WorkflowNode;

    fn sequence(kinds: &[&str]) -> Sequence {
        Sequence {
            nodes: kinds
                .iter()
                .enumerate()
                .map(|(i, k)| WorkflowNode::new(i as u64 + 1, *k))
                .collect(),
            connections: None,
        }
    }

    #[test]
    fn stages_listing_has_one_line_per_stage() {
        let listing = render_stages();
        let lines: Vec<_> = listing.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("upload") && lines[0].contains("(required)"));
        assert!(lines[3].contains("Preview") && lines[3].contains("(final)"));
    }

    #[test]
    fn check_reports_order_errors() {
        let report = check(&sequence(&["filter", "upload", "preview"]));
        assert!(!report.is_valid());
        assert!(report
            .render()
            .contains("error: Image Filter must come after Upload Image"));
    }

    #[test]
    fn check_reports_field_violations_without_failing() {
        let mut seq = sequence(&["upload", "repair", "preview"]);
        seq.nodes[0] = seq.nodes[0].clone().with_field("image", "cat.png");
        seq.nodes[1] = seq.nodes[1].clone().with_field("detail", 150);

        let report = check(&seq);
        assert!(report.is_valid());
        assert_eq!(report.violations.len(), 1);
        assert!(report.render().starts_with("Sequence is valid\n"));
        assert!(report.render().contains("warning: node 2 field detail"));
    }

    #[test]
    fn convert_emits_adjacency_connections() {
        let json: serde_json::Value =
            serde_json::from_str(&convert(&sequence(&["upload", "filter"])).unwrap()).unwrap();
        assert_eq!(json["connections"], serde_json::json!({ "1": { "2": [0] } }));
        assert_eq!(json["nodes"]["2"]["type"], "ImageFilter");
    }

    #[tokio::test]
    async fn submit_refuses_invalid_sequence_before_any_request() {
        // Nothing listens here; an attempted request would fail with Api, not Core.
        let api = ComfyUIApi::new("http://127.0.0.1:9".to_string());
        let err = submit(&api, &sequence(&["upload"])).await.unwrap_err();
        assert_matches!(err, CliError::Core(CoreError::Validation(_)));
    }

    #[test]
    fn check_render_ends_every_line() {
        let report = check(&sequence(&["filter", "upload"]));
        let rendered = report.render();
        assert!(rendered.ends_with('\n'));
        assert_eq!(
            rendered.lines().count(),
            report.errors.len() + report.violations.len()
        );
    }

    #[test]
    fn submit_label_prefers_prompt_id() {
        let response = SubmitResponse {
            prompt_id: Some("abc".to_string()),
            number: Some(4),
            ..Default::default()
        };
        assert_eq!(submit_label(&response), "abc");
    }

    #[test]
    fn submit_label_without_prompt_id_uses_queue_number() {
        let response = SubmitResponse {
            number: Some(1),
            ..Default::default()
        };
        assert_eq!(submit_label(&response), "queued (#1)");
        assert_eq!(submit_label(&SubmitResponse::default()), "queued");
    }

    #[test]
    fn upload_label_falls_back_to_sent_name() {
        let sent = Path::new("/tmp/photos/cat.png");
        assert_eq!(upload_label(&UploadResponse::default(), sent), "cat.png");

        let stored = UploadResponse {
            name: Some("cat (1).png".to_string()),
            ..Default::default()
        };
        assert_eq!(upload_label(&stored, sent), "cat (1).png");
    }

    #[test]
    fn missing_sequence_file_is_read_error() {
        let err = load_sequence(Path::new("/definitely/not/here.json")).unwrap_err();
        assert_matches!(err, CliError::Read { .. });
    }
}
