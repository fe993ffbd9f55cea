//! Conversion from the builder's node graph to ComfyUI's prompt document.
//!
//! Every node becomes an [`ExternalNode`] built from a common base record.
//! Kinds listed in the mapping table then overwrite the class type and
//! widget values (and, for previews, the properties) with a fragment
//! computed from the node's form values. Kinds not in the table keep the
//! base record with the `"Comment"` class type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

use imgflow_core::stages::kinds;
use imgflow_core::types::{json_number, FieldValues, NodeId};
use imgflow_core::workflow::{Connection, WorkflowNode};

/// Width every node is given in the submitted document.
pub const NODE_WIDTH: u32 = 300;

/// Height every node is given in the submitted document.
pub const NODE_HEIGHT: u32 = 200;

/// Class type used for kinds that have no ComfyUI counterpart.
pub const UNMAPPED_CLASS_TYPE: &str = "Comment";

/// Output slot every connection is wired from.
const DEFAULT_OUTPUT_INDEX: u32 = 0;

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

/// The `prompt` payload accepted by `POST /prompt`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalDocument {
    pub nodes: BTreeMap<NodeId, ExternalNode>,
    /// `from -> to -> [output index]`.
    pub connections: BTreeMap<NodeId, BTreeMap<NodeId, Vec<u32>>>,
}

/// One node record in ComfyUI's document format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub class_type: String,
    #[serde(serialize_with = "serialize_pos")]
    pub pos: [f64; 2],
    pub size: NodeSize,
    pub flags: Map<String, Value>,
    pub order: u32,
    pub mode: u32,
    pub title: String,
    pub properties: Map<String, Value>,
    pub widgets_values: Vec<Value>,
}

/// Integral coordinates are written as integers (`[100, 200]`).
fn serialize_pos<S: Serializer>(pos: &[f64; 2], serializer: S) -> Result<S::Ok, S::Error> {
    [json_number(pos[0]), json_number(pos[1])].serialize(serializer)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSize {
    pub width: u32,
    pub height: u32,
}

// ---------------------------------------------------------------------------
// Per-kind mapping table
// ---------------------------------------------------------------------------

/// Kind-specific part of a node record, merged onto the base.
struct Fragment {
    widgets_values: Vec<Value>,
    properties: Option<Map<String, Value>>,
}

struct KindMapping {
    kind: &'static str,
    class_type: &'static str,
    build: fn(&FieldValues) -> Fragment,
}

static MAPPINGS: &[KindMapping] = &[
    KindMapping {
        kind: kinds::UPLOAD,
        class_type: "LoadImage",
        build: upload_fragment,
    },
    KindMapping {
        kind: kinds::FILTER,
        class_type: "ImageFilter",
        build: filter_fragment,
    },
    KindMapping {
        kind: kinds::REPAIR,
        class_type: "ImageRepair",
        build: repair_fragment,
    },
    KindMapping {
        kind: kinds::PREVIEW,
        class_type: "PreviewImage",
        build: preview_fragment,
    },
];

fn mapping_for(kind: &str) -> Option<&'static KindMapping> {
    MAPPINGS.iter().find(|m| m.kind == kind)
}

/// ComfyUI class type for a stage kind; `"Comment"` when unmapped.
pub fn class_type_for(kind: &str) -> &'static str {
    mapping_for(kind).map_or(UNMAPPED_CLASS_TYPE, |m| m.class_type)
}

fn upload_fragment(fields: &FieldValues) -> Fragment {
    // The builder stores the picked file as `{ name, ... }`; sequence files
    // may give the bare file name instead.
    let file_name = match fields.get("image") {
        Some(Value::Object(file)) => file.get("name").and_then(Value::as_str).unwrap_or(""),
        Some(Value::String(name)) => name.as_str(),
        _ => "",
    };

    Fragment {
        widgets_values: vec![json!(file_name), json!("image")],
        properties: None,
    }
}

fn filter_fragment(fields: &FieldValues) -> Fragment {
    Fragment {
        widgets_values: vec![number_or_zero(fields, "WB"), number_or_zero(fields, "exposure")],
        properties: None,
    }
}

fn repair_fragment(fields: &FieldValues) -> Fragment {
    Fragment {
        widgets_values: vec![number_or_zero(fields, "detail")],
        properties: None,
    }
}

fn preview_fragment(fields: &FieldValues) -> Fragment {
    let metadata = match fields.get("imgmeta") {
        Some(value) if !value.is_null() => value.clone(),
        _ => Value::Object(Map::new()),
    };

    let mut properties = Map::new();
    properties.insert("metadata".to_string(), metadata);

    Fragment {
        widgets_values: Vec::new(),
        properties: Some(properties),
    }
}

fn number_or_zero(fields: &FieldValues, name: &str) -> Value {
    match fields.get(name) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => json!(0),
        Some(Value::String(s)) if s.is_empty() => json!(0),
        Some(value) => value.clone(),
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Convert a single node. Missing form values fall back to defaults.
pub fn convert_node(node: &WorkflowNode) -> ExternalNode {
    let mut record = ExternalNode {
        id: node.id,
        class_type: class_type_for(&node.kind).to_string(),
        pos: [node.position.x, node.position.y],
        size: NodeSize {
            width: NODE_WIDTH,
            height: NODE_HEIGHT,
        },
        flags: Map::new(),
        order: 0,
        mode: 0,
        title: node.name.clone(),
        properties: Map::new(),
        widgets_values: Vec::new(),
    };

    if let Some(mapping) = mapping_for(&node.kind) {
        let fragment = (mapping.build)(&node.fields);
        record.widgets_values = fragment.widgets_values;
        if let Some(properties) = fragment.properties {
            record.properties = properties;
        }
    }

    record
}

/// Build the full prompt document for a sequence.
///
/// Connections referencing the same `from`/`to` pair collapse into one entry.
pub fn to_external_document(nodes: &[WorkflowNode], connections: &[Connection]) -> ExternalDocument {
    let mut document = ExternalDocument::default();

    for node in nodes {
        document.nodes.insert(node.id, convert_node(node));
    }

    for connection in connections {
        document
            .connections
            .entry(connection.from)
            .or_default()
            .insert(connection.to, vec![DEFAULT_OUTPUT_INDEX]);
    }

    document
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
