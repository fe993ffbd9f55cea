//! Workflow graph types: nodes placed on the canvas and the edges between them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::stages;
use crate::types::{json_number, FieldValues, NodeId};

/// Canvas coordinates of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// One stage instance in a user-built sequence.
///
/// Reads the kind from `type` or `componentType`; when both are present
/// `type` wins. Form values are read from `fields` or `formData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeRecord")]
pub struct WorkflowNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub position: Position,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: FieldValues,
}

/// Wire shape of a node as saved by the builder.
#[derive(Deserialize)]
struct NodeRecord {
    id: NodeId,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(rename = "componentType")]
    component_type: Option<String>,
    #[serde(flatten)]
    position: Position,
    #[serde(default)]
    name: String,
    #[serde(default, alias = "formData")]
    fields: FieldValues,
}

impl TryFrom<NodeRecord> for WorkflowNode {
    type Error = String;

    fn try_from(record: NodeRecord) -> Result<Self, Self::Error> {
        let kind = record
            .kind
            .or(record.component_type)
            .ok_or_else(|| format!("node {}: missing field `type`", record.id))?;

        Ok(Self {
            id: record.id,
            kind,
            position: record.position,
            name: record.name,
            fields: record.fields,
        })
    }
}

impl WorkflowNode {
    /// Bare node with no name or field values. Unknown kinds are accepted.
    pub fn new(id: NodeId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            position: Position::default(),
            name: String::new(),
            fields: FieldValues::new(),
        }
    }

    /// Node for a registered stage, named after it and pre-filled with the
    /// schema's range defaults.
    pub fn from_stage(id: NodeId, kind: &str, position: Position) -> Result<Self, CoreError> {
        let stage = stages::lookup(kind).ok_or_else(|| CoreError::UnknownStage(kind.to_string()))?;

        let fields = stage
            .fields
            .iter()
            .filter_map(|f| f.range.map(|r| (f.name.to_string(), json_number(r.default))))
            .collect();

        Ok(Self {
            id,
            kind: stage.kind.to_string(),
            position,
            name: stage.name.to_string(),
            fields,
        })
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }
}

/// Directed edge between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
}

/// Edges implied by sequence adjacency: each node feeds its successor.
pub fn connections_for(nodes: &[WorkflowNode]) -> Vec<Connection> {
    nodes
        .windows(2)
        .map(|pair| Connection {
            from: pair[0].id,
            to: pair[1].id,
        })
        .collect()
}

/// A saved sequence: ordered nodes plus optional explicit edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sequence {
    pub nodes: Vec<WorkflowNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<Connection>>,
}

impl Sequence {
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Explicit edges when present, otherwise the adjacency edges.
    pub fn connections(&self) -> Vec<Connection> {
        match &self.connections {
            Some(explicit) => explicit.clone(),
            None => connections_for(&self.nodes),
        }
    }
}
