//! Stage registry for the image-processing pipeline.
//!
//! Every stage a user can place on the canvas is described by a
//! [`StageDefinition`] in the process-wide [`STAGES`] table. The table is
//! `'static` data; the only accessors are [`lookup`] and [`list_available`].

use serde::Serialize;

// ---------------------------------------------------------------------------
// Stage kind constants
// ---------------------------------------------------------------------------

/// Kind tags of the built-in stages.
pub mod kinds {
    pub const UPLOAD: &str = "upload";
    pub const FILTER: &str = "filter";
    pub const REPAIR: &str = "repair";
    pub const PREVIEW: &str = "preview";

    /// All built-in kinds, in pipeline order.
    pub const ALL: &[&str] = &[UPLOAD, FILTER, REPAIR, PREVIEW];
}

// ---------------------------------------------------------------------------
// Definition types
// ---------------------------------------------------------------------------

/// Immutable description of one stage kind.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StageDefinition {
    /// Kind tag, e.g. `"filter"`.
    pub kind: &'static str,
    /// Human-readable name used in every validation message.
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    /// Position hint for the picker and for default canvas layout.
    pub order: u32,
    /// Must appear in every valid sequence.
    pub required: bool,
    pub optional: bool,
    /// Must be the terminal stage.
    pub is_final: bool,
    /// Inserted automatically by the builder; hidden from the picker.
    pub auto_added: bool,
    /// Every entry must be satisfied by a stage earlier in the sequence.
    pub requires: &'static [Dependency],
    /// Informational reverse edges, shown in the picker tooltip.
    pub required_by: &'static [&'static str],
    /// Ordered form schema.
    pub fields: &'static [FieldSpec],
}

/// One entry of a stage's dependency rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Dependency {
    /// The named kind must appear earlier.
    Stage(&'static str),
    /// At least one of the named kinds must appear earlier.
    AnyOf(&'static [&'static str]),
}

impl Dependency {
    /// Kinds referenced by this entry, flattened.
    pub fn kinds(&self) -> &[&'static str] {
        match self {
            Dependency::Stage(kind) => std::slice::from_ref(kind),
            Dependency::AnyOf(kinds) => kinds,
        }
    }
}

/// Widget used to edit a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    ImageUpload,
    Textarea,
    Range,
    Image,
    Object,
    SettingsList,
}

/// Numeric bounds of a range field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeSpec {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

/// Schema entry for one form field.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub input: InputKind,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeSpec>,
    pub required: bool,
    pub readonly: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
}

impl FieldSpec {
    const fn new(name: &'static str, input: InputKind, label: &'static str) -> Self {
        Self {
            name,
            input,
            label,
            placeholder: None,
            range: None,
            required: false,
            readonly: false,
            accept: None,
            rows: None,
        }
    }

    const fn placeholder(self, placeholder: &'static str) -> Self {
        Self {
            placeholder: Some(placeholder),
            ..self
        }
    }

    const fn range(self, min: f64, max: f64, step: f64, default: f64) -> Self {
        Self {
            range: Some(RangeSpec {
                min,
                max,
                step,
                default,
            }),
            ..self
        }
    }

    const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    const fn readonly(self) -> Self {
        Self {
            readonly: true,
            ..self
        }
    }

    const fn accept(self, accept: &'static str) -> Self {
        Self {
            accept: Some(accept),
            ..self
        }
    }

    const fn rows(self, rows: u32) -> Self {
        Self {
            rows: Some(rows),
            ..self
        }
    }
}

impl StageDefinition {
    /// Find a field of this stage's schema by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The built-in stages, in picker order.
pub static STAGES: &[StageDefinition] = &[
    StageDefinition {
        kind: kinds::UPLOAD,
        name: "Upload Image",
        icon: "📁",
        description: "Upload and configure image input",
        order: 1,
        required: true,
        optional: false,
        is_final: false,
        auto_added: false,
        requires: &[],
        required_by: &[kinds::FILTER, kinds::REPAIR],
        fields: &[
            FieldSpec::new("image", InputKind::ImageUpload, "Image")
                .placeholder("Click to select or drag image here")
                .required()
                .accept("image/*"),
            FieldSpec::new("comment", InputKind::Textarea, "Description")
                .placeholder("Describe the photo...")
                .rows(3),
        ],
    },
    StageDefinition {
        kind: kinds::FILTER,
        name: "Image Filter",
        icon: "🎨",
        description: "Apply color and exposure filters",
        order: 2,
        required: false,
        optional: true,
        is_final: false,
        auto_added: false,
        requires: &[Dependency::Stage(kinds::UPLOAD)],
        required_by: &[],
        fields: &[
            FieldSpec::new("WB", InputKind::Range, "White Balance (%)")
                .range(-100.0, 100.0, 1.0, 0.0),
            FieldSpec::new("exposure", InputKind::Range, "Exposure (%)")
                .range(-100.0, 100.0, 1.0, 0.0),
        ],
    },
    StageDefinition {
        kind: kinds::REPAIR,
        name: "Image Repair",
        icon: "🔧",
        description: "Repair and enhance image details",
        order: 3,
        required: false,
        optional: true,
        is_final: false,
        auto_added: false,
        requires: &[Dependency::Stage(kinds::UPLOAD)],
        required_by: &[],
        fields: &[
            FieldSpec::new("detail", InputKind::Range, "Detail Level (%)")
                .range(0.0, 100.0, 1.0, 0.0),
        ],
    },
    StageDefinition {
        kind: kinds::PREVIEW,
        name: "Preview",
        icon: "🖼️",
        description: "Preview the processed image",
        order: 4,
        required: false,
        optional: false,
        is_final: true,
        auto_added: false,
        requires: &[Dependency::AnyOf(&[kinds::FILTER, kinds::REPAIR])],
        required_by: &[],
        fields: &[
            FieldSpec::new("image", InputKind::Image, "Preview Image")
                .placeholder("Image will appear here after processing")
                .readonly(),
            FieldSpec::new("imgmeta", InputKind::Object, "Image Metadata")
                .placeholder("Image metadata (auto-generated)")
                .readonly(),
            FieldSpec::new("settings", InputKind::SettingsList, "Processing Settings")
                .placeholder("No processing settings applied")
                .readonly(),
        ],
    },
];

/// Look up the definition of a stage kind.
pub fn lookup(kind: &str) -> Option<&'static StageDefinition> {
    STAGES.iter().find(|s| s.kind == kind)
}

/// Stages offered in the picker: the registry minus auto-added stages.
pub fn list_available() -> Vec<&'static StageDefinition> {
    STAGES.iter().filter(|s| !s.auto_added).collect()
}

/// Display name of a kind, or the raw tag when the kind is unknown.
pub fn display_name(kind: &str) -> &str {
    lookup(kind).map_or(kind, |s| s.name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
