//! Stage registry and sequence validator for the image workflow builder.
//!
//! This crate has no internal dependencies and performs no I/O, so it can be
//! shared by the ComfyUI adapter, the CLI and any UI layer that needs to gate
//! insertions or a "run" action.

pub mod error;
pub mod stages;
pub mod types;
pub mod validation;
pub mod workflow;
