//! ComfyUI adapter for the image workflow builder.
//!
//! Converts a validated node sequence into ComfyUI's job-submission
//! document and wraps the REST endpoints used to run it (prompt
//! submission, history, image upload and a reachability probe).

pub mod api;
pub mod config;
pub mod document;
