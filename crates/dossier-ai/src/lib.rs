//! Core library for the travel-document packet assembly service.
//!
//! The `workflows` tree holds the document intelligence pipeline: extraction of
//! structured facts from uploaded text, layered data resolution, synthetic
//! auto-fill, and orchestrated artifact generation. The remaining modules carry
//! the ambient concerns shared with the HTTP service crate.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
