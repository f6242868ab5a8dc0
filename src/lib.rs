//! # Template Controller Library
//!
//! Core functionality for the Template Controller: CRD types, the template
//! application engine, the reconciler, and observability. The thin runtime
//! bootstrap lives in `main.rs`.

pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod server;

pub use crd::{Template, TemplateSpec, TemplateStatus};
