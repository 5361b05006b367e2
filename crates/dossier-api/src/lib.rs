//! # Dossier API
//!
//! A blocking client for the template and document endpoints of the dossier
//! REST API.
//!
//! Templates are sanitized before they are created or updated, so the server
//! never receives a structure without usable blocks.

mod client;
pub mod document;
mod error;

pub use client::{Client, ClientOptions, DEFAULT_BASE_URL};
pub use document::{
    Document, DocumentFromTemplate, DocumentKind, GeneratedTemplate, Module, annexes,
};
pub use error::{ApiError, ApiResult};
