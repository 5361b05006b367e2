//! # Dossier Preview
//!
//! Renders the structure of a template as an HTML fragment, the way the
//! generated document will lay it out.
//!
//! ```rust
//! use dossier_preview::{PreviewOptions, render_template};
//! use dossier_template::{Block, Paragraph, TemplateDraft};
//!
//! let mut draft = TemplateDraft::new("Acta");
//! draft.structure.blocks.push(Block::Paragraph(Paragraph::new("<p>Hola</p>")));
//!
//! let preview = render_template(&draft, &PreviewOptions::default());
//! assert!(preview.html.contains("<p>Hola</p>"));
//! assert!(preview.diagnostics.is_empty());
//! ```

pub mod diagnostics;
mod options;
mod render;
mod writer;

pub use diagnostics::{Diagnostic, DiagnosticSeverity, DiagnosticSink};
pub use options::{PageStyle, PreviewOptions};
pub use render::{
    Asset, CORRUPT_BLOCK_MESSAGE, EMF_IMAGE_MESSAGE, EMPTY_STRUCTURE_MESSAGE, Preview,
    render_preview, render_template,
};
pub use writer::{HtmlWriteError, HtmlWriteResult, HtmlWriter};
