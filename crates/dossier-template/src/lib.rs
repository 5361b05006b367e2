//! Dossier templates: the block tree of a template, the edits an author can
//! make to it, and the normalization applied before it is stored.
//!
//! A template structure is a list of [`Block`]s. Chapters and subchapters nest
//! further blocks, tables may embed tables in their cells. Blocks are
//! addressed by [`BlockPath`] and changed through [`Edit`]s, each of which
//! produces a new block list. Before a template is submitted,
//! [`sanitize`] fills in blank labels and rejects empty structures.

pub mod block;
pub mod editor;
pub mod media;
pub mod path;
pub mod sanitize;
pub mod session;
pub mod template;

pub use block::{Block, BlockKind, Cell, Image, Paragraph, Placeholder, Section, Span, Table};
pub use block::{create_block, strip_tags};
pub use editor::{Edit, EditError, EditResult};
pub use media::{DataUri, MediaError, is_emf, load_image, mime_to_ext};
pub use path::{BlockPath, Step};
pub use sanitize::{SanitizeOptions, ValidationError, sanitize, sanitize_with};
pub use session::{EditSession, SessionMode, Submission};
pub use template::{Structure, Template, TemplateDraft, User, filter_by_name};
