//! Normalization of a block tree before it is sent to the server.

use core::fmt;

use ecow::{EcoString, eco_format};

use crate::block::{Block, BlockKind, Cell, Image, Paragraph, Placeholder, Section, Table};

/// Why a structure cannot be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The top-level block list is empty.
    EmptyStructure,
    /// Every top-level block is corrupted.
    NoUsableBlocks,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyStructure => {
                write!(f, "the template must contain at least one block")
            }
            ValidationError::NoUsableBlocks => {
                write!(f, "the template has no usable blocks, all of them are corrupted")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Options of [`sanitize_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Whether to also normalize section children and nested tables.
    pub recursive: bool,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self { recursive: true }
    }
}

impl SanitizeOptions {
    /// Only normalizes the top-level blocks.
    pub fn shallow() -> Self {
        Self { recursive: false }
    }
}

/// Normalizes a block list with the default options.
pub fn sanitize(blocks: &[Block]) -> Result<Vec<Block>, ValidationError> {
    sanitize_with(blocks, SanitizeOptions::default())
}

/// Normalizes a block list so that it can be submitted.
///
/// Blank labels are trimmed and replaced by defaults derived from the block's
/// one-based position among its siblings. Headerless tables get one column
/// and one empty row. Corrupted blocks keep their position and their raw
/// JSON. The result is stable: a sanitized list sanitizes to itself.
pub fn sanitize_with(
    blocks: &[Block],
    options: SanitizeOptions,
) -> Result<Vec<Block>, ValidationError> {
    if blocks.is_empty() {
        return Err(ValidationError::EmptyStructure);
    }

    if blocks.iter().all(Block::is_corrupt) {
        return Err(ValidationError::NoUsableBlocks);
    }

    Ok(sanitize_list(blocks, options))
}

fn sanitize_list(blocks: &[Block], options: SanitizeOptions) -> Vec<Block> {
    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| sanitize_block(block, i + 1, options))
        .collect()
}

fn sanitize_block(block: &Block, position: usize, options: SanitizeOptions) -> Block {
    match block {
        Block::Chapter(section) => Block::Chapter(sanitize_section(
            section,
            BlockKind::Chapter,
            position,
            options,
        )),
        Block::Subchapter(section) => Block::Subchapter(sanitize_section(
            section,
            BlockKind::Subchapter,
            position,
            options,
        )),
        Block::Paragraph(paragraph) => {
            let html = or_default(&paragraph.html, || eco_format!("(párrafo {position})"));
            Block::Paragraph(Paragraph::new(html))
        }
        Block::Image(image) => Block::Image(Image {
            src: image.src.clone(),
            alt: Some(or_default(
                image.alt.as_deref().unwrap_or_default(),
                || eco_format!("imagen {position}"),
            )),
        }),
        Block::Placeholder(placeholder) => Block::Placeholder(Placeholder {
            key: or_default(&placeholder.key, || eco_format!("placeholder_{position}")),
            description: placeholder.description.clone(),
        }),
        Block::Table(table) => Block::Table(sanitize_table(table, options)),
        Block::Corrupt(value) => {
            log::warn!("keeping unrecognized block at position {position} as is: {value}");
            block.clone()
        }
    }
}

fn sanitize_section(
    section: &Section,
    kind: BlockKind,
    position: usize,
    options: SanitizeOptions,
) -> Section {
    Section {
        title: or_default(&section.title, || eco_format!("{kind} {position}")),
        blocks: if options.recursive {
            sanitize_list(&section.blocks, options)
        } else {
            section.blocks.clone()
        },
    }
}

fn sanitize_table(table: &Table, options: SanitizeOptions) -> Table {
    if table.headers.is_empty() {
        return Table {
            headers: vec![Cell::from("Columna 1")],
            rows: vec![vec![Cell::default()]],
        };
    }

    if !options.recursive {
        return table.clone();
    }

    let rows = table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Cell::Nested { table, span } => Cell::Nested {
                        table: Box::new(sanitize_table(table, options)),
                        span: *span,
                    },
                    other => other.clone(),
                })
                .collect()
        })
        .collect();

    Table {
        headers: table.headers.clone(),
        rows,
    }
}

fn or_default(value: &str, default: impl FnOnce() -> EcoString) -> EcoString {
    match value.trim() {
        "" => default(),
        trimmed => trimmed.into(),
    }
}
