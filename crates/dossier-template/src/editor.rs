//! Structural edits on a block tree.
//!
//! Every operation takes the current block list and returns a new one; the
//! input is never modified. A bad path or a block of the wrong variant is a
//! caller bug, reported as an [`EditError`] with the tree left as it was.

use core::fmt;

use ecow::{EcoString, eco_format};

use crate::block::{Block, BlockKind, Cell, Paragraph, Table};
use crate::path::{BlockPath, Step};

/// A rejected edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// The path has no steps.
    EmptyPath,
    /// An index step points past the end of a block list.
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// The length of the list.
        len: usize,
    },
    /// A step tried to descend into a block that has no children of that sort.
    NotAContainer(BlockPath),
    /// A cell step was taken outside of a table.
    MisplacedCellStep(BlockPath),
    /// The addressed cell does not exist.
    CellOutOfRange {
        /// The row index.
        row: usize,
        /// The column index.
        col: usize,
    },
    /// The addressed cell does not hold a nested table.
    NotANestedTable {
        /// The row index.
        row: usize,
        /// The column index.
        col: usize,
    },
    /// The addressed cell holds a nested table, which has no text to edit.
    NestedTableCell {
        /// The row index.
        row: usize,
        /// The column index.
        col: usize,
    },
    /// The path addresses a nested table rather than a block slot.
    NotABlockSlot(BlockPath),
    /// The addressed block is of another variant.
    UnexpectedBlock {
        /// The variant the operation needs.
        expected: &'static str,
        /// The path of the block.
        path: BlockPath,
    },
    /// A row index points past the last row.
    RowOutOfRange {
        /// The offending index.
        row: usize,
        /// The number of rows.
        len: usize,
    },
    /// A column index points past the last header.
    ColumnOutOfRange {
        /// The offending index.
        col: usize,
        /// The number of headers.
        len: usize,
    },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::EmptyPath => write!(f, "empty block path"),
            EditError::IndexOutOfRange { index, len } => {
                write!(f, "block index {index} out of range for {len} blocks")
            }
            EditError::NotAContainer(path) => write!(f, "block at {path} has no children"),
            EditError::MisplacedCellStep(path) => {
                write!(f, "cell step outside of a table in {path}")
            }
            EditError::CellOutOfRange { row, col } => {
                write!(f, "no cell at row {row}, column {col}")
            }
            EditError::NotANestedTable { row, col } => {
                write!(f, "cell at row {row}, column {col} does not hold a nested table")
            }
            EditError::NestedTableCell { row, col } => write!(
                f,
                "cell at row {row}, column {col} holds a nested table; edit it through its own path"
            ),
            EditError::NotABlockSlot(path) => write!(f, "{path} addresses a nested table"),
            EditError::UnexpectedBlock { expected, path } => {
                write!(f, "block at {path} is not a {expected}")
            }
            EditError::RowOutOfRange { row, len } => {
                write!(f, "row {row} out of range for {len} rows")
            }
            EditError::ColumnOutOfRange { col, len } => {
                write!(f, "column {col} out of range for {len} columns")
            }
        }
    }
}

impl std::error::Error for EditError {}

/// The result type of edits.
pub type EditResult<T = Vec<Block>> = Result<T, EditError>;

/// A single edit, as issued by an editing surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Appends an empty block to the top level.
    AddBlock(BlockKind),
    /// Appends an empty block to the children of a section.
    AddChild {
        /// The section.
        parent: BlockPath,
        /// The kind of the new block.
        kind: BlockKind,
    },
    /// Removes a block.
    RemoveBlock(BlockPath),
    /// Replaces a block, possibly with another variant.
    UpdateBlock {
        /// The replaced block.
        path: BlockPath,
        /// The new block.
        block: Block,
    },
    /// Appends an empty row to a table.
    AddTableRow(BlockPath),
    /// Appends a column to a table.
    AddTableColumn(BlockPath),
    /// Removes a row from a table.
    RemoveTableRow {
        /// The table.
        table: BlockPath,
        /// The row index.
        row: usize,
    },
    /// Removes a column from a table.
    RemoveTableColumn {
        /// The table.
        table: BlockPath,
        /// The column index.
        col: usize,
    },
    /// Sets the text of a body cell.
    UpdateTableCell {
        /// The table.
        table: BlockPath,
        /// The row index.
        row: usize,
        /// The column index.
        col: usize,
        /// The new text.
        value: EcoString,
    },
    /// Sets the text of a header cell.
    UpdateTableHeader {
        /// The table.
        table: BlockPath,
        /// The column index.
        col: usize,
        /// The new text.
        value: EcoString,
    },
    /// Sets the rich text of a paragraph.
    UpdateParagraph {
        /// The paragraph.
        path: BlockPath,
        /// The new rich text.
        html: EcoString,
    },
}

impl Edit {
    /// Applies the edit, returning the new block list.
    pub fn apply(&self, blocks: &[Block]) -> EditResult {
        match self {
            Edit::AddBlock(kind) => Ok(add_block(blocks, *kind)),
            Edit::AddChild { parent, kind } => add_child(blocks, parent, *kind),
            Edit::RemoveBlock(path) => remove_block(blocks, path),
            Edit::UpdateBlock { path, block } => update_block(blocks, path, block.clone()),
            Edit::AddTableRow(table) => add_table_row(blocks, table),
            Edit::AddTableColumn(table) => add_table_column(blocks, table),
            Edit::RemoveTableRow { table, row } => remove_table_row(blocks, table, *row),
            Edit::RemoveTableColumn { table, col } => remove_table_column(blocks, table, *col),
            Edit::UpdateTableCell {
                table,
                row,
                col,
                value,
            } => update_table_cell(blocks, table, *row, *col, value),
            Edit::UpdateTableHeader { table, col, value } => {
                update_table_header(blocks, table, *col, value)
            }
            Edit::UpdateParagraph { path, html } => update_paragraph(blocks, path, html),
        }
    }
}

/// Appends an empty block of `kind` to the top level.
pub fn add_block(blocks: &[Block], kind: BlockKind) -> Vec<Block> {
    let mut next = blocks.to_vec();
    next.push(kind.create());
    next
}

/// Appends an empty block of `kind` to the children of the section at
/// `parent`.
pub fn add_child(blocks: &[Block], parent: &BlockPath, kind: BlockKind) -> EditResult {
    append_block(blocks, Some(parent), kind.create())
}

/// Appends a block to the section at `parent`, or to the top level.
pub fn append_block(blocks: &[Block], parent: Option<&BlockPath>, block: Block) -> EditResult {
    let Some(parent) = parent else {
        let mut next = blocks.to_vec();
        next.push(block);
        return Ok(next);
    };

    rewrite(blocks, |tree| match block_mut(tree, parent)? {
        Block::Chapter(section) | Block::Subchapter(section) => {
            section.blocks.push(block);
            Ok(())
        }
        _ => Err(unexpected("section", parent)),
    })
}

/// Removes the block at `path`.
pub fn remove_block(blocks: &[Block], path: &BlockPath) -> EditResult {
    rewrite(blocks, |tree| {
        let (list, index) = slot_mut(tree, path)?;
        list.remove(index);
        Ok(())
    })
}

/// Replaces the block at `path`.
pub fn update_block(blocks: &[Block], path: &BlockPath, block: Block) -> EditResult {
    rewrite(blocks, |tree| {
        *block_mut(tree, path)? = block;
        Ok(())
    })
}

/// Appends a row of empty cells, one per header and at least one.
pub fn add_table_row(blocks: &[Block], table: &BlockPath) -> EditResult {
    rewrite(blocks, |tree| {
        let table = table_mut(tree, table)?;
        let width = table.headers.len().max(1);
        table.rows.push(vec![Cell::default(); width]);
        Ok(())
    })
}

/// Appends a header named after its position and an empty cell to every row.
pub fn add_table_column(blocks: &[Block], table: &BlockPath) -> EditResult {
    rewrite(blocks, |tree| {
        let table = table_mut(tree, table)?;
        let header = eco_format!("Columna {}", table.headers.len() + 1);
        table.headers.push(Cell::Plain(header));
        for row in &mut table.rows {
            row.push(Cell::default());
        }
        Ok(())
    })
}

/// Removes the row at `row`.
pub fn remove_table_row(blocks: &[Block], table: &BlockPath, row: usize) -> EditResult {
    rewrite(blocks, |tree| {
        let table = table_mut(tree, table)?;
        let len = table.rows.len();
        if row >= len {
            return Err(EditError::RowOutOfRange { row, len });
        }
        table.rows.remove(row);
        Ok(())
    })
}

/// Removes the header at `col` and the cell at `col` from every row long
/// enough to have one.
pub fn remove_table_column(blocks: &[Block], table: &BlockPath, col: usize) -> EditResult {
    rewrite(blocks, |tree| {
        let table = table_mut(tree, table)?;
        let len = table.headers.len();
        if col >= len {
            return Err(EditError::ColumnOutOfRange { col, len });
        }
        table.headers.remove(col);
        for row in &mut table.rows {
            if col < row.len() {
                row.remove(col);
            }
        }
        Ok(())
    })
}

/// Sets the text of the body cell at `row`, `col`.
///
/// Spanned cells keep their spans. Cells holding a nested table are
/// rejected.
pub fn update_table_cell(
    blocks: &[Block],
    table: &BlockPath,
    row: usize,
    col: usize,
    value: &str,
) -> EditResult {
    rewrite(blocks, |tree| {
        let table = table_mut(tree, table)?;
        let cell = table
            .rows
            .get_mut(row)
            .and_then(|cells| cells.get_mut(col))
            .ok_or(EditError::CellOutOfRange { row, col })?;
        set_cell_text(cell, value, row, col)
    })
}

/// Sets the text of the header at `col`, with the same rules as
/// [`update_table_cell`].
pub fn update_table_header(
    blocks: &[Block],
    table: &BlockPath,
    col: usize,
    value: &str,
) -> EditResult {
    rewrite(blocks, |tree| {
        let table = table_mut(tree, table)?;
        let len = table.headers.len();
        let cell = table
            .headers
            .get_mut(col)
            .ok_or(EditError::ColumnOutOfRange { col, len })?;
        set_cell_text(cell, value, 0, col)
    })
}

/// Sets the rich text of a paragraph and recomputes its plain text.
pub fn update_paragraph(blocks: &[Block], path: &BlockPath, html: &str) -> EditResult {
    rewrite(blocks, |tree| match block_mut(tree, path)? {
        Block::Paragraph(paragraph) => {
            *paragraph = Paragraph::new(html);
            Ok(())
        }
        _ => Err(unexpected("paragraph", path)),
    })
}

fn set_cell_text(cell: &mut Cell, value: &str, row: usize, col: usize) -> EditResult<()> {
    match cell {
        Cell::Spanned { text, .. } => *text = value.into(),
        Cell::Nested { .. } => return Err(EditError::NestedTableCell { row, col }),
        Cell::Plain(_) | Cell::Number(_) | Cell::Raw(_) => *cell = Cell::Plain(value.into()),
    }
    Ok(())
}

fn rewrite(
    blocks: &[Block],
    edit: impl FnOnce(&mut Vec<Block>) -> EditResult<()>,
) -> EditResult {
    let mut next = blocks.to_vec();
    edit(&mut next)?;
    Ok(next)
}

fn unexpected(expected: &'static str, path: &BlockPath) -> EditError {
    EditError::UnexpectedBlock {
        expected,
        path: path.clone(),
    }
}

/// Where a walk along a path currently stands.
enum Cursor<'a> {
    List(&'a mut Vec<Block>),
    Table(&'a mut Table),
}

/// The final target of a path.
enum Target<'a> {
    Slot(&'a mut Vec<Block>, usize),
    Nested(&'a mut Table),
}

fn resolve<'a>(blocks: &'a mut Vec<Block>, path: &BlockPath) -> EditResult<Target<'a>> {
    let (last, init) = path.steps().split_last().ok_or(EditError::EmptyPath)?;

    let mut cursor = Cursor::List(blocks);
    for step in init {
        cursor = match (cursor, *step) {
            (Cursor::List(list), Step::Index(index)) => {
                let len = list.len();
                match list.get_mut(index) {
                    Some(Block::Chapter(section) | Block::Subchapter(section)) => {
                        Cursor::List(&mut section.blocks)
                    }
                    Some(Block::Table(table)) => Cursor::Table(table),
                    Some(_) => return Err(EditError::NotAContainer(path.clone())),
                    None => return Err(EditError::IndexOutOfRange { index, len }),
                }
            }
            (Cursor::Table(table), Step::Cell { row, col }) => {
                Cursor::Table(nested_table_mut(table, row, col)?)
            }
            (Cursor::Table(_), Step::Index(_)) => {
                return Err(EditError::NotAContainer(path.clone()));
            }
            (Cursor::List(_), Step::Cell { .. }) => {
                return Err(EditError::MisplacedCellStep(path.clone()));
            }
        };
    }

    match (cursor, *last) {
        (Cursor::List(list), Step::Index(index)) => {
            let len = list.len();
            if index >= len {
                return Err(EditError::IndexOutOfRange { index, len });
            }
            Ok(Target::Slot(list, index))
        }
        (Cursor::Table(table), Step::Cell { row, col }) => {
            Ok(Target::Nested(nested_table_mut(table, row, col)?))
        }
        (Cursor::Table(_), Step::Index(_)) => Err(EditError::NotAContainer(path.clone())),
        (Cursor::List(_), Step::Cell { .. }) => Err(EditError::MisplacedCellStep(path.clone())),
    }
}

fn nested_table_mut(table: &mut Table, row: usize, col: usize) -> EditResult<&mut Table> {
    match table.rows.get_mut(row).and_then(|cells| cells.get_mut(col)) {
        Some(Cell::Nested { table, .. }) => Ok(table.as_mut()),
        Some(_) => Err(EditError::NotANestedTable { row, col }),
        None => Err(EditError::CellOutOfRange { row, col }),
    }
}

fn slot_mut<'a>(
    blocks: &'a mut Vec<Block>,
    path: &BlockPath,
) -> EditResult<(&'a mut Vec<Block>, usize)> {
    match resolve(blocks, path)? {
        Target::Slot(list, index) => Ok((list, index)),
        Target::Nested(_) => Err(EditError::NotABlockSlot(path.clone())),
    }
}

fn block_mut<'a>(blocks: &'a mut Vec<Block>, path: &BlockPath) -> EditResult<&'a mut Block> {
    let (list, index) = slot_mut(blocks, path)?;
    Ok(&mut list[index])
}

fn table_mut<'a>(blocks: &'a mut Vec<Block>, path: &BlockPath) -> EditResult<&'a mut Table> {
    match resolve(blocks, path)? {
        Target::Nested(table) => Ok(table),
        Target::Slot(list, index) => match &mut list[index] {
            Block::Table(table) => Ok(table),
            _ => Err(unexpected("table", path)),
        },
    }
}
