//! Positional addresses into a block tree.

use core::fmt;
use std::str::FromStr;

use ecow::EcoString;

/// One step of a [`BlockPath`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// An index into a block list: the top level or a section's children.
    Index(usize),
    /// A table cell holding a nested table.
    Cell {
        /// The row index.
        row: usize,
        /// The column index.
        col: usize,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Index(index) => write!(f, "{index}"),
            Step::Cell { row, col } => write!(f, "r{row}c{col}"),
        }
    }
}

/// The address of a block, written as `0/2/r1c0` in text form.
///
/// A path starts at the top-level block list. Index steps descend into the
/// children of chapters and subchapters, cell steps descend into the nested
/// table held by a table cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BlockPath(Vec<Step>);

impl BlockPath {
    /// The path of a top-level block.
    pub fn root(index: usize) -> Self {
        Self(vec![Step::Index(index)])
    }

    /// Extends the path into a child of a section.
    pub fn child(mut self, index: usize) -> Self {
        self.0.push(Step::Index(index));
        self
    }

    /// Extends the path into the nested table of a cell.
    pub fn cell(mut self, row: usize, col: usize) -> Self {
        self.0.push(Step::Cell { row, col });
        self
    }

    /// The steps of the path.
    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    /// Whether the path has no steps.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Step>> for BlockPath {
    fn from(steps: Vec<Step>) -> Self {
        Self(steps)
    }
}

impl fmt::Display for BlockPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// The error returned when a block path fails to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParseError(pub EcoString);

impl fmt::Display for PathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid block path segment: {:?}", self.0)
    }
}

impl std::error::Error for PathParseError {}

impl FromStr for BlockPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PathParseError(s.into()));
        }

        s.split('/').map(parse_step).collect::<Result<_, _>>().map(Self)
    }
}

fn parse_step(segment: &str) -> Result<Step, PathParseError> {
    let err = || PathParseError(segment.into());

    if let Some(rest) = segment.strip_prefix('r') {
        let (row, col) = rest.split_once('c').ok_or_else(err)?;
        return Ok(Step::Cell {
            row: row.parse().map_err(|_| err())?,
            col: col.parse().map_err(|_| err())?,
        });
    }

    segment.parse().map(Step::Index).map_err(|_| err())
}
