//! Non-fatal issues found while rendering a preview.
//!
//! Every diagnostic names the block it was found in, so that an author can
//! go back to it with the editor.

use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use dossier_template::BlockPath;
use ecow::EcoString;

/// How much a diagnostic matters to the author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    /// Something in the structure could not be shown as authored.
    Warning,
    /// How something was shown, e.g. where an image was extracted to.
    Info,
}

/// One issue found while rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The severity.
    pub severity: DiagnosticSeverity,
    /// What happened.
    pub message: EcoString,
    /// The block being rendered, `None` for the page around the blocks.
    pub block: Option<BlockPath>,
}

impl Diagnostic {
    /// A warning about the page.
    pub fn warning(message: impl Into<EcoString>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            message: message.into(),
            block: None,
        }
    }

    /// A note about the page.
    pub fn info(message: impl Into<EcoString>) -> Self {
        Self {
            severity: DiagnosticSeverity::Info,
            message: message.into(),
            block: None,
        }
    }

    /// Attributes the diagnostic to a block.
    pub fn at(mut self, block: BlockPath) -> Self {
        self.block = Some(block);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.block {
            Some(block) => write!(f, "block {block}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Receives the diagnostics of an [`HtmlWriter`](crate::HtmlWriter).
pub trait DiagnosticSink {
    /// Records a diagnostic.
    fn emit(&mut self, diagnostic: Diagnostic);
}

/// The diagnostics of one render, shared by the scratch writers of all its
/// blocks. Diagnostics emitted without a block are attributed to the block
/// currently being rendered.
#[derive(Debug, Clone, Default)]
pub(crate) struct RenderDiagnostics {
    state: Rc<RefCell<RenderState>>,
}

#[derive(Debug, Default)]
struct RenderState {
    entries: Vec<Diagnostic>,
    current: Option<BlockPath>,
}

impl RenderDiagnostics {
    /// Starts attributing diagnostics to `block`. Returns the block to restore
    /// with [`RenderDiagnostics::leave`].
    pub fn enter(&self, block: BlockPath) -> Option<BlockPath> {
        self.state.borrow_mut().current.replace(block)
    }

    pub fn leave(&self, previous: Option<BlockPath>) {
        self.state.borrow_mut().current = previous;
    }

    /// Takes the diagnostics collected so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.state.borrow_mut().entries)
    }
}

impl DiagnosticSink for RenderDiagnostics {
    fn emit(&mut self, mut diagnostic: Diagnostic) {
        let mut state = self.state.borrow_mut();
        if diagnostic.block.is_none() {
            diagnostic.block = state.current.clone();
        }
        state.entries.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_follow_the_current_block() {
        let mut diagnostics = RenderDiagnostics::default();
        diagnostics.emit(Diagnostic::warning("page"));

        let outer = diagnostics.enter(BlockPath::root(1));
        let inner = diagnostics.enter(BlockPath::root(1).cell(0, 2));
        diagnostics.emit(Diagnostic::info("nested"));
        diagnostics.leave(inner);
        diagnostics.emit(Diagnostic::warning("section").at(BlockPath::root(4)));
        diagnostics.emit(Diagnostic::warning("table"));
        diagnostics.leave(outer);

        let messages: Vec<String> = diagnostics.take().iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            ["page", "block 1/r0c2: nested", "block 4: section", "block 1: table"]
        );
        assert!(diagnostics.take().is_empty());
    }
}
