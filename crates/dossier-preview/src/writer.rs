//! A small HTML builder.

use core::fmt;

use ecow::EcoString;

use crate::diagnostics::{Diagnostic, DiagnosticSink};

/// Errors that can occur while building HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlWriteError {
    /// An invalid HTML tag name was encountered.
    InvalidHtmlTag(String),
    /// An invalid HTML attribute name, or an attribute written outside of an
    /// open tag.
    InvalidHtmlAttribute(String),
    /// Invalid structure encountered while rendering.
    InvalidStructure(String),
}

impl fmt::Display for HtmlWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HtmlWriteError::InvalidHtmlTag(tag_name) => {
                write!(f, "Invalid HTML tag name: {tag_name}")
            }
            HtmlWriteError::InvalidHtmlAttribute(attr_name) => {
                write!(f, "Invalid HTML attribute: {attr_name}")
            }
            HtmlWriteError::InvalidStructure(msg) => {
                write!(f, "Invalid structure for HTML conversion: {msg}")
            }
        }
    }
}

impl std::error::Error for HtmlWriteError {}

/// Result type alias for HTML writer operations.
pub type HtmlWriteResult<T> = Result<T, HtmlWriteError>;

/// Builds an HTML fragment tag by tag.
///
/// ```rust
/// use dossier_preview::HtmlWriter;
///
/// let mut writer = HtmlWriter::new();
/// writer.start_tag("p").unwrap();
/// writer.attribute("class", "note").unwrap();
/// writer.finish_tag().unwrap();
/// writer.text("1 < 2").unwrap();
/// writer.end_tag("p").unwrap();
///
/// let output = writer.into_string().unwrap();
/// assert_eq!(output, "<p class=\"note\">1 &lt; 2</p>");
/// ```
pub struct HtmlWriter {
    /// Buffer for storing the output text
    buffer: EcoString,
    /// Whether a tag is currently opened
    tag_opened: bool,
    /// Sink for reporting non-fatal diagnostics.
    diagnostics: Option<Box<dyn DiagnosticSink + 'static>>,
}

impl fmt::Debug for HtmlWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlWriter")
            .field("buffer", &self.buffer)
            .field("tag_opened", &self.tag_opened)
            .finish()
    }
}

impl Default for HtmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlWriter {
    /// Creates a new HTML writer that drops its diagnostics.
    pub fn new() -> Self {
        HtmlWriter {
            buffer: EcoString::new(),
            tag_opened: false,
            diagnostics: None,
        }
    }

    /// Replace the diagnostic sink used to capture non-fatal issues.
    pub fn with_diagnostic_sink(mut self, sink: Box<dyn DiagnosticSink + 'static>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    pub(crate) fn emit_warning<S: Into<EcoString>>(&mut self, message: S) {
        let message = message.into();
        log::warn!("{message}");
        self.emit(Diagnostic::warning(message));
    }

    pub(crate) fn emit_info<S: Into<EcoString>>(&mut self, message: S) {
        let message = message.into();
        log::info!("{message}");
        self.emit(Diagnostic::info(message));
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        if let Some(sink) = &mut self.diagnostics {
            sink.emit(diagnostic);
        }
    }

    /// Consumes the writer and returns the generated HTML string.
    pub fn into_string(mut self) -> HtmlWriteResult<EcoString> {
        self.ensure_tag_closed();
        Ok(self.buffer)
    }

    fn ensure_tag_closed(&mut self) {
        if self.tag_opened {
            self.buffer.push('>');
            self.tag_opened = false;
        }
    }

    /// Starts an HTML tag with the given name.
    pub fn start_tag(&mut self, tag_name: &str) -> HtmlWriteResult<()> {
        if !is_safe_tag_name(tag_name) {
            return Err(HtmlWriteError::InvalidHtmlTag(tag_name.to_string()));
        }
        self.ensure_tag_closed();
        self.buffer.push('<');
        self.buffer.push_str(tag_name);
        self.tag_opened = true;
        Ok(())
    }

    /// Adds an attribute to the currently open tag.
    pub fn attribute(&mut self, key: &str, value: &str) -> HtmlWriteResult<()> {
        if !self.tag_opened {
            return Err(HtmlWriteError::InvalidHtmlAttribute(format!(
                "cannot write attribute {key}: no tag is currently open"
            )));
        }
        if !is_safe_attribute_name(key) {
            return Err(HtmlWriteError::InvalidHtmlAttribute(key.to_string()));
        }
        self.buffer.push(' ');
        self.buffer.push_str(key);
        self.buffer.push_str("=\"");
        self.buffer
            .push_str(html_escape::encode_double_quoted_attribute(value).as_ref());
        self.buffer.push('"');
        Ok(())
    }

    /// Finishes the current open tag.
    pub fn finish_tag(&mut self) -> HtmlWriteResult<()> {
        self.ensure_tag_closed();
        Ok(())
    }

    /// Finishes the current open tag as a self-closing tag.
    pub fn finish_self_closing_tag(&mut self) -> HtmlWriteResult<()> {
        if !self.tag_opened {
            return Err(HtmlWriteError::InvalidHtmlTag(
                "Cannot finish self-closing tag: no tag is currently open.".to_string(),
            ));
        }
        self.buffer.push_str(" />");
        self.tag_opened = false;
        Ok(())
    }

    /// Closes an HTML tag with the given name.
    pub fn end_tag(&mut self, tag_name: &str) -> HtmlWriteResult<()> {
        self.ensure_tag_closed();
        self.buffer.push_str("</");
        self.buffer.push_str(tag_name);
        self.buffer.push('>');
        Ok(())
    }

    /// Writes text content, escaping HTML special characters.
    pub fn text(&mut self, text: &str) -> HtmlWriteResult<()> {
        self.ensure_tag_closed();
        self.buffer.push_str(html_escape::encode_text(text).as_ref());
        Ok(())
    }

    /// Writes HTML content that is trusted to be well-formed and safe.
    pub fn write_trusted_html(&mut self, html: &str) -> HtmlWriteResult<()> {
        self.ensure_tag_closed();
        self.buffer.push_str(html);
        Ok(())
    }

    /// Writes `<tag attrs...>`, the body, then `</tag>`.
    pub fn element(
        &mut self,
        tag_name: &str,
        attributes: &[(&str, &str)],
        body: impl FnOnce(&mut Self) -> HtmlWriteResult<()>,
    ) -> HtmlWriteResult<()> {
        self.start_tag(tag_name)?;
        for (key, value) in attributes {
            self.attribute(key, value)?;
        }
        self.finish_tag()?;
        body(self)?;
        self.end_tag(tag_name)
    }

    /// Writes an element holding only escaped text.
    pub fn text_element(
        &mut self,
        tag_name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> HtmlWriteResult<()> {
        self.element(tag_name, attributes, |w| w.text(text))
    }
}

/// Tag names should only contain letters, numbers, underscores, colons, and
/// hyphens.
fn is_safe_tag_name(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':' || c == '-')
}

/// Attribute names should only contain letters, numbers, underscores, colons,
/// dots, and hyphens.
fn is_safe_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':' || c == '-' || c == '.')
}
