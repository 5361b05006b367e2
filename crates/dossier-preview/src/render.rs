//! Rendering of template structures to HTML.
//!
//! Rendering never fails. Every block is written into its own scratch writer,
//! so a block that cannot be rendered turns into a corrupted-block marker while
//! its siblings render normally.

use dossier_template::template::{DEFAULT_FONT, DEFAULT_FONT_SIZE, DEFAULT_TEXT_COLOR};
use dossier_template::{
    Block, BlockPath, Cell, DataUri, Image, Paragraph, Placeholder, Section, Structure, Table,
    TemplateDraft, is_emf,
};
use ecow::{EcoString, eco_format};

use crate::diagnostics::{Diagnostic, DiagnosticSink, RenderDiagnostics};
use crate::options::{PageStyle, PreviewOptions};
use crate::writer::{HtmlWriteResult, HtmlWriter};

/// Shown instead of an absent or empty structure.
pub const EMPTY_STRUCTURE_MESSAGE: &str = "No hay estructura definida para previsualizar";
/// Shown instead of a block that cannot be rendered.
pub const CORRUPT_BLOCK_MESSAGE: &str = "⚠️ Error: Bloque corrupto";
/// Shown instead of an EMF image.
pub const EMF_IMAGE_MESSAGE: &str = "⚠️ Imagen EMF no soportada en el navegador";

/// An image extracted from a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// The file name, e.g. `image-1.png`.
    pub name: EcoString,
    /// The media type of the payload.
    pub mime: EcoString,
    /// The decoded payload.
    pub data: Vec<u8>,
}

/// A rendered preview.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preview {
    /// The HTML fragment.
    pub html: EcoString,
    /// Images extracted from the structure, referenced by the fragment.
    pub assets: Vec<Asset>,
    /// What could not be shown as authored.
    pub diagnostics: Vec<Diagnostic>,
}

/// Renders a structure, or the empty-structure message when there is none.
pub fn render_preview(
    structure: Option<&Structure>,
    style: &PageStyle,
    options: &PreviewOptions,
) -> Preview {
    let mut renderer = Renderer {
        style,
        options,
        sink: RenderDiagnostics::default(),
        assets: Vec::new(),
    };
    let html = renderer.document(structure);

    Preview {
        html,
        assets: renderer.assets,
        diagnostics: renderer.sink.take(),
    }
}

/// Renders the structure of a draft with its own page settings.
pub fn render_template(draft: &TemplateDraft, options: &PreviewOptions) -> Preview {
    render_preview(Some(&draft.structure), &PageStyle::from(draft), options)
}

struct Renderer<'a> {
    style: &'a PageStyle,
    options: &'a PreviewOptions,
    sink: RenderDiagnostics,
    assets: Vec<Asset>,
}

impl Renderer<'_> {
    fn writer(&self) -> HtmlWriter {
        HtmlWriter::new().with_diagnostic_sink(Box::new(self.sink.clone()))
    }

    fn warn(&mut self, message: EcoString) {
        log::warn!("{message}");
        self.sink.emit(Diagnostic::warning(message));
    }

    fn document(&mut self, structure: Option<&Structure>) -> EcoString {
        let mut w = self.writer();
        let result = self
            .write_document(&mut w, structure)
            .and_then(|()| w.into_string());

        result.unwrap_or_else(|err| {
            self.warn(eco_format!("preview could not be rendered: {err}"));
            eco_format!("<p class=\"preview-error\">{CORRUPT_BLOCK_MESSAGE}</p>\n")
        })
    }

    fn style_value(&mut self, name: &str, value: &str, default: &str) -> EcoString {
        match style_value(value) {
            Some(value) => value.into(),
            None => {
                if !value.trim().is_empty() {
                    self.warn(eco_format!("ignoring {name} {value:?}"));
                }
                default.into()
            }
        }
    }

    fn write_document(
        &mut self,
        w: &mut HtmlWriter,
        structure: Option<&Structure>,
    ) -> HtmlWriteResult<()> {
        let (font, color) = (self.style.font.clone(), self.style.text_color.clone());
        let font = self.style_value("font", &font, DEFAULT_FONT);
        let color = self.style_value("text color", &color, DEFAULT_TEXT_COLOR);
        let size = match self.style.font_size {
            size if size.is_finite() && size > 0.0 => size,
            size => {
                self.warn(eco_format!("ignoring font size {size}"));
                DEFAULT_FONT_SIZE
            }
        };
        let style = eco_format!("font-family: {font}; font-size: {size}px; color: {color};");

        w.start_tag("div")?;
        w.attribute("class", "template-preview")?;
        w.attribute("style", &style)?;
        w.finish_tag()?;
        w.write_trusted_html("\n")?;

        match structure.filter(|structure| !structure.is_empty()) {
            None => {
                w.text_element("p", &[("class", "preview-empty")], EMPTY_STRUCTURE_MESSAGE)?;
                w.write_trusted_html("\n")?;
            }
            Some(structure) => {
                if !self.style.header.trim().is_empty() {
                    w.text_element("header", &[("class", "page-header")], &self.style.header)?;
                    w.write_trusted_html("\n")?;
                }
                if let Some(title) = structure.title.as_deref().filter(|t| !t.is_empty()) {
                    w.text_element("h1", &[], title)?;
                    w.write_trusted_html("\n")?;
                }
                for (index, block) in structure.blocks.iter().enumerate() {
                    let html = self.block(block, BlockPath::root(index), 0);
                    w.write_trusted_html(&html)?;
                }
                if !self.style.footer.trim().is_empty() {
                    w.text_element("footer", &[("class", "page-footer")], &self.style.footer)?;
                    w.write_trusted_html("\n")?;
                }
            }
        }

        w.end_tag("div")?;
        w.write_trusted_html("\n")
    }

    /// Renders one block at the given nesting depth.
    fn block(&mut self, block: &Block, path: BlockPath, depth: usize) -> EcoString {
        let previous = self.sink.enter(path.clone());
        let mut w = self.writer();
        let result = self
            .write_block(&mut w, block, &path, depth)
            .and_then(|()| w.into_string());

        let html = match result {
            Ok(html) => html,
            Err(err) => {
                self.warn(eco_format!("block could not be rendered: {err}"));
                self.corrupt_marker(depth)
            }
        };
        self.sink.leave(previous);
        html
    }

    fn margin(&self, depth: usize) -> EcoString {
        eco_format!("margin-left: {}px;", depth * self.options.indent as usize)
    }

    fn corrupt_marker(&self, depth: usize) -> EcoString {
        let mut w = HtmlWriter::new();
        let margin = self.margin(depth);
        let written = w.element("div", &[("class", "block corrupt"), ("style", &margin)], |w| {
            w.text_element("p", &[], CORRUPT_BLOCK_MESSAGE)
        });
        match written.and_then(|()| w.write_trusted_html("\n")) {
            Ok(()) => w.into_string().unwrap_or_default(),
            Err(_) => EcoString::new(),
        }
    }

    fn write_block(
        &mut self,
        w: &mut HtmlWriter,
        block: &Block,
        path: &BlockPath,
        depth: usize,
    ) -> HtmlWriteResult<()> {
        match block {
            Block::Chapter(section) => {
                self.write_section(w, section, "chapter", "h2", path, depth)?
            }
            Block::Subchapter(section) => {
                self.write_section(w, section, "subchapter", "h3", path, depth)?
            }
            Block::Paragraph(paragraph) => self.write_paragraph(w, paragraph, depth)?,
            Block::Table(table) => self.write_table(w, table, path, depth)?,
            Block::Image(image) => self.write_image(w, image, depth)?,
            Block::Placeholder(placeholder) => self.write_placeholder(w, placeholder, depth)?,
            Block::Corrupt(value) => {
                w.emit_warning(eco_format!("corrupted block in preview: {value}"));
                let marker = self.corrupt_marker(depth);
                return w.write_trusted_html(&marker);
            }
        }
        w.write_trusted_html("\n")
    }

    fn write_section(
        &mut self,
        w: &mut HtmlWriter,
        section: &Section,
        class: &str,
        heading: &str,
        path: &BlockPath,
        depth: usize,
    ) -> HtmlWriteResult<()> {
        let class = eco_format!("block {class}");
        let margin = self.margin(depth);
        w.element("section", &[("class", &class), ("style", &margin)], |w| {
            if !section.title.is_empty() {
                w.text_element(heading, &[], &section.title)?;
            }
            w.write_trusted_html("\n")?;
            for (index, child) in section.blocks.iter().enumerate() {
                let html = self.block(child, path.clone().child(index), depth + 1);
                w.write_trusted_html(&html)?;
            }
            Ok(())
        })
    }

    fn write_paragraph(
        &mut self,
        w: &mut HtmlWriter,
        paragraph: &Paragraph,
        depth: usize,
    ) -> HtmlWriteResult<()> {
        let margin = self.margin(depth);
        w.element("div", &[("class", "block paragraph"), ("style", &margin)], |w| {
            if paragraph.html.is_empty() {
                w.text_element("p", &[], &paragraph.plain_text)
            } else {
                w.write_trusted_html(&paragraph.html)
            }
        })
    }

    fn write_table(
        &mut self,
        w: &mut HtmlWriter,
        table: &Table,
        path: &BlockPath,
        depth: usize,
    ) -> HtmlWriteResult<()> {
        let margin = self.margin(depth);
        w.element("div", &[("class", "block table"), ("style", &margin)], |w| {
            w.start_tag("table")?;
            w.finish_tag()?;

            if !table.headers.is_empty() {
                w.start_tag("thead")?;
                w.finish_tag()?;
                if table.has_grouped_headers() {
                    let (top, bottom): (Vec<&Cell>, Vec<&Cell>) = table
                        .headers
                        .iter()
                        .partition(|header| header.span().col_span() > 1);
                    self.write_row(w, "th", &top, None, path, depth)?;
                    self.write_row(w, "th", &bottom, None, path, depth)?;
                } else {
                    let headers: Vec<&Cell> = table.headers.iter().collect();
                    self.write_row(w, "th", &headers, None, path, depth)?;
                }
                w.end_tag("thead")?;
            }

            w.start_tag("tbody")?;
            w.finish_tag()?;
            for (i, row) in table.rows.iter().enumerate() {
                let cells: Vec<&Cell> = row.iter().collect();
                let class = if i % 2 == 0 { "even" } else { "odd" };
                self.write_row(w, "td", &cells, Some((i, class)), path, depth)?;
            }
            w.end_tag("tbody")?;

            w.end_tag("table")
        })
    }

    fn write_row(
        &mut self,
        w: &mut HtmlWriter,
        cell_tag: &str,
        cells: &[&Cell],
        body_row: Option<(usize, &str)>,
        table: &BlockPath,
        depth: usize,
    ) -> HtmlWriteResult<()> {
        w.start_tag("tr")?;
        if let Some((_, class)) = body_row {
            w.attribute("class", class)?;
        }
        w.finish_tag()?;

        for (col, cell) in cells.iter().enumerate() {
            w.start_tag(cell_tag)?;
            let span = cell.span();
            if span.col_span() > 1 {
                w.attribute("colspan", &span.col_span().to_string())?;
            }
            if span.row_span() > 1 {
                w.attribute("rowspan", &span.row_span().to_string())?;
            }
            w.finish_tag()?;

            match cell {
                Cell::Nested { table: nested, .. } => {
                    // header cells have no path of their own
                    let path = match body_row {
                        Some((row, _)) => table.clone().cell(row, col),
                        None => table.clone(),
                    };
                    let html = self.block_table(nested, path, depth + 1);
                    w.write_trusted_html(&html)?;
                }
                Cell::Plain(text) | Cell::Spanned { text, .. } => w.text(text)?,
                Cell::Number(number) => w.text(&number.to_string())?,
                Cell::Raw(value) => w.text(&value.to_string())?,
            }

            w.end_tag(cell_tag)?;
        }

        w.end_tag("tr")
    }

    /// Renders a nested table with the same containment as a block.
    fn block_table(&mut self, table: &Table, path: BlockPath, depth: usize) -> EcoString {
        let previous = self.sink.enter(path.clone());
        let mut w = self.writer();
        let result = self
            .write_table(&mut w, table, &path, depth)
            .and_then(|()| w.into_string());

        let html = result.unwrap_or_else(|err| {
            self.warn(eco_format!("nested table could not be rendered: {err}"));
            self.corrupt_marker(depth)
        });
        self.sink.leave(previous);
        html
    }

    fn write_image(
        &mut self,
        w: &mut HtmlWriter,
        image: &Image,
        depth: usize,
    ) -> HtmlWriteResult<()> {
        let margin = self.margin(depth);
        let alt = image.alt.as_deref().unwrap_or_default();

        if is_emf(&image.src) {
            let name = if alt.is_empty() { "sin nombre" } else { alt };
            w.emit_warning(eco_format!("EMF image {name:?} cannot be previewed"));
            let detail = eco_format!(
                "La imagen \"{name}\" no se muestra porque es un archivo EMF, formato vectorial de Windows que no se puede renderizar en web."
            );
            return w.element(
                "div",
                &[("class", "block image-unsupported"), ("style", &margin)],
                |w| {
                    w.text_element("p", &[], EMF_IMAGE_MESSAGE)?;
                    w.text_element("p", &[("class", "detail")], &detail)
                },
            );
        }

        let src = self.image_source(w, &image.src);
        w.element("figure", &[("class", "block image"), ("style", &margin)], |w| {
            w.start_tag("img")?;
            w.attribute("src", &src)?;
            w.attribute("alt", if alt.is_empty() { "Imagen" } else { alt })?;
            w.finish_self_closing_tag()?;
            if !alt.is_empty() {
                w.text_element("figcaption", &[], alt)?;
            }
            Ok(())
        })
    }

    /// Resolves the `src` attribute of an image, extracting `data:` payloads
    /// when an assets path is configured.
    fn image_source(&mut self, w: &mut HtmlWriter, src: &str) -> EcoString {
        let src = src.trim();
        if src.is_empty() {
            return self.options.placeholder_image.clone();
        }
        if !src.starts_with("data:") {
            return src.into();
        }

        let uri = match DataUri::parse(src) {
            Ok(uri) => uri,
            Err(err) => {
                w.emit_warning(eco_format!("image replaced by a placeholder: {err}"));
                return self.options.placeholder_image.clone();
            }
        };

        let Some(assets_path) = &self.options.assets_path else {
            return src.into();
        };

        let name = eco_format!("image-{}.{}", self.assets.len() + 1, uri.extension());
        let path = eco_format!("{}/{name}", assets_path.trim_end_matches('/'));
        w.emit_info(eco_format!("extracted {} bytes of {} to {path}", uri.data.len(), uri.mime));
        self.assets.push(Asset {
            name,
            mime: uri.mime,
            data: uri.data,
        });
        path
    }

    fn write_placeholder(
        &mut self,
        w: &mut HtmlWriter,
        placeholder: &Placeholder,
        depth: usize,
    ) -> HtmlWriteResult<()> {
        let margin = self.margin(depth);
        let token = eco_format!("{{{{{}}}}}", placeholder.key);
        w.element("div", &[("class", "block placeholder"), ("style", &margin)], |w| {
            w.text_element("code", &[("class", "placeholder-key")], &token)?;
            let description = placeholder.description.as_deref().unwrap_or_default();
            if !description.is_empty() {
                w.text_element("p", &[("class", "placeholder-description")], description)?;
            }
            Ok(())
        })
    }
}

/// A record value that can be placed in a `style` declaration as is. Values
/// that could end the declaration or open another one are refused.
fn style_value(value: &str) -> Option<&str> {
    let value = value.trim();
    let unsafe_char = |c: char| matches!(c, ';' | ':' | '{' | '}' | '(' | ')' | '\\' | '<' | '>');
    (!value.is_empty() && !value.contains(unsafe_char)).then_some(value)
}
