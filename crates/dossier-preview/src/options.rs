use dossier_template::TemplateDraft;
use ecow::EcoString;

/// Options for configuring the preview rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewOptions {
    /// The graphic shown for images without a usable source.
    pub placeholder_image: EcoString,
    /// Where `data:` images are extracted to, relative to the page. Images
    /// stay inlined when unset.
    pub assets_path: Option<EcoString>,
    /// The indentation per nesting level, in pixels.
    pub indent: u32,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            placeholder_image: "/placeholder.svg".into(),
            assets_path: None,
            indent: 20,
        }
    }
}

impl PreviewOptions {
    /// Sets the placeholder graphic.
    pub fn with_placeholder_image<S: Into<EcoString>>(mut self, src: S) -> Self {
        self.placeholder_image = src.into();
        self
    }

    /// Extracts `data:` images to the given path.
    pub fn with_assets_path<S: Into<EcoString>>(mut self, path: Option<S>) -> Self {
        self.assets_path = path.map(Into::into);
        self
    }

    /// Sets the indentation per nesting level.
    pub fn with_indent(mut self, indent: u32) -> Self {
        self.indent = indent;
        self
    }
}

/// Page settings of the previewed template.
#[derive(Debug, Clone, PartialEq)]
pub struct PageStyle {
    /// The font family.
    pub font: EcoString,
    /// The font size in points.
    pub font_size: f32,
    /// The CSS text color.
    pub text_color: EcoString,
    /// Text shown above the content.
    pub header: EcoString,
    /// Text shown below the content.
    pub footer: EcoString,
}

impl Default for PageStyle {
    fn default() -> Self {
        Self::from(&TemplateDraft::default())
    }
}

impl From<&TemplateDraft> for PageStyle {
    fn from(draft: &TemplateDraft) -> Self {
        Self {
            font: draft.font.clone(),
            font_size: draft.font_size,
            text_color: draft.text_color.clone(),
            header: draft.header.clone(),
            footer: draft.footer.clone(),
        }
    }
}
