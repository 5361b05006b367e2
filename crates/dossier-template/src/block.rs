//! The block tree of a template structure.
//!
//! Blocks travel over the wire as JSON objects tagged by a `tipo` field. The
//! decoder is lenient: anything that does not form a known block is kept as
//! [`Block::Corrupt`] together with the raw JSON, so that a single malformed
//! node never poisons the rest of the tree.

use core::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use ecow::EcoString;
use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// The `tipo` tag of a table embedded in a cell.
pub const NESTED_TABLE_TAG: &str = "tabla_anidada";

/// Removes every `<...>` tag from an HTML fragment.
///
/// Entities are left as they are.
pub fn strip_tags(html: &str) -> EcoString {
    static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
    TAG_RE.replace_all(html, "").as_ref().into()
}

/// The kind of a block, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// A titled section at the first level.
    Chapter,
    /// A titled section below a chapter.
    Subchapter,
    /// A rich text paragraph.
    Paragraph,
    /// A table with header cells and rows.
    Table,
    /// An image referenced by URL or data URI.
    Image,
    /// A named substitution point.
    Placeholder,
}

impl BlockKind {
    /// All kinds, in the order the editor offers them.
    pub const ALL: [BlockKind; 6] = [
        BlockKind::Chapter,
        BlockKind::Subchapter,
        BlockKind::Paragraph,
        BlockKind::Table,
        BlockKind::Image,
        BlockKind::Placeholder,
    ];

    /// The `tipo` tag used on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            BlockKind::Chapter => "capitulo",
            BlockKind::Subchapter => "subcapitulo",
            BlockKind::Paragraph => "parrafo",
            BlockKind::Table => "tabla",
            BlockKind::Image => "imagen",
            BlockKind::Placeholder => "placeholder",
        }
    }

    /// Creates an empty block of this kind.
    pub fn create(self) -> Block {
        match self {
            BlockKind::Chapter => Block::Chapter(Section::default()),
            BlockKind::Subchapter => Block::Subchapter(Section::default()),
            BlockKind::Paragraph => Block::Paragraph(Paragraph::default()),
            BlockKind::Table => Block::Table(Table::default()),
            BlockKind::Image => Block::Image(Image::default()),
            BlockKind::Placeholder => Block::Placeholder(Placeholder::default()),
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// The error returned when a block kind name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBlockKind(pub EcoString);

impl fmt::Display for UnknownBlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown block kind: {}", self.0)
    }
}

impl std::error::Error for UnknownBlockKind {}

impl FromStr for BlockKind {
    type Err = UnknownBlockKind;

    /// Accepts both the wire tags and their english names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "capitulo" | "chapter" => BlockKind::Chapter,
            "subcapitulo" | "subchapter" => BlockKind::Subchapter,
            "parrafo" | "paragraph" => BlockKind::Paragraph,
            "tabla" | "table" => BlockKind::Table,
            "imagen" | "image" => BlockKind::Image,
            "placeholder" => BlockKind::Placeholder,
            _ => return Err(UnknownBlockKind(s.into())),
        })
    }
}

/// A node of the template structure.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// `capitulo`
    Chapter(Section),
    /// `subcapitulo`
    Subchapter(Section),
    /// `parrafo`
    Paragraph(Paragraph),
    /// `tabla`
    Table(Table),
    /// `imagen`
    Image(Image),
    /// `placeholder`
    Placeholder(Placeholder),
    /// A value that did not decode into any known block.
    Corrupt(Value),
}

/// Creates an empty block of the given kind.
pub fn create_block(kind: BlockKind) -> Block {
    kind.create()
}

impl Block {
    /// Decodes a block from JSON, falling back to [`Block::Corrupt`].
    pub fn from_value(value: Value) -> Self {
        match TaggedBlock::deserialize(&value) {
            Ok(tagged) => tagged.into(),
            Err(err) => {
                log::warn!("keeping corrupted block as raw JSON: {err}");
                Block::Corrupt(value)
            }
        }
    }

    /// The kind of this block, or `None` if it is corrupted.
    pub fn kind(&self) -> Option<BlockKind> {
        Some(match self {
            Block::Chapter(_) => BlockKind::Chapter,
            Block::Subchapter(_) => BlockKind::Subchapter,
            Block::Paragraph(_) => BlockKind::Paragraph,
            Block::Table(_) => BlockKind::Table,
            Block::Image(_) => BlockKind::Image,
            Block::Placeholder(_) => BlockKind::Placeholder,
            Block::Corrupt(_) => return None,
        })
    }

    /// Whether this block failed to decode.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Block::Corrupt(_))
    }
}

/// The payload shared by chapters and subchapters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// The heading text.
    #[serde(rename = "titulo", default, deserialize_with = "nullable")]
    pub title: EcoString,
    /// The nested blocks.
    #[serde(rename = "bloques", default, deserialize_with = "nullable")]
    pub blocks: Vec<Block>,
}

impl Section {
    /// Creates an empty section with the given title.
    pub fn new(title: impl Into<EcoString>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }
}

/// A paragraph holding rich text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// The rich text.
    #[serde(rename = "texto_html", default, deserialize_with = "nullable")]
    pub html: EcoString,
    /// The rich text with its tags removed.
    #[serde(rename = "texto_plano", default, deserialize_with = "nullable")]
    pub plain_text: EcoString,
}

impl Paragraph {
    /// Creates a paragraph, deriving its plain text from the html.
    pub fn new(html: impl Into<EcoString>) -> Self {
        let html = html.into();
        let plain_text = strip_tags(&html);
        Self { html, plain_text }
    }
}

/// A table. Rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// The header cells.
    #[serde(rename = "encabezados", default, deserialize_with = "nullable")]
    pub headers: Vec<Cell>,
    /// The body rows.
    #[serde(rename = "filas", default, deserialize_with = "nullable_rows")]
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Whether any header spans more than one column.
    pub fn has_grouped_headers(&self) -> bool {
        self.headers.iter().any(|header| header.span().col_span() > 1)
    }
}

/// An image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// A URL or a `data:` URI.
    #[serde(default, deserialize_with = "nullable")]
    pub src: EcoString,
    /// The alternative text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<EcoString>,
}

/// A named substitution point filled in when a document is generated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Placeholder {
    /// The substitution key.
    #[serde(rename = "clave", default, deserialize_with = "nullable")]
    pub key: EcoString,
    /// What the key stands for.
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<EcoString>,
}

/// Decodes `null` like a missing field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn nullable_rows<'de, D>(deserializer: D) -> Result<Vec<Vec<Cell>>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows: Option<Vec<Option<Vec<Cell>>>> = Option::deserialize(deserializer)?;
    Ok(rows
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

#[derive(Deserialize)]
#[serde(tag = "tipo", rename_all = "lowercase")]
enum TaggedBlock {
    Capitulo(Section),
    Subcapitulo(Section),
    Parrafo(Paragraph),
    Tabla(Table),
    Imagen(Image),
    Placeholder(Placeholder),
}

impl From<TaggedBlock> for Block {
    fn from(tagged: TaggedBlock) -> Self {
        match tagged {
            TaggedBlock::Capitulo(section) => Block::Chapter(section),
            TaggedBlock::Subcapitulo(section) => Block::Subchapter(section),
            TaggedBlock::Parrafo(paragraph) => Block::Paragraph(paragraph),
            TaggedBlock::Tabla(table) => Block::Table(table),
            TaggedBlock::Imagen(image) => Block::Image(image),
            TaggedBlock::Placeholder(placeholder) => Block::Placeholder(placeholder),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "tipo", rename_all = "lowercase")]
enum TaggedBlockRef<'a> {
    Capitulo(&'a Section),
    Subcapitulo(&'a Section),
    Parrafo(&'a Paragraph),
    Tabla(&'a Table),
    Imagen(&'a Image),
    Placeholder(&'a Placeholder),
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tagged = match self {
            Block::Chapter(section) => TaggedBlockRef::Capitulo(section),
            Block::Subchapter(section) => TaggedBlockRef::Subcapitulo(section),
            Block::Paragraph(paragraph) => TaggedBlockRef::Parrafo(paragraph),
            Block::Table(table) => TaggedBlockRef::Tabla(table),
            Block::Image(image) => TaggedBlockRef::Imagen(image),
            Block::Placeholder(placeholder) => TaggedBlockRef::Placeholder(placeholder),
            Block::Corrupt(value) => return value.serialize(serializer),
        };
        tagged.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Block::from_value)
    }
}

/// The column and row spans of a cell. Absent spans count as one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    /// `colSpan`
    pub cols: Option<u32>,
    /// `rowSpan`
    pub rows: Option<u32>,
}

impl Span {
    /// The effective column span.
    pub fn col_span(&self) -> u32 {
        self.cols.unwrap_or(1)
    }

    /// The effective row span.
    pub fn row_span(&self) -> u32 {
        self.rows.unwrap_or(1)
    }

    fn from_object(map: &Map<String, Value>) -> Self {
        let read = |key: &str| {
            map.get(key)
                .and_then(Value::as_u64)
                .filter(|&n| n >= 1)
                .and_then(|n| u32::try_from(n).ok())
        };
        Self {
            cols: read("colSpan"),
            rows: read("rowSpan"),
        }
    }

    fn write_entries<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        if let Some(cols) = self.cols {
            map.serialize_entry("colSpan", &cols)?;
        }
        if let Some(rows) = self.rows {
            map.serialize_entry("rowSpan", &rows)?;
        }
        Ok(())
    }
}

/// A header or body cell of a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// A JSON string.
    Plain(EcoString),
    /// A JSON number, shown literally.
    Number(serde_json::Number),
    /// `{ text, colSpan?, rowSpan? }`
    Spanned {
        /// The cell text.
        text: EcoString,
        /// The cell spans.
        span: Span,
    },
    /// `{ tipo: "tabla_anidada", tabla, colSpan?, rowSpan? }`
    Nested {
        /// The embedded table.
        table: Box<Table>,
        /// The cell spans.
        span: Span,
    },
    /// Any other JSON value, shown as its JSON text.
    Raw(Value),
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Plain(EcoString::new())
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Plain(text.into())
    }
}

impl From<EcoString> for Cell {
    fn from(text: EcoString) -> Self {
        Cell::Plain(text)
    }
}

impl Cell {
    /// Decodes a cell from JSON. Never fails.
    pub fn from_value(value: Value) -> Self {
        let map = match value {
            Value::String(text) => return Cell::Plain(text.into()),
            Value::Number(number) => return Cell::Number(number),
            Value::Object(map) => map,
            other => return Cell::Raw(other),
        };

        let span = Span::from_object(&map);
        if map.get("tipo").and_then(Value::as_str) == Some(NESTED_TABLE_TAG) {
            if let Some(Block::Table(table)) = map.get("tabla").cloned().map(Block::from_value) {
                return Cell::Nested {
                    table: Box::new(table),
                    span,
                };
            }
            log::warn!("nested table cell has no usable table");
            return Cell::Raw(Value::Object(map));
        }

        match map.get("text") {
            Some(text) => Cell::Spanned {
                text: value_text(text),
                span,
            },
            None => Cell::Raw(Value::Object(map)),
        }
    }

    /// The spans of the cell. Plain, number and raw cells span one slot.
    pub fn span(&self) -> Span {
        match self {
            Cell::Spanned { span, .. } | Cell::Nested { span, .. } => *span,
            Cell::Plain(_) | Cell::Number(_) | Cell::Raw(_) => Span::default(),
        }
    }

    /// The text shown for the cell, or `None` for a nested table.
    pub fn text(&self) -> Option<EcoString> {
        match self {
            Cell::Plain(text) | Cell::Spanned { text, .. } => Some(text.clone()),
            Cell::Number(number) => Some(number.to_string().into()),
            Cell::Raw(value) => Some(value.to_string().into()),
            Cell::Nested { .. } => None,
        }
    }
}

fn value_text(value: &Value) -> EcoString {
    match value {
        Value::String(text) => text.as_str().into(),
        Value::Null => EcoString::new(),
        Value::Number(number) => number.to_string().into(),
        other => other.to_string().into(),
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Plain(text) => serializer.serialize_str(text),
            Cell::Number(number) => number.serialize(serializer),
            Cell::Raw(value) => value.serialize(serializer),
            Cell::Spanned { text, span } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("text", text)?;
                span.write_entries(&mut map)?;
                map.end()
            }
            Cell::Nested { table, span } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("tipo", NESTED_TABLE_TAG)?;
                map.serialize_entry("tabla", &TaggedBlockRef::Tabla(table))?;
                span.write_entries(&mut map)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Cell::from_value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn strip_tags_keeps_entities() {
        assert_eq!(strip_tags("<p>Hola <b>mundo</b></p>"), "Hola mundo");
        assert_eq!(strip_tags("a &amp; <br/>b"), "a &amp; b");
        assert_eq!(strip_tags("1 < 2"), "1 < 2");
    }

    #[test]
    fn created_blocks_are_empty() {
        assert_eq!(
            serde_json::to_value(create_block(BlockKind::Chapter)).unwrap(),
            json!({ "tipo": "capitulo", "titulo": "", "bloques": [] })
        );
        assert_eq!(
            serde_json::to_value(create_block(BlockKind::Paragraph)).unwrap(),
            json!({ "tipo": "parrafo", "texto_html": "", "texto_plano": "" })
        );
        assert_eq!(
            serde_json::to_value(create_block(BlockKind::Table)).unwrap(),
            json!({ "tipo": "tabla", "encabezados": [], "filas": [] })
        );
        assert_eq!(
            serde_json::to_value(create_block(BlockKind::Image)).unwrap(),
            json!({ "tipo": "imagen", "src": "" })
        );
        assert_eq!(
            serde_json::to_value(create_block(BlockKind::Placeholder)).unwrap(),
            json!({ "tipo": "placeholder", "clave": "" })
        );
    }

    #[test]
    fn kinds_parse_from_both_names() {
        for kind in BlockKind::ALL {
            assert_eq!(kind.wire_name().parse::<BlockKind>(), Ok(kind));
        }
        assert_eq!("chapter".parse::<BlockKind>(), Ok(BlockKind::Chapter));
        assert!("tabla_anidada".parse::<BlockKind>().is_err());
    }

    #[test]
    fn decode_tree() {
        let blocks: Vec<Block> = serde_json::from_value(json!([
            {
                "tipo": "capitulo",
                "titulo": "Intro",
                "bloques": [
                    { "tipo": "parrafo", "texto_html": "<p>x</p>", "texto_plano": "x" }
                ]
            },
            { "tipo": "imagen", "src": "a.png", "alt": null },
            { "tipo": "placeholder", "clave": "nombre", "descripcion": "Nombre" }
        ]))
        .unwrap();

        let Block::Chapter(chapter) = &blocks[0] else {
            panic!("expected a chapter, got {:?}", blocks[0]);
        };
        assert_eq!(chapter.title, "Intro");
        assert_eq!(chapter.blocks, vec![Block::Paragraph(Paragraph::new("<p>x</p>"))]);
        assert_eq!(
            blocks[1],
            Block::Image(Image {
                src: "a.png".into(),
                alt: None
            })
        );
        assert_eq!(blocks[2].kind(), Some(BlockKind::Placeholder));
    }

    #[test]
    fn corrupted_blocks_are_contained() {
        let raw = json!([
            null,
            { "titulo": "sin tipo" },
            { "tipo": "video", "src": "a.mp4" },
            { "tipo": "capitulo", "titulo": 42 },
            { "tipo": "capitulo", "titulo": "ok", "bloques": [7] }
        ]);
        let blocks: Vec<Block> = serde_json::from_value(raw.clone()).unwrap();

        assert!(blocks[..4].iter().all(Block::is_corrupt));
        let Block::Chapter(chapter) = &blocks[4] else {
            panic!("expected a chapter, got {:?}", blocks[4]);
        };
        assert_eq!(chapter.blocks, vec![Block::Corrupt(json!(7))]);

        // corrupted blocks are written back untouched
        assert_eq!(serde_json::to_value(&blocks).unwrap(), raw);
    }

    #[test]
    fn null_fields_decode_as_empty() {
        let blocks: Vec<Block> = serde_json::from_value(json!([
            { "tipo": "parrafo", "texto_html": "<p>Cuerpo</p>", "texto_plano": null },
            { "tipo": "capitulo", "titulo": "Intro", "bloques": null },
            { "tipo": "subcapitulo", "titulo": null },
            { "tipo": "tabla", "encabezados": null, "filas": [null, ["a"]] },
            { "tipo": "imagen", "src": null, "alt": "Logo" },
            { "tipo": "placeholder", "clave": null }
        ]))
        .unwrap();

        assert!(!blocks.iter().any(Block::is_corrupt), "{blocks:?}");
        let Block::Paragraph(paragraph) = &blocks[0] else {
            panic!("expected a paragraph, got {:?}", blocks[0]);
        };
        assert_eq!(paragraph.html, "<p>Cuerpo</p>");
        assert_eq!(paragraph.plain_text, "");
        assert_eq!(blocks[1], Block::Chapter(Section::new("Intro")));
        assert_eq!(blocks[2], Block::Subchapter(Section::default()));
        let Block::Table(table) = &blocks[3] else {
            panic!("expected a table, got {:?}", blocks[3]);
        };
        assert!(table.headers.is_empty());
        assert_eq!(table.rows, vec![vec![], vec![Cell::from("a")]]);
        assert_eq!(
            blocks[4],
            Block::Image(Image {
                src: EcoString::new(),
                alt: Some("Logo".into())
            })
        );
        assert_eq!(blocks[5], Block::Placeholder(Placeholder::default()));
    }

    #[test]
    fn decode_cells() {
        let table: Table = serde_json::from_value(json!({
            "encabezados": ["A", { "text": "B", "colSpan": 2 }],
            "filas": [[
                "x",
                3.5,
                { "text": 12, "rowSpan": 0 },
                { "tipo": "tabla_anidada", "tabla": { "tipo": "tabla", "encabezados": ["n"], "filas": [] }, "colSpan": 2 },
                { "tipo": "tabla_anidada", "tabla": "roto" },
                true
            ]]
        }))
        .unwrap();

        assert!(table.has_grouped_headers());
        let row = &table.rows[0];
        assert_eq!(row[0], Cell::Plain("x".into()));
        assert!(matches!(row[1], Cell::Number(_)));
        assert_eq!(
            row[2],
            Cell::Spanned {
                text: "12".into(),
                span: Span::default()
            }
        );
        let Cell::Nested { table: nested, span } = &row[3] else {
            panic!("expected a nested table, got {:?}", row[3]);
        };
        assert_eq!(nested.headers, vec![Cell::from("n")]);
        assert_eq!(span.col_span(), 2);
        assert!(matches!(row[4], Cell::Raw(_)));
        assert_eq!(row[5].text().as_deref(), Some("true"));
    }

    #[test]
    fn encode_cells() {
        let cells = vec![
            Cell::Spanned {
                text: "T".into(),
                span: Span {
                    cols: Some(2),
                    rows: None,
                },
            },
            Cell::Nested {
                table: Box::default(),
                span: Span::default(),
            },
        ];
        assert_eq!(
            serde_json::to_value(&cells).unwrap(),
            json!([
                { "text": "T", "colSpan": 2 },
                { "tipo": "tabla_anidada", "tabla": { "tipo": "tabla", "encabezados": [], "filas": [] } }
            ])
        );
    }
}
