use std::path::PathBuf;

use dossier_api::DocumentKind;
use dossier_template::{BlockKind, BlockPath};

#[derive(Debug, Clone, clap::Parser)]
#[clap(name = "dossier", author, version, about)]
pub struct CliArguments {
    /// Logs debug messages
    #[clap(long, short, global = true)]
    pub verbose: bool,

    /// Mode of the binary
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::Subcommand)]
#[clap(rename_all = "kebab-case")]
pub enum Commands {
    /// Creates a template file with no blocks
    New(NewArgs),
    /// Prints the blocks of a template file with their paths
    Outline(FileArgs),
    /// Edits the structure of a template file in place
    Edit(EditArgs),
    /// Fills in blank labels and headerless tables
    Sanitize(SanitizeArgs),
    /// Renders a template file to HTML
    Preview(PreviewArgs),

    /// Lists the stored templates
    List(ListArgs),
    /// Downloads a stored template
    Show(ShowArgs),
    /// Creates or updates a stored template from a file
    Push(PushArgs),
    /// Deletes a stored template
    Delete(IdArgs),
    /// Duplicates a stored template
    Duplicate(IdArgs),
    /// Lists the stored documents
    Documents(DocumentsArgs),
    /// Creates a document from a stored template
    FromTemplate(FromTemplateArgs),
    /// Turns a stored document into a template
    GenerateTemplate(IdArgs),
}

/// How to reach the API.
#[derive(Debug, Clone, Default, clap::Parser)]
pub struct ApiArgs {
    /// The root URL of the API
    #[clap(long, env = "DOSSIER_API_URL", value_name = "URL")]
    pub api_url: Option<String>,

    /// A bearer token sent with every request
    #[clap(long, env = "DOSSIER_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Specify the path to a CA certificate file, especially when the API is
    /// served with a self-signed certificate
    #[clap(long, env = "DOSSIER_CERT", value_name = "CERT_PATH")]
    pub cert: Option<PathBuf>,

    /// The configuration file, `dossier.toml` by default
    #[clap(long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, clap::Parser)]
pub struct FileArgs {
    /// The template file
    #[clap(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Debug, Clone, clap::Parser)]
pub struct NewArgs {
    /// The template file to create
    #[clap(value_name = "FILE")]
    pub file: PathBuf,

    /// The template name
    #[clap(long)]
    pub name: String,

    /// The template description
    #[clap(long, default_value = "")]
    pub description: String,

    /// Overwrites an existing file
    #[clap(long)]
    pub force: bool,
}

#[derive(Debug, Clone, clap::Parser)]
pub struct EditArgs {
    /// The template file
    #[clap(value_name = "FILE")]
    pub file: PathBuf,

    /// The edit to apply
    #[clap(subcommand)]
    pub edit: EditCommands,
}

/// Block paths are written as `0/2/r1c0`: indices into block lists, `rNcM`
/// into the nested table of a cell.
#[derive(Debug, Clone, clap::Subcommand)]
#[clap(rename_all = "kebab-case")]
pub enum EditCommands {
    /// Appends an empty top-level block
    Add {
        /// capitulo, subcapitulo, parrafo, tabla, imagen or placeholder
        kind: BlockKind,
    },
    /// Appends an empty block to a chapter or subchapter
    AddChild {
        /// The path of the section
        parent: BlockPath,
        /// The kind of the new block
        kind: BlockKind,
    },
    /// Removes a block
    Remove {
        /// The path of the block
        path: BlockPath,
    },
    /// Replaces a block with a JSON block
    Set {
        /// The path of the block
        path: BlockPath,
        /// The new block, e.g. `{"tipo":"placeholder","clave":"fecha"}`
        json: String,
    },
    /// Appends an empty row to a table
    AddRow {
        /// The path of the table
        table: BlockPath,
    },
    /// Appends a column to a table
    AddColumn {
        /// The path of the table
        table: BlockPath,
    },
    /// Removes a row from a table
    RemoveRow {
        /// The path of the table
        table: BlockPath,
        /// The row index
        row: usize,
    },
    /// Removes a column from a table
    RemoveColumn {
        /// The path of the table
        table: BlockPath,
        /// The column index
        col: usize,
    },
    /// Sets the text of a body cell
    SetCell {
        /// The path of the table
        table: BlockPath,
        /// The row index
        row: usize,
        /// The column index
        col: usize,
        /// The new text
        value: String,
    },
    /// Sets the text of a header cell
    SetHeader {
        /// The path of the table
        table: BlockPath,
        /// The column index
        col: usize,
        /// The new text
        value: String,
    },
    /// Sets the rich text of a paragraph
    SetParagraph {
        /// The path of the paragraph
        path: BlockPath,
        /// The new HTML
        html: String,
    },
    /// Appends an image read from disk
    AddImage {
        /// The image file
        image: PathBuf,
        /// The section receiving the image, the top level by default
        #[clap(long)]
        parent: Option<BlockPath>,
        /// The alternative text
        #[clap(long)]
        alt: Option<String>,
    },
}

#[derive(Debug, Clone, clap::Parser)]
pub struct SanitizeArgs {
    /// The template file
    #[clap(value_name = "FILE")]
    pub file: PathBuf,

    /// Only fills in the labels of top-level blocks
    #[clap(long)]
    pub shallow: bool,

    /// Path to output file, `-` for stdout, the input file by default
    #[clap(long, short, value_name = "OUTPUT")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, clap::Parser)]
pub struct PreviewArgs {
    /// The template file
    #[clap(value_name = "FILE")]
    pub file: PathBuf,

    /// Path to output file, `-` for stdout
    #[clap(long, short, default_value = "-", value_name = "OUTPUT")]
    pub output: String,

    /// Configures the path of assets directory, embedded images are written
    /// there instead of being inlined
    #[clap(long, default_value = None, value_name = "ASSETS_PATH")]
    pub assets_path: Option<PathBuf>,

    /// The graphic shown for images without a source
    #[clap(long, value_name = "URL")]
    pub placeholder_image: Option<String>,

    /// Wraps the fragment in a complete HTML page
    #[clap(long)]
    pub standalone: bool,
}

#[derive(Debug, Clone, clap::Parser)]
pub struct ListArgs {
    #[clap(flatten)]
    pub api: ApiArgs,

    /// Only lists templates whose name contains this text
    #[clap(long, short)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, clap::Parser)]
pub struct ShowArgs {
    #[clap(flatten)]
    pub api: ApiArgs,

    /// The template id
    pub id: String,

    /// Path to output file, `-` for stdout
    #[clap(long, short, default_value = "-", value_name = "OUTPUT")]
    pub output: String,
}

#[derive(Debug, Clone, clap::Parser)]
pub struct PushArgs {
    #[clap(flatten)]
    pub api: ApiArgs,

    /// The template file
    #[clap(value_name = "FILE")]
    pub file: PathBuf,

    /// Updates this template instead of the one recorded in the file
    #[clap(long)]
    pub id: Option<String>,

    /// Always creates a new template
    #[clap(long, conflicts_with = "id")]
    pub create: bool,
}

#[derive(Debug, Clone, clap::Parser)]
pub struct IdArgs {
    #[clap(flatten)]
    pub api: ApiArgs,

    /// The id of the stored record
    pub id: String,
}

#[derive(Debug, Clone, clap::Parser)]
pub struct DocumentsArgs {
    #[clap(flatten)]
    pub api: ApiArgs,

    /// Only lists documents that can be attached as annexes
    #[clap(long)]
    pub annexes: bool,
}

#[derive(Debug, Clone, clap::Parser)]
pub struct FromTemplateArgs {
    #[clap(flatten)]
    pub api: ApiArgs,

    /// The template id
    pub template: String,

    /// The module the document is filed under
    #[clap(long)]
    pub module: String,

    /// The document name
    #[clap(long)]
    pub name: String,

    /// plantilla, anexo, informe or otro
    #[clap(long, default_value = "informe", value_parser = parse_document_kind)]
    pub kind: DocumentKind,

    /// The id of a document attached as annex, may be repeated
    #[clap(long = "annex", value_name = "DOCUMENT_ID")]
    pub annexes: Vec<String>,
}

fn parse_document_kind(kind: &str) -> Result<DocumentKind, String> {
    serde_json::from_value(serde_json::Value::String(kind.to_owned()))
        .ok()
        .filter(|parsed| *parsed != DocumentKind::Other || kind == "otro")
        .ok_or_else(|| format!("unknown document kind: {kind}"))
}
