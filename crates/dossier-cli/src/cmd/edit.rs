use std::fmt::Write as _;

use anyhow::{Context, bail};
use dossier_template::editor::append_block;
use dossier_template::{
    Block, BlockPath, Cell, Edit, EditSession, Image, Table, TemplateDraft, load_image,
};
use ecow::{EcoString, eco_format};

use crate::args::{EditArgs, EditCommands, FileArgs, NewArgs};
use crate::file::TemplateFile;

/// Creates a template file with no blocks.
pub fn new_main(args: NewArgs) -> anyhow::Result<()> {
    if args.file.exists() && !args.force {
        bail!("{} already exists, pass --force to overwrite it", args.file.display());
    }

    let mut draft = TemplateDraft::new(args.name);
    draft.description = args.description.into();
    TemplateFile::new(&args.file, draft).save()?;
    log::info!("created {}", args.file.display());
    Ok(())
}

/// Prints the blocks of a template file with their paths.
pub fn outline_main(args: FileArgs) -> anyhow::Result<()> {
    let file = TemplateFile::open(&args.file)?;
    print!("{}", outline(&file.draft.structure.blocks));
    Ok(())
}

/// Applies one edit to a template file.
pub fn edit_main(args: EditArgs) -> anyhow::Result<()> {
    let mut file = TemplateFile::open(&args.file)?;
    let mut session = EditSession::create(file.draft.clone());

    match args.edit {
        EditCommands::AddImage { image, parent, alt } => {
            let src = load_image(&image)
                .with_context(|| format!("cannot use {} as an image", image.display()))?;
            let block = Block::Image(Image {
                src,
                alt: alt.map(Into::into),
            });
            let blocks = append_block(session.blocks(), parent.as_ref(), block)?;
            session.update(|draft| draft.structure.blocks = blocks);
        }
        command => session.apply(&to_edit(command)?)?,
    }

    if session.is_dirty() {
        file.draft = session.draft().clone();
        file.save()?;
    }
    Ok(())
}

fn to_edit(command: EditCommands) -> anyhow::Result<Edit> {
    Ok(match command {
        EditCommands::Add { kind } => Edit::AddBlock(kind),
        EditCommands::AddChild { parent, kind } => Edit::AddChild { parent, kind },
        EditCommands::Remove { path } => Edit::RemoveBlock(path),
        EditCommands::Set { path, json } => {
            let block: Block = serde_json::from_str(&json).context("invalid block JSON")?;
            if block.is_corrupt() {
                bail!("{json} is not a block");
            }
            Edit::UpdateBlock { path, block }
        }
        EditCommands::AddRow { table } => Edit::AddTableRow(table),
        EditCommands::AddColumn { table } => Edit::AddTableColumn(table),
        EditCommands::RemoveRow { table, row } => Edit::RemoveTableRow { table, row },
        EditCommands::RemoveColumn { table, col } => Edit::RemoveTableColumn { table, col },
        EditCommands::SetCell {
            table,
            row,
            col,
            value,
        } => Edit::UpdateTableCell {
            table,
            row,
            col,
            value: value.into(),
        },
        EditCommands::SetHeader { table, col, value } => Edit::UpdateTableHeader {
            table,
            col,
            value: value.into(),
        },
        EditCommands::SetParagraph { path, html } => Edit::UpdateParagraph {
            path,
            html: html.into(),
        },
        EditCommands::AddImage { .. } => bail!("images are appended, not edited"),
    })
}

/// One line per block, indented by depth and prefixed by its path.
pub fn outline(blocks: &[Block]) -> String {
    let mut out = String::new();
    outline_blocks(&mut out, blocks, &BlockPath::default(), 0);
    out
}

fn outline_blocks(out: &mut String, blocks: &[Block], parent: &BlockPath, depth: usize) {
    for (index, block) in blocks.iter().enumerate() {
        let path = parent.clone().child(index);
        let label = label(block);
        let _ = writeln!(out, "{:indent$}{path}  {label}", "", indent = depth * 2);

        match block {
            Block::Chapter(section) | Block::Subchapter(section) => {
                outline_blocks(out, &section.blocks, &path, depth + 1);
            }
            Block::Table(table) => outline_nested(out, table, &path, depth + 1),
            _ => {}
        }
    }
}

fn outline_nested(out: &mut String, table: &Table, path: &BlockPath, depth: usize) {
    for (row, cells) in table.rows.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            if let Cell::Nested { table, .. } = cell {
                let path = path.clone().cell(row, col);
                let label = table_label(table);
                let _ = writeln!(out, "{:indent$}{path}  {label}", "", indent = depth * 2);
                outline_nested(out, table, &path, depth + 1);
            }
        }
    }
}

fn label(block: &Block) -> EcoString {
    let Some(kind) = block.kind() else {
        return "corrupto".into();
    };
    let kind = kind.wire_name();
    match block {
        Block::Chapter(section) | Block::Subchapter(section) => {
            eco_format!("{kind} {:?}", section.title.as_str())
        }
        Block::Paragraph(paragraph) => {
            eco_format!("{kind} {:?}", excerpt(&paragraph.plain_text, 40))
        }
        Block::Table(table) => table_label(table),
        Block::Image(image) => match image.alt.as_deref() {
            Some(alt) if !alt.is_empty() => eco_format!("{kind} {alt:?}"),
            _ => kind.into(),
        },
        Block::Placeholder(placeholder) => eco_format!("{kind} {{{{{}}}}}", placeholder.key),
        Block::Corrupt(_) => "corrupto".into(),
    }
}

fn table_label(table: &Table) -> EcoString {
    eco_format!("tabla {} columnas, {} filas", table.headers.len(), table.rows.len())
}

fn excerpt(text: &str, max: usize) -> EcoString {
    let text = text.trim();
    match text.char_indices().nth(max) {
        Some((end, _)) => eco_format!("{}…", &text[..end]),
        None => text.into(),
    }
}
