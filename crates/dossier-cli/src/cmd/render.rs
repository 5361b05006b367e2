use std::borrow::Cow;
use std::path::Path;

use anyhow::Context;
use dossier_preview::{DiagnosticSeverity, PreviewOptions, render_template};
use dossier_template::{SanitizeOptions, sanitize_with};

use crate::args::{PreviewArgs, SanitizeArgs};
use crate::file::{TemplateFile, write_output};

/// Sanitizes the structure of a template file.
pub fn sanitize_main(args: SanitizeArgs) -> anyhow::Result<()> {
    let mut file = TemplateFile::open(&args.file)?;
    let options = if args.shallow {
        SanitizeOptions::shallow()
    } else {
        SanitizeOptions::default()
    };

    let blocks = sanitize_with(&file.draft.structure.blocks, options)
        .with_context(|| format!("cannot sanitize {}", args.file.display()))?;
    let unrecognized = blocks.iter().filter(|block| block.is_corrupt()).count();
    if unrecognized > 0 {
        log::warn!("kept {unrecognized} unrecognized blocks as they are");
    }
    file.draft.structure.blocks = blocks;

    match args.output.as_deref() {
        None => file.save(),
        Some(output) => write_output(output, &(file.to_json()? + "\n")),
    }
}

/// Renders a template file to HTML.
pub fn preview_main(args: PreviewArgs) -> anyhow::Result<()> {
    let file = TemplateFile::open(&args.file)?;

    let assets_path = args.assets_path.as_deref().map(|path| path.to_string_lossy().into_owned());
    let mut options = PreviewOptions::default().with_assets_path(assets_path);
    if let Some(placeholder) = args.placeholder_image {
        options = options.with_placeholder_image(placeholder);
    }

    let preview = render_template(&file.draft, &options);
    for diagnostic in &preview.diagnostics {
        if diagnostic.severity == DiagnosticSeverity::Warning {
            eprintln!("warning: {diagnostic}");
        }
    }

    if let Some(assets_path) = &args.assets_path {
        write_assets(assets_path, &preview.assets)?;
    }

    let html = if args.standalone {
        standalone_page(&file.draft.name, &preview.html)
    } else {
        preview.html.to_string()
    };
    write_output(&args.output, &html)
}

fn write_assets(dir: &Path, assets: &[dossier_preview::Asset]) -> anyhow::Result<()> {
    if assets.is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).context("failed to create assets directory")?;
    for asset in assets {
        let path = dir.join(asset.name.as_str());
        std::fs::write(&path, &asset.data)
            .with_context(|| format!("failed to write asset {}", path.display()))?;
    }
    log::info!("wrote {} images to {}", assets.len(), dir.display());
    Ok(())
}

fn standalone_page(title: &str, body: &str) -> String {
    let title = html_title(title);
    format!(
        "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

fn html_title(title: &str) -> Cow<'_, str> {
    match title.trim() {
        "" => Cow::Borrowed("Vista previa"),
        title => html_escape::encode_text(title),
    }
}
