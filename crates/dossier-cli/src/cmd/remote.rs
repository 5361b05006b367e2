use std::path::Path;

use anyhow::Context;
use dossier_api::{Client, DocumentFromTemplate, annexes};
use dossier_template::{Submission, Template, filter_by_name};

use crate::args::{
    ApiArgs, DocumentsArgs, FromTemplateArgs, IdArgs, ListArgs, PushArgs, ShowArgs,
};
use crate::config;
use crate::file::{TemplateFile, write_output};

fn connect(args: &ApiArgs) -> anyhow::Result<Client> {
    let options = config::resolve(args)?;
    Client::new(&options).with_context(|| format!("cannot reach {}", options.base_url))
}

/// Lists the stored templates.
pub fn list_main(args: ListArgs) -> anyhow::Result<()> {
    let templates = connect(&args.api)?
        .list_templates()
        .context("failed to list templates")?;

    let shown = match args.search.as_deref() {
        Some(query) => filter_by_name(&templates, query),
        None => templates.iter().collect(),
    };
    if shown.is_empty() {
        eprintln!("No se encontraron plantillas");
    }
    for template in shown {
        println!("{}", template_row(template));
    }
    Ok(())
}

fn template_row(template: &Template) -> String {
    let author = template
        .created_by
        .as_ref()
        .map_or("N/A", |user| user.username.as_str());
    let created = template.created_at.as_deref().unwrap_or("-");
    format!(
        "{}\t{}\t{}\t{author}\t{created}",
        template.id,
        template.name(),
        template.file_type_label()
    )
}

/// Downloads a stored template.
pub fn show_main(args: ShowArgs) -> anyhow::Result<()> {
    let template = connect(&args.api)?
        .get_template(&args.id)
        .with_context(|| format!("failed to fetch template {}", args.id))?;

    if args.output == "-" {
        return write_output("-", &(serde_json::to_string_pretty(&template)? + "\n"));
    }
    TemplateFile::from_template(Path::new(&args.output), &template)?.save()
}

/// Creates or updates a stored template from a file.
pub fn push_main(args: PushArgs) -> anyhow::Result<()> {
    let file = TemplateFile::open(&args.file)?;
    let id = if args.create {
        None
    } else {
        args.id.map(Into::into).or_else(|| file.id())
    };

    let submission = match id {
        Some(id) => Submission::Update {
            id,
            draft: file.draft.clone(),
        },
        None => Submission::Create(file.draft.clone()),
    };
    let saved = connect(&args.api)?
        .submit(&submission)
        .with_context(|| format!("failed to push {}", args.file.display()))?;

    TemplateFile::from_template(file.path(), &saved)?.save()?;
    match submission {
        Submission::Create(_) => println!("Plantilla creada: {}", saved.id),
        Submission::Update { .. } => println!("Plantilla actualizada: {}", saved.id),
    }
    Ok(())
}

/// Deletes a stored template.
pub fn delete_main(args: IdArgs) -> anyhow::Result<()> {
    connect(&args.api)?
        .delete_template(&args.id)
        .with_context(|| format!("failed to delete template {}", args.id))?;
    println!("Plantilla eliminada: {}", args.id);
    Ok(())
}

/// Duplicates a stored template.
pub fn duplicate_main(args: IdArgs) -> anyhow::Result<()> {
    let copy = connect(&args.api)?
        .duplicate_template(&args.id)
        .with_context(|| format!("failed to duplicate template {}", args.id))?;
    println!("{}", template_row(&copy));
    Ok(())
}

/// Lists the stored documents.
pub fn documents_main(args: DocumentsArgs) -> anyhow::Result<()> {
    let documents = connect(&args.api)?
        .list_documents()
        .context("failed to list documents")?;

    let shown = if args.annexes {
        annexes(&documents)
    } else {
        documents.iter().collect()
    };
    for document in shown {
        let kind = serde_json::to_value(document.kind)?;
        let module = document.module.as_ref().map_or("-", |module| module.title.as_str());
        println!(
            "{}\t{}\t{}\tv{}\t{module}",
            document.id,
            document.name,
            kind.as_str().unwrap_or_default(),
            document.version
        );
    }
    Ok(())
}

/// Creates a document from a stored template.
pub fn from_template_main(args: FromTemplateArgs) -> anyhow::Result<()> {
    let request = DocumentFromTemplate {
        module_id: args.module.into(),
        name: args.name.into(),
        kind: args.kind,
        annexes: args.annexes.into_iter().map(Into::into).collect(),
    };
    let document = connect(&args.api)?
        .create_document_from_template(&args.template, &request)
        .with_context(|| format!("failed to create a document from {}", args.template))?;
    println!("Documento creado: {} ({})", document.name, document.id);
    Ok(())
}

/// Turns a stored document into a template.
pub fn generate_template_main(args: IdArgs) -> anyhow::Result<()> {
    let generated = connect(&args.api)?
        .generate_template(&args.id)
        .with_context(|| format!("failed to generate a template from {}", args.id))?;
    println!("{}", generated.message);
    println!("{}\t{}", generated.template_id, generated.name);
    Ok(())
}
