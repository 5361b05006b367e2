//! The `dossier` command-line tool: authors template files locally, renders
//! them to HTML and exchanges them with the dossier API.

mod args;
mod config;
mod file;
mod cmd {
    pub mod edit;
    pub mod remote;
    pub mod render;
}

use clap::Parser;

use crate::args::{CliArguments, Commands};
use crate::cmd::edit::*;
use crate::cmd::remote::*;
use crate::cmd::render::*;

/// The main entry point.
fn main() -> anyhow::Result<()> {
    let args = CliArguments::parse();

    // Starts logging
    let _ = {
        use log::LevelFilter::*;

        let level = if args.verbose { Debug } else { Warn };
        env_logger::builder()
            .filter_level(Warn)
            .filter_module("dossier", level)
            .filter_module("dossier_api", level)
            .filter_module("dossier_preview", level)
            .filter_module("dossier_template", level)
            .try_init()
    };

    match args.command {
        Commands::New(args) => new_main(args),
        Commands::Outline(args) => outline_main(args),
        Commands::Edit(args) => edit_main(args),
        Commands::Sanitize(args) => sanitize_main(args),
        Commands::Preview(args) => preview_main(args),
        Commands::List(args) => list_main(args),
        Commands::Show(args) => show_main(args),
        Commands::Push(args) => push_main(args),
        Commands::Delete(args) => delete_main(args),
        Commands::Duplicate(args) => duplicate_main(args),
        Commands::Documents(args) => documents_main(args),
        Commands::FromTemplate(args) => from_template_main(args),
        Commands::GenerateTemplate(args) => generate_template_main(args),
    }
}
