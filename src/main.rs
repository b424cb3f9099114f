//! CLI entry point for `schema2hasura`.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use schema2hasura::generator::manifest::ManifestBuilder;
use schema2hasura::output::{report, writer};
use schema2hasura::schema::document::Project;
use schema2hasura::{logging, Result};

#[derive(Parser)]
#[command(
    name = "schema2hasura",
    about = "Generate Hasura metadata with role-inherited permissions from an entity registry"
)]
struct Cli {
    /// Registry document (JSON)
    registry: PathBuf,

    /// Manifest destination; defaults to `<base_dir>/../hasura/hasura_metadata_exported.json`
    #[arg(long)]
    export_path: Option<PathBuf>,

    /// Also write a Markdown permission report
    #[arg(long)]
    report: Option<PathBuf>,

    /// Indent the manifest
    #[arg(long)]
    pretty: bool,

    /// Print verbose diagnostics
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    println!("Start generate_hasura_metadata");
    match run(&cli) {
        Ok(path) => println!("Hasura metadata exported to {}", path.display()),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    }
}

fn run(cli: &Cli) -> Result<PathBuf> {
    let project = Project::load(&cli.registry)?;

    let export_path = match &cli.export_path {
        Some(path) => path.clone(),
        None => {
            let registry_dir = cli
                .registry
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            project.settings.default_export_path(registry_dir)
        }
    };

    let manifest = ManifestBuilder::new(&project).build()?;
    writer::write_manifest(&export_path, &manifest.metadata, cli.pretty)?;

    if let Some(report_path) = &cli.report {
        writer::write_report(report_path, &report::build_report(&manifest))?;
    }

    Ok(export_path)
}
