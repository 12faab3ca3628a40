//! Command-line front end for the annolite store.
//!
//! # Responsibility
//! - Map subcommands onto `annolite_core::Workspace` calls.
//! - Print results as JSON on stdout, failures on stderr.

use annolite_core::service::record_service::{self, ImageLabel};
use annolite_core::{
    default_log_level, init_logging, ImageLabelConfig, ImportOptions, NewProject, ProjectGraph,
    SplitStrategy, Workspace,
};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde_json::{json, Value};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "annolite")]
#[command(version, about = "Text and image annotation store")]
#[command(propagate_version = true)]
struct Cli {
    /// Store root holding annolite.db, data/ and exports/.
    #[arg(long, env = "ANNOLITE_ROOT", default_value = ".")]
    root: PathBuf,

    /// Log level (trace|debug|info|warn|error).
    #[arg(long, env = "ANNOLITE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the Demo project, annotate one text and export it.
    Demo,
    /// List projects.
    Projects,
    /// Import text files as documents.
    Import(ImportArgs),
    /// Export a project to jsonl, tsv or csv.
    Export(ExportArgs),
    /// Dump or load a project's full annotation graph.
    #[command(subcommand)]
    Sync(SyncCommand),
    /// Append one JSON value to a project's record file.
    Record(RecordArgs),
    /// Image labeling.
    #[command(subcommand)]
    Image(ImageCommand),
}

#[derive(Args)]
struct ImportArgs {
    #[arg(long)]
    project: i64,
    /// as_is, paragraph, sentence or length.
    #[arg(long, default_value = "sentence")]
    strategy: String,
    /// Chunk size for the length strategy.
    #[arg(long)]
    fixed_length: Option<usize>,
    /// Encoding label; sniffed when omitted.
    #[arg(long)]
    encoding: Option<String>,
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct ExportArgs {
    #[arg(long)]
    project: i64,
    #[arg(long, default_value = "jsonl")]
    format: String,
    /// Only export these document ids.
    #[arg(long = "doc")]
    doc_ids: Vec<i64>,
}

#[derive(Subcommand)]
enum SyncCommand {
    /// Print the project graph as JSON.
    Dump {
        #[arg(long)]
        project: i64,
    },
    /// Save a project graph read from a JSON file.
    Load {
        #[arg(long)]
        project: i64,
        input: PathBuf,
    },
}

#[derive(Args)]
struct RecordArgs {
    #[arg(long)]
    project: i64,
    /// JSON value to append.
    value: String,
}

#[derive(Args)]
struct ImageDirArgs {
    #[arg(long)]
    image_dir: Option<PathBuf>,
    #[arg(long)]
    jsonl: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ImageCommand {
    /// List images and which ones are already labeled.
    List(ImageDirArgs),
    /// Save one image label.
    Label {
        #[command(flatten)]
        dirs: ImageDirArgs,
        #[arg(long)]
        image: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        assistant: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult {
    let root = std::path::absolute(&cli.root)?;
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    init_logging(level, &root.join("logs"))?;
    info!("event=cli_start module=cli status=ok");

    let workspace = Workspace::at_root(&root);
    match cli.command {
        Commands::Demo => run_demo(&workspace),
        Commands::Projects => print_json(&workspace.list_projects()?),
        Commands::Import(args) => run_import(&workspace, args),
        Commands::Export(args) => {
            let doc_ids = (!args.doc_ids.is_empty()).then_some(args.doc_ids.as_slice());
            let path = workspace.export_project(args.project, &args.format, doc_ids)?;
            print_json(&json!({ "path": path }))
        }
        Commands::Sync(SyncCommand::Dump { project }) => {
            print_json(&workspace.load_project_data(project)?)
        }
        Commands::Sync(SyncCommand::Load { project, input }) => {
            let raw = std::fs::read_to_string(&input)?;
            let graph: ProjectGraph = serde_json::from_str(&raw)?;
            print_json(&workspace.save_project_data(project, &graph)?)
        }
        Commands::Record(args) => {
            let value: Value = serde_json::from_str(&args.value)?;
            let path = workspace.append_record(args.project, &value)?;
            print_json(&json!({ "success": true, "path": path }))
        }
        Commands::Image(command) => run_image(&root, command),
    }
}

fn run_demo(workspace: &Workspace) -> CliResult {
    let project = workspace.ensure_project(NewProject::new(
        "Demo",
        vec!["PER".to_string(), "LOC".to_string()],
    ))?;
    let documents = workspace.import_texts(project.id, vec!["Mike lives in America.".to_string()])?;
    let mut span_ids = Vec::new();
    for document in &documents {
        span_ids.push(workspace.add_span(document.id, 0, 4, "PER")?.id);
        span_ids.push(workspace.add_span(document.id, 15, 22, "LOC")?.id);
    }
    let jsonl = workspace.export_project(project.id, "jsonl", None)?;
    let tsv = workspace.export_project(project.id, "tsv", None)?;

    print_json(&json!({
        "project": project,
        "docs": documents.iter().map(|document| document.id).collect::<Vec<_>>(),
        "annotations": span_ids,
        "jsonl": jsonl,
        "tsv": tsv,
    }))
}

fn run_import(workspace: &Workspace, args: ImportArgs) -> CliResult {
    let options = ImportOptions {
        strategy: args.strategy.parse::<SplitStrategy>()?,
        fixed_length: args.fixed_length,
        encoding: args.encoding,
    };
    let documents = workspace.import_txt_files(args.project, args.files.as_slice(), &options)?;
    print_json(&json!({
        "count": documents.len(),
        "ids": documents.iter().map(|document| document.id).collect::<Vec<_>>(),
    }))
}

fn run_image(root: &Path, command: ImageCommand) -> CliResult {
    match command {
        ImageCommand::List(dirs) => {
            let config = image_config(root, dirs)?;
            print_json(&record_service::list_images(&config)?)
        }
        ImageCommand::Label {
            dirs,
            image,
            user,
            assistant,
        } => {
            let config = image_config(root, dirs)?;
            let label = ImageLabel {
                image,
                user_content: user,
                assistant_content: assistant,
            };
            record_service::save_image_label(&config, &label)?;
            print_json(&json!({ "status": "success" }))
        }
    }
}

fn image_config(root: &Path, dirs: ImageDirArgs) -> Result<ImageLabelConfig, Box<dyn Error>> {
    let defaults = ImageLabelConfig::unchecked_defaults(root);
    let image_dir = dirs
        .image_dir
        .unwrap_or_else(|| defaults.image_dir().to_path_buf());
    let jsonl = dirs
        .jsonl
        .unwrap_or_else(|| defaults.jsonl_path().to_path_buf());
    Ok(ImageLabelConfig::new(image_dir, jsonl)?)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
