//! crdform CLI - manage Kubernetes custom resources as Terraform-style resources

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod display;
mod error;
mod exit_codes;
mod plan;
mod state;

use commands::read::OutputFormat;
use context::GlobalArgs;

#[derive(Parser)]
#[command(name = "crdform")]
#[command(author = "crdform Contributors")]
#[command(version)]
#[command(about = "Terraform-style resources for Kubernetes CustomResourceDefinitions", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the resource types generated from CRDs
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },

    /// Validate plan files against their schemas
    Validate {
        /// Plan files
        #[arg(required = true)]
        plans: Vec<PathBuf>,

        /// Output validation results as JSON
        #[arg(long)]
        json: bool,

        /// Strict mode - treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Render manifest plans to YAML without a cluster
    Manifest {
        /// Plan files of `_manifest` types
        #[arg(required = true)]
        plans: Vec<PathBuf>,

        /// Write the documents to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create or update objects from plan files
    Apply {
        /// Plan files
        #[arg(required = true)]
        plans: Vec<PathBuf>,

        /// Number of plans applied concurrently
        #[arg(short = 'j', long, default_value_t = commands::apply::DEFAULT_PARALLELISM)]
        parallelism: usize,
    },

    /// Read a live object, status included
    Read {
        /// Resource type name
        type_name: String,

        /// Object identifier (<namespace>/<name>)
        id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "yaml")]
        output: OutputFormat,
    },

    /// Delete an object and its local state
    Delete {
        /// Resource type name
        type_name: String,

        /// Object identifier (<namespace>/<name>)
        id: String,

        /// Keep the local state file
        #[arg(long)]
        keep_state: bool,
    },

    /// Import an existing object into local state
    Import {
        /// Resource type name
        type_name: String,

        /// Object identifier (<namespace>/<name>)
        id: String,

        /// Print the imported state
        #[arg(short, long, value_enum)]
        output: Option<OutputFormat>,
    },

    /// Show what apply would change
    Diff {
        /// Plan files
        #[arg(required = true)]
        plans: Vec<PathBuf>,

        /// Fail when any plan has changes
        #[arg(long)]
        exit_code: bool,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// List resource types
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the attributes of a type
    Show {
        /// Resource, data source or manifest type name
        type_name: String,

        /// Show the data source variant
        #[arg(long)]
        data_source: bool,
    },

    /// Check every generated schema
    Check {
        /// Output diagnostics as JSON
        #[arg(long)]
        json: bool,

        /// Strict mode - treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "crdform=debug,crdform_kube=debug,crdform_core=debug"
    } else {
        "crdform=warn,crdform_kube=warn,crdform_core=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with_writer(std::io::stderr)
        .init();

    let global = &cli.global;
    let result = match cli.command {
        Commands::Schema { command } => match command {
            SchemaCommands::List { json } => commands::schema::list(global, json).await,
            SchemaCommands::Show { type_name, data_source } => {
                commands::schema::show(global, &type_name, data_source).await
            }
            SchemaCommands::Check { json, strict } => commands::schema::check(global, json, strict).await,
        },

        Commands::Validate { plans, json, strict } => commands::validate::run(global, &plans, json, strict).await,

        Commands::Manifest { plans, output } => commands::manifest::run(global, &plans, output.as_deref()).await,

        Commands::Apply { plans, parallelism } => commands::apply::run(global, &plans, parallelism).await,

        Commands::Read { type_name, id, output } => commands::read::run(global, &type_name, &id, output).await,

        Commands::Delete {
            type_name,
            id,
            keep_state,
        } => commands::delete::run(global, &type_name, &id, keep_state).await,

        Commands::Import { type_name, id, output } => {
            commands::import::run(global, &type_name, &id, output).await
        }

        Commands::Diff { plans, exit_code } => commands::diff::run(global, &plans, exit_code).await,
    };

    let code = match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{:?}", miette::Report::new(e));
            code
        }
    };
    std::process::exit(code);
}
