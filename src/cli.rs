//! Command-line interface
//!
//! ```text
//! taller new <name>             scaffold a project
//! taller make:model <Name>      add app/Models/<name>.rs
//! taller train <Name>           run the four-stage pipeline
//! ```
//!
//! Every domain error is reported once here and turned into exit code 1.

use std::panic;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;

use crate::app::Application;
use crate::dashboard::Dashboard;
use crate::model::{ModelCatalog, Trainable};
use crate::pipeline::{ChannelSink, PipelineExecutor, ProgressSink, StageError, Summary};
use crate::resolver::TypeResolver;
use crate::scaffold::{self, ProjectScaffolder};

/// Taller command line.
#[derive(Debug, Parser)]
#[command(
    name = "taller",
    version,
    about = "An opinionated, convention-driven framework for ML projects",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Project root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new project with the standard directory structure
    New {
        /// Name of the new project directory
        name: String,
    },
    /// Scaffold a new model source file
    #[command(name = "make:model")]
    MakeModel {
        /// Model type name, e.g. IrisClassifier
        name: String,
    },
    /// Train a model
    Train {
        /// Model type name, e.g. IrisClassifier
        identifier: String,
    },
}

impl Cli {
    /// Execute the parsed command with the given resolvable types and models.
    ///
    /// # Errors
    ///
    /// Only for failures of the runtime itself (a worker task panicking);
    /// domain errors are printed and reported as exit code 1.
    pub async fn run(self, resolver: TypeResolver, models: ModelCatalog) -> anyhow::Result<ExitCode> {
        init_tracing(self.verbose);

        let outcome = match self.command {
            Command::New { name } => new_project(&self.root, &name),
            Command::MakeModel { name } => make_model(&self.root, &name),
            Command::Train { identifier } => {
                let app = match Application::builder(&self.root)
                    .resolver(resolver)
                    .models(models)
                    .build()
                {
                    Ok(app) => app,
                    Err(e) => return Ok(report(&e)),
                };
                train(&app, &identifier).await?.map(|summary| {
                    debug!(
                        model = summary.model(),
                        events = summary.events().len(),
                        "run summary"
                    );
                })
            }
        };

        Ok(match outcome {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => report(&e),
        })
    }
}

/// Parse the process arguments and run.
///
/// This is the whole `main` of the `taller` binary and of every scaffolded
/// project; only the registered types and models differ.
///
/// # Errors
///
/// As [`Cli::run`].
pub async fn main(resolver: TypeResolver, models: ModelCatalog) -> anyhow::Result<ExitCode> {
    Cli::parse().run(resolver, models).await
}

fn report(e: &crate::Error) -> ExitCode {
    debug!(error = ?e, "command failed");
    eprintln!("Error: {e}");
    ExitCode::FAILURE
}

fn new_project(root: &Path, name: &str) -> crate::Result<()> {
    println!("Creating a new project: {name}...");
    let scaffolder = ProjectScaffolder::new(root, name);
    let created = scaffolder.build()?;

    println!("{name}/");
    for path in &created {
        println!("├── {}", path.display());
    }
    println!("\nSuccess! Project {name} created.");
    println!("cd {name} && taller make:model MyModel && cargo run -- train MyModel");
    Ok(())
}

fn make_model(root: &Path, name: &str) -> crate::Result<()> {
    let path = scaffold::make_model(root, name)?;
    println!("Success! Model {name} created at {}.", path.display());
    println!("Registered in {}.", scaffold::REGISTRY_FILE);
    Ok(())
}

/// Runs the pipeline on a blocking worker while the dashboard renders.
///
/// The outer `Result` is for worker failures, the inner one for the run.
async fn train(app: &Application, identifier: &str) -> anyhow::Result<crate::Result<Summary>> {
    let (unit, config) = match app.prepare(identifier) {
        Ok(prepared) => prepared,
        Err(e) => return Ok(Err(e)),
    };

    let dashboard = Dashboard::new(identifier, &config);
    println!("{}", dashboard.header(&config));

    let (sink, rx) = ChannelSink::channel();
    let renderer = tokio::spawn(dashboard.run(rx));

    let executor = PipelineExecutor::new(identifier);
    let outcome = run_pipeline(executor, unit, Arc::new(sink)).await?;
    let dashboard = renderer.await.context("dashboard task panicked")?;

    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => return Ok(Err(e.into())),
    };

    println!("\nTraining completed successfully for {identifier}!");
    print!("{}", dashboard.table());
    Ok(Ok(summary))
}

/// Runs `executor` on a blocking worker.
///
/// Stage panics are already turned into [`StageError`]s by the executor, so
/// the panic hook is swapped for one that only logs at debug level while the
/// worker runs. The previous hook is restored before returning.
async fn run_pipeline(
    executor: PipelineExecutor,
    unit: Box<dyn Trainable>,
    sink: Arc<dyn ProgressSink>,
) -> anyhow::Result<Result<Summary, StageError>> {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|info| debug!(%info, "panic captured by pipeline")));
    let joined = tokio::task::spawn_blocking(move || executor.run(unit, sink)).await;
    panic::set_hook(previous);
    joined.context("pipeline worker panicked")
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
