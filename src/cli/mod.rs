pub mod args;
pub mod commands;

pub use args::{CheckArgs, DotArgs, InspectArgs, LayoutArgs, StatusArgs};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
WORKFLOW COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "dagboard")]
#[command(version = crate::VERSION)]
#[command(about = "Workflow DAG editing core: validate, lay out and inspect workflow definitions")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: inspect a definition, check its dependencies, re-layout it, then watch an instance run."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(
        about = "Summarize a workflow definition",
        long_about = "Inspect loads a workflow definition JSON into the graph model and prints its tasks, dependencies and start tasks.",
        after_help = "Example:\n    dagboard inspect ./nightly.json --json"
    )]
    Inspect(InspectArgs),
    #[command(
        about = "Validate every dependency of a workflow definition",
        long_about = "Check replays each relation through the connection rules (no self-loops, no duplicates, no cycles, at most two branches per CONDITIONS task) and exits non-zero when any is rejected.",
        after_help = "Example:\n    dagboard check ./nightly.json"
    )]
    Check(CheckArgs),
    #[command(
        about = "Re-layout a workflow and emit its save payload",
        long_about = "Layout applies the grid or layered layout to the loaded graph and prints the save payload (taskDefinitions, saveForm, connects, locations) as JSON.",
        after_help = "Example:\n    dagboard layout ./nightly.json --kind grid --cols 3 --output payload.json"
    )]
    Layout(LayoutArgs),
    #[command(
        about = "Render a workflow as Graphviz DOT",
        long_about = "Dot prints the dependency graph in DOT format, optionally annotated with the task states of a workflow instance.",
        after_help = "Example:\n    dagboard dot ./nightly.json | dot -Tsvg > nightly.svg"
    )]
    Dot(DotArgs),
    #[command(
        about = "Show task states of a workflow instance",
        long_about = "Status queries the backend for the task instances of a workflow instance and prints one status per task. With --watch it keeps polling until interrupted.",
        after_help = "Example:\n    dagboard status --instance 1207 --definition 9921 --watch"
    )]
    Status(StatusArgs),
}

impl Command {
    /// Workspace directory of the command, defaulting to the current directory.
    pub fn workspace(&self) -> Option<PathBuf> {
        let explicit = match self {
            Command::Inspect(args) => args.workspace.clone(),
            Command::Check(args) => args.workspace.clone(),
            Command::Layout(args) => args.workspace.clone(),
            Command::Dot(args) => args.workspace.clone(),
            Command::Status(args) => args.workspace.clone(),
        };
        explicit.or_else(|| env::current_dir().ok())
    }
}

pub async fn run(args: Args) -> crate::Result<()> {
    let workspace = args.command.workspace().unwrap_or_else(|| PathBuf::from("."));
    match args.command {
        Command::Inspect(inspect_args) => commands::inspect(inspect_args, &workspace).await,
        Command::Check(check_args) => commands::check(check_args, &workspace).await,
        Command::Layout(layout_args) => commands::layout(layout_args, &workspace).await,
        Command::Dot(dot_args) => commands::dot(dot_args, &workspace).await,
        Command::Status(status_args) => commands::status(status_args, &workspace).await,
    }
}
