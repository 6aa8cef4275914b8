use crate::core::dag::layout::LayoutKind;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Workflow definition JSON as returned by the process-definition endpoint
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Directory holding dagboard.toml and .dagboard/ (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Workflow definition JSON to validate
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Directory holding dagboard.toml and .dagboard/ (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct LayoutArgs {
    /// Workflow definition JSON to lay out
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Directory holding dagboard.toml and .dagboard/ (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Layout algorithm, grid or dagre (default: from config)
    #[arg(long, value_name = "KIND", help_heading = "Layout Overrides")]
    pub kind: Option<LayoutKind>,

    /// Grid columns
    #[arg(long, value_name = "N", help_heading = "Layout Overrides")]
    pub cols: Option<usize>,

    /// Grid rows, used when no column count is given
    #[arg(long, value_name = "N", help_heading = "Layout Overrides")]
    pub rows: Option<usize>,

    /// Write the save payload here instead of stdout
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct DotArgs {
    /// Workflow definition JSON to render
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Directory holding dagboard.toml and .dagboard/ (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Annotate tasks with the states of this workflow instance
    #[arg(long, value_name = "ID")]
    pub instance: Option<i64>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Workflow instance whose task states are shown
    #[arg(long, value_name = "ID")]
    pub instance: i64,

    /// Workflow definition code; when given, tasks are shown in graph order
    #[arg(long, value_name = "CODE")]
    pub definition: Option<i64>,

    /// Keep polling at the configured interval until interrupted
    #[arg(long)]
    pub watch: bool,

    /// Directory holding dagboard.toml and .dagboard/ (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,
}
