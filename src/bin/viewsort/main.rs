mod config;

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use viewsort::organize::Organizer;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Sort experiment CSV and video files into Group/Timepoint/View folders"
)]
pub(crate) struct Args {
    /// Optional source directory or file
    #[arg(value_hint = clap::ValueHint::AnyPath)]
    path: Option<PathBuf>,

    /// Output directory
    #[arg(short = 't', long, value_hint = clap::ValueHint::DirPath)]
    target: Option<PathBuf>,

    /// Keyword identifying side view files
    #[arg(short = 's', long, value_name = "KEYWORD")]
    side: Option<String>,

    /// Keyword identifying ventral view files
    #[arg(short = 'w', long, value_name = "KEYWORD")]
    ventral: Option<String>,

    /// Delimiter before the entity name
    #[arg(short = 'L', long, allow_hyphen_values = true, value_name = "DELIMITER")]
    left: Option<String>,

    /// Delimiter after the entity name
    #[arg(short = 'R', long, allow_hyphen_values = true, value_name = "DELIMITER")]
    right: Option<String>,

    /// Fixed group name for all files
    #[arg(short = 'g', long, requires = "timepoint", conflicts_with_all = ["group_delimiters", "timepoint_delimiters"])]
    group: Option<String>,

    /// Fixed timepoint name for all files
    #[arg(short = 'T', long, requires = "group")]
    timepoint: Option<String>,

    /// Extract group name from file names between these delimiters
    #[arg(long, num_args = 2, allow_hyphen_values = true, value_names = ["LEFT", "RIGHT"], requires = "timepoint_delimiters")]
    group_delimiters: Vec<String>,

    /// Extract timepoint name from file names between these delimiters
    #[arg(long, num_args = 2, allow_hyphen_values = true, value_names = ["LEFT", "RIGHT"], conflicts_with = "timepoint")]
    timepoint_delimiters: Vec<String>,

    /// Group name used when none can be determined
    #[arg(short = 'b', long, value_name = "NAME")]
    default_group: Option<String>,

    /// File extensions to include
    #[arg(short = 'x', long, num_args = 1, action = clap::ArgAction::Append, name = "EXTENSION")]
    extension: Vec<String>,

    /// Include files that match the given pattern
    #[arg(short = 'n', long, num_args = 1, action = clap::ArgAction::Append, name = "INCLUDE")]
    include: Vec<String>,

    /// Exclude files that match the given pattern
    #[arg(short = 'e', long, num_args = 1, action = clap::ArgAction::Append, name = "EXCLUDE")]
    exclude: Vec<String>,

    /// Match keywords case-insensitively
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Treat delimiters as regular expressions
    #[arg(short = 'E', long)]
    regex: bool,

    /// Move files instead of copying
    #[arg(short = 'm', long = "move")]
    move_files: bool,

    /// Skip entities without a ventral view file
    #[arg(long)]
    require_ventral: bool,

    /// Skip entities without a video file
    #[arg(long)]
    require_video: bool,

    /// Recurse into subdirectories (always on with folder context)
    #[arg(short = 'r', long)]
    recurse: bool,

    /// Only print changes without copying or moving files
    #[arg(short = 'p', long)]
    print: bool,

    /// Write a JSON report of the run to this file
    #[arg(short = 'j', long, value_hint = clap::ValueHint::FilePath, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Write a log file to ~/logs/viewsort
    #[arg(short = 'o', long)]
    log: bool,

    /// Enable debug prints
    #[arg(short = 'D', long)]
    debug: bool,

    /// Create shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        viewsort::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"))
    } else {
        let root = viewsort::resolve_input_path(args.path.as_deref())?;
        let config = config::from_args(args)?;
        let report = Organizer::new(root, config)?.run()?;
        if report.has_failures() {
            std::process::exit(1);
        }
        Ok(())
    }
}
