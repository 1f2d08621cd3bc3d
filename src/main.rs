//! stagediff - Terminal client for staging changes with a side-by-side diff
//!
//! Shows the changed files of a git working tree as a collapsible tree,
//! the selected file's diff as two aligned columns, and lets you stage,
//! unstage and commit without leaving the terminal.

mod app;
mod config;
mod diff;
mod git;
mod logger;
mod navigator;
mod status;
mod syntax;
mod tree;
mod tui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::app::App;
use crate::config::Config;
use crate::diff::LineKind;
use crate::git::{find_repo_root, DiffTarget, GitClient, GitCommandLine};
use crate::tree::{FileTree, Node, StagedStatus};

#[derive(Parser)]
#[command(name = "stagediff")]
#[command(about = "Stage changes and review side-by-side diffs in the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run as if started in this directory
    #[arg(short = 'C', global = true)]
    directory: Option<PathBuf>,

    /// Disable syntax highlighting
    #[arg(long, global = true)]
    no_syntax: bool,

    /// Syntax theme name (bat/syntect theme)
    #[arg(long, global = true)]
    theme: Option<String>,

    /// Lines of context around each change
    #[arg(short = 'U', long = "context", global = true)]
    context: Option<u32>,

    /// Do not write a log file
    #[arg(long, global = true)]
    no_log: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the change tree with staged status
    Status,

    /// Print the side-by-side diff of one file
    Diff {
        /// File path (relative to repo root)
        path: String,

        /// Show the staged diff instead of the working tree diff
        #[arg(long)]
        staged: bool,
    },

    /// Write a default config file to ~/.stagediff/config.toml
    InitConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?.with_overrides(cli.no_syntax, cli.theme, cli.context);

    if !cli.no_log {
        match logger::init(config.log_level.as_deref()) {
            Ok(path) => log::info!("stagediff {} logging to {}", env!("CARGO_PKG_VERSION"), path.display()),
            Err(e) => eprintln!("Warning: logging disabled: {e:#}"),
        }
    }

    match cli.command {
        None => {
            let git = open_repo(cli.directory, &config)?;
            log::info!("Opening {}", git.repo_path().display());
            tui::run(App::new(git, config))
        }
        Some(Commands::Status) => cmd_status(&open_repo(cli.directory, &config)?),
        Some(Commands::Diff { path, staged }) => {
            cmd_diff(&open_repo(cli.directory, &config)?, &path, staged, config.tab_width)
        }
        Some(Commands::InitConfig) => cmd_init_config(),
    }
}

fn open_repo(directory: Option<PathBuf>, config: &Config) -> Result<GitCommandLine> {
    let start = match directory {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let repo_path = find_repo_root(&start)?;
    Ok(GitCommandLine::new(repo_path, config.context_lines))
}

fn load_tree(git: &impl GitClient) -> Result<(FileTree, status::BranchInfo)> {
    let parsed = status::parse_status(&git.status()?);
    Ok((FileTree::from_entries(&parsed.entries), parsed.branch))
}

fn cmd_status(git: &GitCommandLine) -> Result<()> {
    let (tree, branch) = load_tree(git)?;

    if let Some(head) = &branch.head {
        match &branch.upstream {
            Some(upstream) => println!(
                "On {} (tracking {}, +{} -{})",
                head, upstream, branch.ahead, branch.behind
            ),
            None => println!("On {}", head),
        }
    }

    if tree.is_empty() {
        println!("No changes");
        return Ok(());
    }

    for row in navigator::flatten(&tree) {
        let indent = "  ".repeat(row.depth.saturating_sub(1));
        match tree.node(row.id) {
            Some(Node::Directory(dir)) => {
                let label = match tree.staged_status(row.id) {
                    StagedStatus::FullyStaged => "staged",
                    StagedStatus::PartiallyStaged => "partial",
                    StagedStatus::Unstaged => "unstaged",
                };
                println!("{}{}/ [{}]", indent, dir.name, label);
            }
            Some(Node::File(file)) => {
                println!("{}{} {}", indent, file.status_code(), file.display_name());
            }
            None => {}
        }
    }

    Ok(())
}

fn cmd_diff(git: &GitCommandLine, path: &str, staged: bool, tab_width: usize) -> Result<()> {
    let (tree, _) = load_tree(git)?;
    let file = tree.find(path).and_then(|id| tree.file(id));
    let target = match file {
        _ if staged => DiffTarget::Staged,
        Some(file) if file.is_untracked() => DiffTarget::Untracked,
        Some(file) if file.is_unmerged() => DiffTarget::Unmerged,
        _ => DiffTarget::Unstaged,
    };
    let rename_from = file.and_then(|f| f.rename_from.as_deref());

    let raw = git
        .diff(path, rename_from, target)
        .with_context(|| format!("Failed to diff {}", path))?;
    let mut aligned = diff::align(&raw);

    if aligned.is_empty() {
        println!("No changes in {}", path);
        return Ok(());
    }
    aligned.expand_tabs(tab_width);

    let width = crossterm::terminal::size()
        .map(|(w, _)| w as usize)
        .unwrap_or(160);
    // symbol and space on each side plus the separator
    let column = width.saturating_sub(7) / 2;

    for (left, right) in aligned.left.iter().zip(&aligned.right) {
        println!(
            "{} {} │ {} {}",
            symbol(left.kind),
            tui::fit_to_width(&left.content, column),
            symbol(right.kind),
            tui::fit_to_width(&right.content, column)
        );
    }

    Ok(())
}

fn symbol(kind: LineKind) -> char {
    match kind {
        LineKind::Removal => '-',
        LineKind::Addition => '+',
        LineKind::Neutral | LineKind::Blank => ' ',
    }
}

fn cmd_init_config() -> Result<()> {
    let path = Config::default_path();
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    Config::create_default(&path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
