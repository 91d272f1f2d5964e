use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// A unified interface to the native package manager of this system
#[derive(Parser, Debug)]
#[clap(about, version, author)]
pub struct Args {
    #[clap(subcommand)]
    pub subcommand: Option<PkgsCommand>,
    /// Automatic yes to prompts; run non-interactively
    #[arg(short, long, global = true, env = "PKGS_YES", action = ArgAction::SetTrue, value_parser = parse_truthy)]
    pub yes: bool,
    /// Print debug messages
    #[arg(short, long, global = true)]
    pub debug: bool,
    /// Operate on repository files below this directory instead of /
    #[arg(long, global = true, env = "PKGS_ROOT", hide = true, default_value = "/")]
    pub root: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum PkgsCommand {
    /// Install packages
    #[clap(visible_aliases = ["i", "in", "add"])]
    Install(Packages),
    /// Reinstall packages
    Reinstall(Packages),
    /// Remove packages
    #[clap(visible_aliases = ["rm", "uninstall"])]
    Remove(Packages),
    /// Search for packages
    Search(Query),
    /// Show package details
    Info(Packages),
    /// Refresh package lists
    Update,
    /// Upgrade installed packages
    Upgrade,
    /// Remove packages that are no longer needed
    Autoremove,
    /// Clean the package cache
    Clean,
    /// Show which package manager is being used
    Which(Which),
    /// Add a repository to the system package manager
    AddRepo(AddRepo),
    /// Add a repository signing key
    AddKey(AddKey),
    /// Enable a repository
    EnableRepo(RepoName),
    /// Disable a repository
    DisableRepo(RepoName),
    /// List all repositories and their status
    ListRepos,
}

#[derive(Parser, Debug)]
pub struct Packages {
    #[clap(required = true, num_args = 1..)]
    pub packages: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct Query {
    #[clap(required = true, num_args = 1..)]
    pub query: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct Which {
    /// Output only the package manager name
    #[clap(short, long)]
    pub simple: bool,
    /// Output the package manager description as JSON
    #[clap(long, conflicts_with = "simple")]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct AddRepo {
    /// [NAME] URL; NAME may be omitted for dnf/yum .repo URLs and Homebrew taps
    #[clap(required = true, num_args = 1..=2, value_names = ["NAME", "URL"])]
    pub args: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct AddKey {
    /// [NAME] URL; NAME may be omitted on Alpine Linux
    #[clap(required = true, num_args = 1..=2, value_names = ["NAME", "URL"])]
    pub args: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct RepoName {
    /// Repository name or id
    pub name: String,
}

fn parse_truthy(s: &str) -> Result<bool, String> {
    Ok(matches!(
        s.to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "true"
    ))
}
