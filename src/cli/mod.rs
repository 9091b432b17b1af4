mod build;
mod get;
mod init;
mod serve;
mod update;

use crate::console::Console;
use crate::error::{ErrorKind, Result};
use crate::prompt::Terminal;
use clap::{Parser, Subcommand};
use exn::ResultExt;
use kure_repo::{FetchHandle, HttpFetcher};
use kure_workspace::Workspace;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "kure", about = "Maintain a private CKAN repository from a local netkan workspace", version)]
pub struct Cli {
    /// Show what is being done, and debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Disable coloured output
    #[arg(short = 'N', long, global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new workspace
    Init(init::InitArgs),
    /// Mirror the configured repositories, or download the compiler
    Update(update::UpdateArgs),
    /// Copy a package from the repository cache into the workspace
    Get(get::GetArgs),
    /// Build ckan packages from local/netkan
    Build(build::BuildArgs),
    /// Pack local/ckan and serve it to CKAN clients
    Serve(serve::ServeArgs),
}

pub fn run(command: Command, console: &Console) -> Result<()> {
    let workspace = || Workspace::open(".").or_raise(|| ErrorKind::Workspace);
    let fetcher = || -> Result<FetchHandle> { Ok(Arc::new(HttpFetcher::new().or_raise(|| ErrorKind::Client)?)) };
    match command {
        Command::Init(args) => init::run(&args, console),
        Command::Update(args) => update::run(&args, &workspace()?, console, fetcher()?),
        Command::Get(args) => get::run(&args, &workspace()?, console, &Terminal, fetcher()?),
        Command::Build(args) => build::run(&args, &workspace()?, console),
        Command::Serve(args) => serve::run(&args, &workspace()?, console),
    }
}
