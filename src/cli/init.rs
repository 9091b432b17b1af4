use crate::console::Console;
use crate::error::{ErrorKind, Result};
use clap::Args;
use exn::ResultExt;
use kure_workspace::Workspace;
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Directory to create the workspace in; must not exist yet
    pub dir: PathBuf,
}

pub fn run(args: &InitArgs, console: &Console) -> Result<()> {
    let layout = Workspace::init(&args.dir).or_raise(|| ErrorKind::Init)?;
    console.detail(format_args!("Configuration written to {}", layout.config_file().display()));
    console.done(format_args!("Workspace {} created", args.dir.display()));
    console.plain("Run `kure update --netkan` and `kure update` from the workspace to download netkan.exe and packages.");
    Ok(())
}
