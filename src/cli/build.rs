use crate::console::Console;
use crate::error::{ErrorKind, Result};
use clap::Args;
use exn::ResultExt;
use kure_build::{CompileOptions, Compiler, NetkanExe};
use kure_workspace::Workspace;
use std::path::PathBuf;

#[derive(Args)]
pub struct BuildArgs {
    /// Sources to build, as paths or names inside local/netkan (default: all of local/netkan)
    pub packages: Vec<PathBuf>,
    /// Ask netkan.exe for verbose output
    #[arg(short = 'V', long)]
    pub verbose_netkan: bool,
    /// Allow prerelease versions
    #[arg(short, long)]
    pub prerelease: bool,
}

pub fn run(args: &BuildArgs, workspace: &Workspace, console: &Console) -> Result<()> {
    let compiler = NetkanExe::discover(workspace.layout().netkan_exe()).or_raise(|| ErrorKind::BuildSetup)?;
    build_with(args, workspace, console, &compiler)
}

fn build_with(args: &BuildArgs, workspace: &Workspace, console: &Console, compiler: &dyn Compiler) -> Result<()> {
    let layout = workspace.layout();
    let sources = kure_build::sources(&layout.local_netkan(), &args.packages).or_raise(|| ErrorKind::BuildSetup)?;
    if sources.is_empty() {
        console.warn("Nothing to build in local/netkan");
        return Ok(());
    }

    let options = CompileOptions {
        output_dir: layout.local_ckan(),
        cache_dir: workspace.download_cache(),
        verbose: args.verbose_netkan,
        prerelease: args.prerelease,
    };
    let report = kure_build::build(&sources, compiler, &options, |source, output| {
        let name = source.file_name().unwrap_or(source.as_os_str()).to_string_lossy();
        console.done(format_args!("netkan output for {name}:"));
        console.plain(output.text.trim_end());
    });

    for failure in &report.failed {
        console.warn(format_args!("{}", *failure.error));
        console.detail(format_args!("{:?}", failure.error));
    }
    if !report.is_success() {
        exn::bail!(ErrorKind::Build(report.failed.len()));
    }
    console.done(format_args!("Built {} package(s) into local/ckan", report.built.len()));
    Ok(())
}
