use crate::console::Console;
use crate::error::{ErrorKind, Result};
use crate::prompt::Prompt;
use clap::Args;
use colored::Color;
use exn::{OptionExt, ResultExt};
use kure_repo::{FetchHandle, FileMode, PackageInfo, SearchMode, find, remote_reference};
use kure_workspace::Workspace;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct GetArgs {
    /// Identifier (or part of it, or a pattern with --glob) to look for
    pub identifier: String,
    /// Which of several matches to take, as numbered in the listing
    pub index: Option<usize>,
    /// Match a glob pattern against file names without their extension
    #[arg(short, long)]
    pub glob: bool,
    /// Search ckan packages as well
    #[arg(short, long)]
    pub ckan: bool,
    /// Print the package instead of copying it
    #[arg(short, long)]
    pub show: bool,
    /// Print identifier and relationships instead of copying
    #[arg(long)]
    pub info: bool,
    /// Extensions to search instead of the default one, e.g. `-i txt,frozen`
    #[arg(short, long, value_delimiter = ',')]
    pub include: Vec<String>,
}

impl GetArgs {
    fn extensions(&self, default_extension: &str) -> Vec<String> {
        let mut extensions = match self.include.is_empty() {
            true => vec![default_extension.to_string()],
            false => self.include.clone(),
        };
        if self.ckan && !extensions.iter().any(|extension| extension == "ckan") {
            extensions.push("ckan".to_string());
        }
        extensions
    }

    fn mode(&self) -> SearchMode {
        match self.glob {
            true => SearchMode::Glob,
            false => SearchMode::Simple,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Selection<'a> {
    NotFound,
    Ambiguous,
    Selected(&'a Path),
}

fn select(found: &[PathBuf], index: Option<usize>) -> Result<Selection<'_>> {
    Ok(match (found, index) {
        ([], _) => Selection::NotFound,
        ([only], None) => Selection::Selected(only),
        (_, None) => Selection::Ambiguous,
        (_, Some(index)) => Selection::Selected(found.get(index).ok_or_raise(|| {
            ErrorKind::Usage(format!("there is no package number {index}, pick one from 0 to {}", found.len() - 1))
        })?),
    })
}

/// Where a selected package is copied to.
#[derive(Debug, PartialEq, Eq)]
enum Destination {
    Netkan,
    Ckan,
}

pub fn run(
    args: &GetArgs,
    workspace: &Workspace,
    console: &Console,
    prompt: &dyn Prompt,
    fetcher: FetchHandle,
) -> Result<()> {
    let layout = workspace.layout();
    let extensions = args.extensions(&workspace.config().default_extension);
    console.detail(format_args!("Looking for extensions: {}", extensions.join(", ")));

    let repo_cache = layout.repo_cache();
    let found = find(&repo_cache, extensions.as_slice(), &args.identifier, args.mode()).or_raise(|| ErrorKind::Search)?;
    let selected = match select(&found, args.index)? {
        Selection::NotFound => {
            console.warn("No packages found");
            return Ok(());
        },
        Selection::Ambiguous => {
            list(console, &repo_cache, &found);
            console.done("Run the same command again with the number of the package to pick.");
            console.plain(format_args!("For example `kure get {} 1` takes the second one.", args.identifier));
            return Ok(());
        },
        Selection::Selected(path) => path,
    };
    console.done(format_args!("Found {}", file_name(selected)));

    if args.show {
        console.detail(format_args!("Showing content of {}", selected.display()));
        let content = fs::read_to_string(selected).or_raise(|| ErrorKind::Read(selected.to_path_buf()))?;
        console.plain(content);
        return Ok(());
    }
    if args.info {
        let info = PackageInfo::load(selected).or_raise(|| ErrorKind::Read(selected.to_path_buf()))?;
        show_info(console, &info);
        return Ok(());
    }

    let destination = match selected.extension().and_then(OsStr::to_str) {
        Some("netkan") => Destination::Netkan,
        Some("ckan") => Destination::Ckan,
        _ => {
            console.warn("Answer yes if this is a netkan with a different extension, otherwise it goes to local/ckan.");
            match prompt.confirm("Is this a valid netkan package?", false)? {
                true => Destination::Netkan,
                false => Destination::Ckan,
            }
        },
    };
    let Some(name) = selected.file_name() else {
        exn::bail!(ErrorKind::Read(selected.to_path_buf()));
    };

    match destination {
        Destination::Netkan => {
            let target = layout.local_netkan().join(name);
            let content = fs::read_to_string(selected).or_raise(|| ErrorKind::Read(selected.to_path_buf()))?;
            if let Some(url) = remote_reference(&content) {
                console.warn(format_args!("Package {} refers to a remote package at {url}", file_name(selected)));
                if prompt.confirm("Download it instead of copying the cached package?", true)? {
                    fetcher.fetch(url, &target, FileMode::Data).or_raise(|| ErrorKind::Save(target.clone()))?;
                    console.done("Downloaded to local/netkan");
                    return Ok(());
                }
            }
            fs::copy(selected, &target).or_raise(|| ErrorKind::Save(target.clone()))?;
            console.done("Saved to local/netkan");
        },
        Destination::Ckan => {
            let target = layout.local_ckan().join(name);
            fs::copy(selected, &target).or_raise(|| ErrorKind::Save(target.clone()))?;
            console.done("Saved to local/ckan");
        },
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap_or(path.as_os_str()).to_string_lossy().into_owned()
}

/// Numbered candidates: index, file name and the directory it sits in
/// relative to the repository cache.
fn list(console: &Console, repo_cache: &Path, found: &[PathBuf]) {
    let rows: Vec<(String, String, String)> = found
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let relative = path.strip_prefix(repo_cache).unwrap_or(path);
            let directory = relative.parent().map(|dir| dir.display().to_string()).unwrap_or_default();
            (index.to_string(), file_name(path), directory)
        })
        .collect();
    let index_width = rows.iter().map(|row| row.0.len()).max().unwrap_or(0);
    let name_width = rows.iter().map(|row| row.1.chars().count()).max().unwrap_or(0);
    for (index, name, directory) in rows {
        console.plain(format_args!(
            "{} | {} | {directory}",
            console.paint(format_args!("{index:>index_width$}"), Color::White, true),
            console.paint(format_args!("{name:<name_width$}"), Color::BrightBlue, false),
        ));
    }
}

fn show_info(console: &Console, info: &PackageInfo) {
    console.plain(format_args!("identifier: {}", info.identifier));
    console.plain(format_args!("path:       {}", info.path.display()));
    for (label, relationships) in [("depends", &info.depends), ("recommends", &info.recommends)] {
        match relationships.is_empty() {
            true => console.plain(format_args!("{label}: none")),
            false => {
                console.plain(format_args!("{label}:"));
                for relationship in relationships {
                    console.plain(format_args!("  - {relationship}"));
                }
            },
        }
    }
}
