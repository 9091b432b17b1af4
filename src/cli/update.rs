use crate::console::Console;
use crate::error::{ErrorKind, Result};
use clap::Args;
use exn::ResultExt;
use kure_repo::{FetchHandle, FileMode, RepositoryCache};
use kure_workspace::Workspace;

#[derive(Args)]
pub struct UpdateArgs {
    /// Download the netkan compiler instead of the repositories
    #[arg(short, long)]
    pub netkan: bool,
    /// Only empty the repository cache
    #[arg(short, long, conflicts_with = "no_clean")]
    pub clean: bool,
    /// Keep what is already in the repository cache while updating
    #[arg(short = 'C', long)]
    pub no_clean: bool,
}

pub fn run(args: &UpdateArgs, workspace: &Workspace, console: &Console, fetcher: FetchHandle) -> Result<()> {
    let layout = workspace.layout();
    let config = workspace.config();

    if args.netkan {
        console.detail(format_args!("Downloading {}", config.netkan_exe));
        fetcher
            .fetch(&config.netkan_exe, &layout.netkan_exe(), FileMode::Executable)
            .or_raise(|| ErrorKind::Compiler)?;
        console.done("netkan.exe saved to cache/bin");
        return Ok(());
    }

    let cache = RepositoryCache::new(layout.repo_cache(), fetcher);
    if args.clean {
        console.detail("Cleaning up cache/repo");
        cache.clean().or_raise(|| ErrorKind::Update)?;
        console.done("Repository cache cleaned");
        return Ok(());
    }

    if config.repos.is_empty() {
        console.warn("No repositories configured in kure.json, nothing to update");
        return Ok(());
    }
    for repo in &config.repos {
        console.detail(format_args!("Downloading {} ({}) from {}", repo.name, repo.kind, repo.url));
    }
    let report = cache.sync(&config.repos, !args.no_clean).or_raise(|| ErrorKind::Update)?;
    if report.clean_error.is_some() {
        console.warn("Could not clean the repository cache.");
        console.plain("The update went ahead, but you should clean cache/repo manually and update again.");
    }
    for skipped in &report.skipped {
        console.warn(format_args!("Repository name `{}` is not unique, ignoring {}", skipped.name, skipped.url));
    }
    console.done(format_args!("Update finished ({} repositories)", report.synced.len()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::testing::{workspace, write};
    use kure_config::{Config, DEFAULT_NETKAN_EXE};
    use kure_repo::MockFetcher;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    const NETKAN: &str = "https://github.com/KSP-CKAN/NetKAN/archive/master.tar.gz";
    const CKAN: &str = "https://github.com/KSP-CKAN/CKAN-Meta/archive/master.tar.gz";

    fn tarball(scratch: &Path, top: &str, file: &str) -> Vec<u8> {
        write(&scratch.join(top).join(file), "{\"identifier\": \"Foo\"}");
        let output = scratch.join(format!("{top}.tar.gz"));
        kure_archive::pack(&output, [scratch.join(top)]).unwrap();
        fs::read(output).unwrap()
    }

    fn args(netkan: bool, clean: bool, no_clean: bool) -> UpdateArgs {
        UpdateArgs { netkan, clean, no_clean }
    }

    #[test]
    fn test_update_mirrors_configured_repositories() {
        let (temp, workspace) = workspace();
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_response(NETKAN, tarball(temp.path(), "NetKAN-master", "NetKAN/Foo.netkan"))
                .with_response(CKAN, tarball(temp.path(), "CKAN-Meta-master", "Foo/Foo-1.0.ckan")),
        );

        run(&args(false, false, false), &workspace, &Console::new(false, false), fetcher.clone()).unwrap();

        assert_eq!(fetcher.requests(), [NETKAN, CKAN]);
        let repo = workspace.layout().repo_cache();
        assert!(repo.join("Offical Netkan/NetKAN-master/NetKAN/Foo.netkan").is_file());
        assert!(repo.join("Offical Ckan/CKAN-Meta-master/Foo/Foo-1.0.ckan").is_file());
        assert!(repo.join("netkan_Offical Netkan.tar.gz").is_file());
    }

    #[test]
    fn test_update_netkan_downloads_compiler() {
        let (_temp, workspace) = workspace();
        assert_eq!(workspace.config().netkan_exe, DEFAULT_NETKAN_EXE);
        let fetcher = Arc::new(MockFetcher::new().with_response(DEFAULT_NETKAN_EXE, b"MZ".to_vec()));

        run(&args(true, false, false), &workspace, &Console::new(false, false), fetcher.clone()).unwrap();

        assert_eq!(fetcher.requests(), [DEFAULT_NETKAN_EXE]);
        let exe = workspace.layout().netkan_exe();
        assert_eq!(fs::read(&exe).unwrap(), b"MZ");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            assert_eq!(fs::metadata(&exe).unwrap().permissions().mode() & 0o777, 0o700);
        }
    }

    #[test]
    fn test_update_clean_only_cleans() {
        let (_temp, workspace) = workspace();
        let stale = workspace.layout().repo_cache().join("Old/Old.netkan");
        write(&stale, "{}");
        let fetcher = Arc::new(MockFetcher::new());

        run(&args(false, true, false), &workspace, &Console::new(false, false), fetcher.clone()).unwrap();

        assert!(fetcher.requests().is_empty());
        assert!(!stale.exists());
        assert!(workspace.layout().repo_cache().is_dir());
    }

    #[test]
    fn test_failed_download_is_update_error() {
        let (_temp, workspace) = workspace();
        let err = run(&args(false, false, true), &workspace, &Console::new(false, false), Arc::new(MockFetcher::new()))
            .unwrap_err();
        assert_eq!(*err, ErrorKind::Update);
        assert_eq!(workspace.config(), &Config::template());
    }
}
