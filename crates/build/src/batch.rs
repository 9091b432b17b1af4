//! Building a set of package sources one after the other.

use crate::compiler::{CompileOptions, CompileOutput, Compiler};
use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use tracing::instrument;
use walkdir::WalkDir;

#[derive(Debug)]
pub struct BuildFailure {
    pub path: PathBuf,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub built: Vec<PathBuf>,
    pub failed: Vec<BuildFailure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The sources a build should compile.
///
/// Without explicit `paths`, every regular file under `netkan_dir`, in walk
/// order. Otherwise each path as given when it exists, or relative to
/// `netkan_dir` when it doesn't.
pub fn sources(netkan_dir: &Path, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if !paths.is_empty() {
        return Ok(paths
            .iter()
            .map(|path| match path.exists() {
                true => path.clone(),
                false => netkan_dir.join(path),
            })
            .collect());
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(netkan_dir).sort_by_file_name() {
        let entry = entry.or_raise(|| ErrorKind::Sources(netkan_dir.to_path_buf()))?;
        if entry.file_type().is_file() {
            sources.push(entry.into_path());
        }
    }
    Ok(sources)
}

/// Compile each of `sources` in order, carrying on past failures.
///
/// `on_output` sees what the compiler printed for every source it managed to
/// run, failed or not, as soon as that source is done.
#[instrument(skip_all, fields(sources = sources.len()))]
pub fn build(
    sources: &[PathBuf],
    compiler: &dyn Compiler,
    options: &CompileOptions,
    mut on_output: impl FnMut(&Path, &CompileOutput),
) -> BuildReport {
    let mut report = BuildReport::default();
    for source in sources {
        tracing::info!(source = %source.display(), "Building");
        match compiler.compile(source, options) {
            Ok(output) => {
                on_output(source, &output);
                if output.success {
                    report.built.push(source.clone());
                } else {
                    let error = exn::Exn::from(ErrorKind::Failed { path: source.clone(), status: output.status() });
                    tracing::warn!(source = %source.display(), status = %output.status(), "Build failed");
                    report.failed.push(BuildFailure { path: source.clone(), error });
                }
            },
            Err(err) => {
                tracing::warn!(source = %source.display(), error = ?err, "Compiler could not run");
                let error = err.raise(ErrorKind::Compile(source.clone()));
                report.failed.push(BuildFailure { path: source.clone(), error });
            },
        }
    }
    tracing::info!(built = report.built.len(), failed = report.failed.len(), "Build finished");
    report
}
