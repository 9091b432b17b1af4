//! Running the netkan compiler on a single source file.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::instrument;

/// Settings shared by every compilation of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Where built `.ckan` files are written.
    pub output_dir: PathBuf,
    /// Download cache handed to the compiler.
    pub cache_dir: PathBuf,
    pub verbose: bool,
    pub prerelease: bool,
}

/// What a compiler run printed, and how it ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutput {
    /// Standard output followed by standard error.
    pub text: String,
    pub success: bool,
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl CompileOutput {
    /// Human readable process status, for error messages.
    pub fn status(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Turns one package source into built packages under
/// [`CompileOptions::output_dir`].
///
/// A compiler that runs but reports failure returns `Ok` with
/// [`CompileOutput::success`] unset; `Err` means it couldn't run at all.
pub trait Compiler {
    fn compile(&self, source: &Path, options: &CompileOptions) -> Result<CompileOutput>;
}

/// The external `netkan.exe` compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetkanExe {
    program: PathBuf,
    /// Launcher the program is passed to, e.g. `mono` for a .NET assembly.
    interpreter: Option<PathBuf>,
}

impl NetkanExe {
    /// Use the compiler at `program`, finding `mono` on the search path when
    /// it is a `.exe` and this isn't Windows.
    pub fn discover(program: impl Into<PathBuf>) -> Result<Self> {
        let program = program.into();
        if !program.is_file() {
            exn::bail!(ErrorKind::MissingCompiler(program));
        }
        let needs_mono =
            !cfg!(windows) && program.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("exe"));
        let interpreter = match needs_mono {
            true => {
                let mono = which::which("mono").or_raise(|| ErrorKind::MissingInterpreter("mono".to_string()))?;
                tracing::debug!(mono = %mono.display(), "Using mono to run the compiler");
                Some(mono)
            },
            false => None,
        };
        Ok(Self { program, interpreter })
    }

    #[cfg(test)]
    fn with_interpreter(interpreter: impl Into<PathBuf>, program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), interpreter: Some(interpreter.into()) }
    }

    /// Compiler arguments for `source`, interpreter excluded.
    pub fn arguments(source: &Path, options: &CompileOptions) -> Vec<OsString> {
        let mut arguments = Vec::with_capacity(5);
        let mut flag = |name: &str, path: &Path| {
            let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
            let mut argument = OsString::from(format!("--{name}="));
            argument.push(path.as_os_str());
            arguments.push(argument);
        };
        flag("outputdir", &options.output_dir);
        if options.cache_dir.is_dir() {
            flag("cachedir", &options.cache_dir);
        } else {
            tracing::warn!(
                cachedir = %options.cache_dir.display(),
                "Download cache does not exist, the compiler will use its default"
            );
        }
        if options.verbose {
            arguments.push(OsString::from("--verbose"));
        }
        if options.prerelease {
            arguments.push(OsString::from("--prerelease"));
        }
        arguments.push(source.as_os_str().to_os_string());
        arguments
    }

    pub fn command(&self, source: &Path, options: &CompileOptions) -> Command {
        let mut command = match &self.interpreter {
            Some(interpreter) => {
                let mut command = Command::new(interpreter);
                command.arg(&self.program);
                command
            },
            None => Command::new(&self.program),
        };
        command.args(Self::arguments(source, options));
        command
    }
}

impl Compiler for NetkanExe {
    #[instrument(skip(self, options), fields(source = %source.display()))]
    fn compile(&self, source: &Path, options: &CompileOptions) -> Result<CompileOutput> {
        let mut command = self.command(source, options);
        tracing::debug!(?command, "Running compiler");
        let output = command.output().or_raise(|| ErrorKind::Launch(self.program.clone()))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let output = CompileOutput { text, success: output.status.success(), code: output.status.code() };
        tracing::debug!(success = output.success, code = ?output.code, "Compiler finished");
        Ok(output)
    }
}
