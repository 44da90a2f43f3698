//! Invocation of the external task API client script.
//!
//! Every command ends up as `vikunja.sh <subcommand> [--flag value]...`. The
//! script does the HTTP work; this module only finds it, runs it with the
//! credentials in its environment and relays what it printed.

use std::{
    env,
    io::{self, Write},
    path::PathBuf,
    process::{Command, ExitCode, ExitStatus, Output},
};

use crate::credentials::{self, Credentials};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("vikunja.sh not found, expected at: {}", display_paths(.paths))]
    ScriptNotFound { paths: Vec<PathBuf> },

    #[error("Failed to run {path}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Overrides the script lookup with an explicit path.
pub const SCRIPT_ENV: &str = "VIKUNJA_SCRIPT";

const SCRIPT_FILE: &str = "vikunja.sh";

/// Flags forwarded to the script, in order.
///
/// # Examples
///
/// ```
/// use vikunja_cli::script::ArgList;
///
/// let args = ArgList::new()
///     .flag("--id", 7)
///     .opt("--title", None::<String>)
///     .opt("--priority", Some(3));
/// assert_eq!(args.as_slice(), ["--id", "7", "--priority", "3"]);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArgList(Vec<String>);

impl ArgList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `name value`.
    pub fn flag(mut self, name: &str, value: impl ToString) -> Self {
        self.0.push(name.to_string());
        self.0.push(value.to_string());
        self
    }

    /// Appends `name value` only when a value is present.
    pub fn opt<T: ToString>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.flag(name, value),
            None => self,
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// A script subcommand together with its forwarded flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub subcommand: &'static str,
    pub args: ArgList,
}

impl Invocation {
    pub fn new(subcommand: &'static str, args: ArgList) -> Self {
        Self { subcommand, args }
    }
}

/// The client script on disk.
#[derive(Debug, Clone)]
pub struct Script {
    path: PathBuf,
}

impl Script {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Finds the script: `$VIKUNJA_SCRIPT`, then `skill/scripts/vikunja.sh`
    /// next to the executable, then `~/.nimworker/scripts/vikunja.sh`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ScriptNotFound` listing every candidate if none exists.
    pub fn locate() -> Result<Self, Error> {
        let paths = search_paths();
        match paths.iter().find(|p| p.exists()) {
            Some(path) => Ok(Self::new(path)),
            None => Err(Error::ScriptNotFound { paths }),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Runs the script to completion and captures its output.
    ///
    /// The credential variables are set on the child process only. There is
    /// no timeout; the call blocks until the script exits.
    ///
    /// # Errors
    ///
    /// Returns `Error::Spawn` if the script cannot be started.
    pub fn run(&self, credentials: &Credentials, invocation: &Invocation) -> Result<Output, Error> {
        log::debug!(
            "Running {} {:?}",
            invocation.subcommand,
            invocation.args.as_slice()
        );

        let output = Command::new(&self.path)
            .arg(invocation.subcommand)
            .args(invocation.args.as_slice())
            .envs(credentials.env())
            .output()
            .map_err(|source| Error::Spawn {
                path: self.path.clone(),
                source,
            })?;

        log::debug!("{} exited with {}", SCRIPT_FILE, output.status);
        Ok(output)
    }
}

/// Writes the script's stdout and stderr through unchanged and returns the
/// exit code this process should end with.
pub fn relay(output: &Output) -> Result<ExitCode, Error> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(&output.stdout)?;
    stdout.flush()?;

    let mut stderr = io::stderr().lock();
    stderr.write_all(&output.stderr)?;
    stderr.flush()?;

    Ok(ExitCode::from(exit_code(output.status)))
}

/// The child's exit code, or 1 when it has none (killed by a signal) or it
/// does not fit a process exit code.
pub fn exit_code(status: ExitStatus) -> u8 {
    status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}

/// Candidate script locations, in lookup order.
pub fn search_paths() -> Vec<PathBuf> {
    if let Some(path) = env::var_os(SCRIPT_ENV) {
        return vec![PathBuf::from(path)];
    }

    let mut paths = Vec::new();
    if let Some(dir) = credentials::exe_dir() {
        paths.push(dir.join("skill").join("scripts").join(SCRIPT_FILE));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(
            home.join(credentials::NIMWORKER_DIR)
                .join("scripts")
                .join(SCRIPT_FILE),
        );
    }
    paths
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" or ")
}
