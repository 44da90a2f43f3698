//! Credential store for the task API.
//!
//! Credentials live in a small JSON document holding the API endpoint, the
//! access token, the timezone and the default project identifiers. They are
//! loaded once per invocation and handed to the client script through its
//! environment.

use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("credentials.json not found, expected at: {}", display_paths(.paths))]
    NotFound { paths: Vec<PathBuf> },

    #[error("Failed to read credentials from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed credentials in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Overrides the search path with a single explicit file.
pub const CREDENTIALS_ENV: &str = "VIKUNJA_CREDENTIALS";

const CREDENTIALS_FILE: &str = "credentials.json";

/// Per-user directory holding credentials and the client script.
pub(crate) const NIMWORKER_DIR: &str = ".nimworker";

/// API endpoint, token and defaults read from `credentials.json`.
///
/// # Examples
///
/// ```
/// use vikunja_cli::credentials::Credentials;
///
/// let creds: Credentials = serde_json::from_str(r#"{"vikunja_token": "t"}"#).unwrap();
/// assert_eq!(creds.timezone, "Europe/Rome");
/// assert_eq!(creds.projects.work, "WORK");
/// ```
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub vikunja_url: String,
    #[serde(default)]
    pub vikunja_token: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub projects: Projects,
}

/// Identifiers of the default projects.
#[derive(Debug, Clone, Deserialize)]
pub struct Projects {
    #[serde(default = "default_personal")]
    pub personal: String,
    #[serde(default = "default_work")]
    pub work: String,
}

impl Default for Projects {
    fn default() -> Self {
        Self {
            personal: default_personal(),
            work: default_work(),
        }
    }
}

fn default_timezone() -> String {
    "Europe/Rome".to_string()
}

fn default_personal() -> String {
    "PERSONAL".to_string()
}

fn default_work() -> String {
    "WORK".to_string()
}

impl Credentials {
    /// Loads credentials from the first existing file on the search path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * No candidate file exists (`Error::NotFound`)
    /// * The file cannot be read (`Error::Io`)
    /// * The file is not valid JSON (`Error::Parse`)
    pub fn load() -> Result<Self, Error> {
        Self::load_from(&search_paths())
    }

    /// Loads credentials from the first path in `paths` that exists.
    pub fn load_from(paths: &[PathBuf]) -> Result<Self, Error> {
        match paths.iter().find(|p| p.exists()) {
            Some(path) => Self::read(path),
            None => Err(Error::NotFound {
                paths: paths.to_vec(),
            }),
        }
    }

    fn read(path: &Path) -> Result<Self, Error> {
        log::debug!("Loading credentials from {}", path.display());
        let buf = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&buf).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Environment variables the client script expects.
    pub fn env(&self) -> [(&'static str, &str); 5] {
        [
            ("VIKUNJA_URL", self.vikunja_url.as_str()),
            ("VIKUNJA_TOKEN", self.vikunja_token.as_str()),
            ("VIKUNJA_TZ", self.timezone.as_str()),
            ("VIKUNJA_PROJECT_PERSONAL", self.projects.personal.as_str()),
            ("VIKUNJA_PROJECT_WORK", self.projects.work.as_str()),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("vikunja_url", &self.vikunja_url)
            .field("vikunja_token", &"<redacted>")
            .field("timezone", &self.timezone)
            .field("projects", &self.projects)
            .finish()
    }
}

/// Candidate credential files, in lookup order.
///
/// `$VIKUNJA_CREDENTIALS` replaces the list entirely. Otherwise the per-user
/// `~/.nimworker/credentials.json` is tried before the one shipped next to
/// the executable.
pub fn search_paths() -> Vec<PathBuf> {
    if let Some(path) = env::var_os(CREDENTIALS_ENV) {
        return vec![PathBuf::from(path)];
    }

    let mut paths = Vec::new();
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(NIMWORKER_DIR).join(CREDENTIALS_FILE));
    }
    if let Some(dir) = exe_dir() {
        paths.push(dir.join(CREDENTIALS_FILE));
    }
    paths
}

/// Directory containing the running executable.
pub(crate) fn exe_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" or ")
}
