use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

/// Echoes its subcommand, each argument and the credential variables.
pub const ECHO_SCRIPT: &str = r#"#!/bin/sh
echo "cmd=$1"
shift
for a in "$@"; do printf 'arg=%s\n' "$a"; done
echo "url=$VIKUNJA_URL token=$VIKUNJA_TOKEN tz=$VIKUNJA_TZ work=$VIKUNJA_PROJECT_WORK"
"#;

/// Fails the way the real script does on an API error.
pub const FAILING_SCRIPT: &str = r#"#!/bin/sh
echo "partial"
echo "boom: task not found" >&2
exit 3
"#;

pub const CREDENTIALS: &str = r#"{
    "vikunja_url": "https://tasks.example.com/api/v1",
    "vikunja_token": "tok",
    "projects": {"work": "OFFICE"}
}"#;

static SPAWN: Mutex<()> = Mutex::new(());

/// Held while writing and running scripts: exec of a file that a concurrently
/// forked child still has open for writing fails with ETXTBSY.
pub fn spawn_lock() -> MutexGuard<'static, ()> {
    SPAWN.lock().unwrap_or_else(|e| e.into_inner())
}

pub fn write_script(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("vikunja.sh");
    fs::write(&path, contents).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn write_credentials(dir: &Path) -> PathBuf {
    let path = dir.join("credentials.json");
    fs::write(&path, CREDENTIALS).unwrap();
    path
}
