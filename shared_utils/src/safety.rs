//! Safety Module
//!
//! Refuses protected system directories as write targets for batch output.

use std::path::Path;
use thiserror::Error;

const DANGEROUS_DIRS: &[&str] = &[
    "/",
    "/System",
    "/usr",
    "/bin",
    "/sbin",
    "/etc",
    "/var",
    "/private",
    "/Library",
    "/Applications",
    "/Users",
    "/home",
    "/root",
    "/boot",
    "/dev",
    "/proc",
    "/sys",
    "/opt",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SafetyError {
    #[error("'{0}' is a protected system directory")]
    ProtectedDirectory(String),

    #[error("'{0}' is a home directory root")]
    HomeDirectoryRoot(String),
}

pub fn check_dangerous_directory(path: &Path) -> Result<(), SafetyError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    for candidate in [path, canonical.as_path()] {
        let path_str = candidate.to_string_lossy();
        let trimmed = if path_str.len() > 1 {
            path_str.trim_end_matches('/')
        } else {
            &path_str
        };
        if DANGEROUS_DIRS.contains(&trimmed) {
            return Err(SafetyError::ProtectedDirectory(trimmed.to_string()));
        }
    }

    // /home/<user> and /Users/<user> themselves
    let path_str = canonical.to_string_lossy();
    if (path_str.starts_with("/Users/") || path_str.starts_with("/home/"))
        && canonical.components().count() <= 3
    {
        return Err(SafetyError::HomeDirectoryRoot(path_str.into_owned()));
    }

    Ok(())
}
