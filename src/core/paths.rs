use crate::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Overrides the config directory (used by CI and tests).
pub const CONFIG_DIR_ENV: &str = "INFRAGEN_CONFIG_DIR";

/// Base infragen config directory (~/.config/infragen/ on Unix-like systems)
pub fn infragen() -> Result<PathBuf> {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected("APPDATA environment variable not set on Windows")
        })?;
        Ok(PathBuf::from(appdata).join("infragen"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected("HOME environment variable not set on Unix-like system")
        })?;
        Ok(PathBuf::from(home).join(".config").join("infragen"))
    }
}

/// Global infragen.json config file path
pub fn infragen_json() -> Result<PathBuf> {
    Ok(infragen()?.join("infragen.json"))
}

/// Resolve a user-supplied target directory, expanding `~` and `$VARS`.
///
/// `None` means the current working directory.
pub fn target_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::full(raw).map_err(|e| {
                Error::validation_invalid_argument("dir", e.to_string(), Some(raw.to_string()))
            })?;
            Ok(PathBuf::from(expanded.as_ref()))
        }
        None => env::current_dir()
            .map_err(|e| Error::internal_io(e.to_string(), Some("read cwd".to_string()))),
    }
}

/// Final path component, used as the default repository name.
pub fn dir_name(dir: &Path) -> Option<String> {
    let resolved = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_dir_passes_plain_paths_through() {
        let dir = target_dir(Some("/srv/app")).unwrap();
        assert_eq!(dir, PathBuf::from("/srv/app"));
    }

    #[test]
    fn target_dir_rejects_undefined_variables() {
        let err = target_dir(Some("$INFRAGEN_SURELY_UNDEFINED_VAR/app")).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }

    #[test]
    fn dir_name_uses_last_component() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("billing-api");
        std::fs::create_dir(&repo).unwrap();
        assert_eq!(dir_name(&repo).as_deref(), Some("billing-api"));
    }
}
