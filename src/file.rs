//! Locating, reading and writing INI config files.
//!
//! Each [`SearchPath`] resolves to one directory. Lists are priority-ascending,
//! so lookups walk them from the end: the highest-priority directory holding
//! `{file_name}` is the one that gets loaded, and the highest-priority
//! directory that resolves at all is where files get written.
//!
//! Missing files are silently skipped. Only actual I/O errors (permissions,
//! etc.) and parse errors are propagated.

use std::path::{Path, PathBuf};

use toml::Table;
use tracing::debug;

use crate::error::InifigError;
use crate::ini;
use crate::types::SearchPath;

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// `app_name` is used by `SearchPath::Platform` to construct the platform-specific
/// config directory (e.g. `~/.config/{app_name}/` on Linux).
///
/// Returns `None` if the path cannot be resolved (e.g. no home directory found).
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Resolve every search path that can be resolved, keeping priority order.
pub fn expand_search_paths(search_paths: &[SearchPath], app_name: &str) -> Vec<PathBuf> {
    search_paths
        .iter()
        .filter_map(|sp| resolve_search_path(sp, app_name))
        .collect()
}

/// Load the highest-priority `{file_name}` found on the search paths.
///
/// Returns `Ok(None)` when no directory holds the file.
pub fn find_config_file(
    search_paths: &[SearchPath],
    file_name: &str,
    app_name: &str,
) -> Result<Option<(PathBuf, Table)>, InifigError> {
    for dir in expand_search_paths(search_paths, app_name).iter().rev() {
        let file_path = dir.join(file_name);
        match std::fs::read(&file_path) {
            Ok(bytes) => {
                debug!(path = %file_path.display(), "loading config file");
                let table = ini::parse_str(&ini::decode_input(bytes)?)?;
                return Ok(Some((file_path, table)));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(InifigError::Io {
                    path: file_path,
                    source: e,
                });
            }
        }
    }
    Ok(None)
}

/// The path `{file_name}` is written to: inside the highest-priority
/// directory that resolves.
pub fn resolve_write_path(
    search_paths: &[SearchPath],
    file_name: &str,
    app_name: &str,
) -> Option<PathBuf> {
    search_paths
        .iter()
        .rev()
        .find_map(|sp| resolve_search_path(sp, app_name))
        .map(|dir| dir.join(file_name))
}

/// Write `table` as INI to `path`, creating parent directories as needed.
pub fn write_config_file(path: &Path, table: &Table) -> Result<(), InifigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| InifigError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, ini::to_ini_string(table)).map_err(|e| InifigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(path = %path.display(), "wrote config file");
    Ok(())
}
