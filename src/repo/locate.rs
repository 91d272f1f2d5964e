use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use super::{
    error::{RepoError, Result},
    section::{has_section, parse_sections},
};

/// Files directly in `dir` whose name ends with `suffix`, sorted by file name.
pub fn list_repo_files(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| RepoError::io("list", dir, e))?;

    let mut files = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(suffix))
        })
        .collect::<Vec<_>>();

    files.sort();

    Ok(files)
}

/// Returns the first file (by name) that defines a section headed exactly `[id]`.
pub fn find_repo_file(dir: &Path, suffix: &str, id: &str) -> Result<Option<PathBuf>> {
    for path in list_repo_files(dir, suffix)? {
        let Some(content) = read_or_skip(&path) else {
            continue;
        };

        if has_section(&content, id) {
            debug!("Repository {id} is defined in {}", path.display());
            return Ok(Some(path));
        }
    }

    Ok(None)
}

/// Fallback lookup by the `name=` value of a section. Returns the file and the real id.
pub fn find_repo_file_by_name(
    dir: &Path,
    suffix: &str,
    name: &str,
) -> Result<Option<(PathBuf, String)>> {
    for path in list_repo_files(dir, suffix)? {
        let Some(content) = read_or_skip(&path) else {
            continue;
        };

        let id = parse_sections(&content)
            .values()
            .find(|section| section.value("name") == Some(name))
            .map(|section| section.id.to_string());

        if let Some(id) = id {
            debug!("Repository named {name} has id {id} in {}", path.display());
            return Ok(Some((path, id)));
        }
    }

    Ok(None)
}

fn read_or_skip(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            warn!("Skipping {}: {e}", path.display());
            None
        }
    }
}
