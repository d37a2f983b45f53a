//! Source glob matching.
//!
//! Resolves a glob relative to the workspace into the list of files to
//! publish. `*`, `?` and character classes stop at `/`; `**` crosses
//! directories.

use globset::GlobBuilder;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{ResolveError, ResolveResult};

/// Characters that start a glob expression inside a path component.
const GLOB_META: &[char] = &['*', '?', '[', '{', '\\'];

/// Canonical absolute form of the workspace directory.
pub fn workspace_root(base_dir: &Path) -> ResolveResult<PathBuf> {
    base_dir
        .canonicalize()
        .map_err(|source| ResolveError::Workspace {
            path: base_dir.to_path_buf(),
            source,
        })
}

/// Find every regular file under `base_dir` whose relative path matches `glob`.
///
/// Paths are absolute and sorted; that order is the match order used for
/// batch assembly. An empty result is [`ResolveError::NoMatch`].
pub fn match_sources(base_dir: &Path, glob: &str) -> ResolveResult<Vec<PathBuf>> {
    let root = workspace_root(base_dir)?;
    let pattern = normalize_glob(glob);
    if pattern.is_empty() {
        return Err(ResolveError::Configuration(
            "source glob is empty".to_string(),
        ));
    }
    if pattern.split('/').any(|component| component == "..") {
        return Err(ResolveError::Configuration(format!(
            "source glob '{}' must stay inside the workspace",
            glob
        )));
    }

    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher();

    let prefix = literal_prefix(pattern);
    let walk_root = root.join(&prefix);
    if !walk_root.is_dir() {
        return Err(ResolveError::NoMatch {
            glob: glob.to_string(),
        });
    }

    let mut walker = WalkDir::new(&walk_root).min_depth(1).sort_by_file_name();
    if !pattern.contains("**") {
        let depth = pattern.split('/').count() - prefix.components().count();
        walker = walker.max_depth(depth);
    }

    let mut sources = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() || !entry.path().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&root) else {
            continue;
        };
        if matcher.is_match(slash_path(relative)) {
            sources.push(entry.into_path());
        }
    }

    if sources.is_empty() {
        return Err(ResolveError::NoMatch {
            glob: glob.to_string(),
        });
    }
    sources.sort();
    tracing::debug!(glob, count = sources.len(), "sources found");
    Ok(sources)
}

/// `path` with `/` separators, suitable for glob and regexp matching.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_glob(glob: &str) -> &str {
    let mut pattern = glob.trim();
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest;
    }
    pattern.trim_start_matches('/')
}

/// Leading directories of `pattern` that contain no glob syntax.
///
/// The final component is always treated as the file pattern.
fn literal_prefix(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').collect();
    let mut prefix = PathBuf::new();
    for component in &components[..components.len() - 1] {
        if component.contains(GLOB_META) || component.is_empty() {
            break;
        }
        prefix.push(component);
    }
    prefix
}
