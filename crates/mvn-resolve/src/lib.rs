//! Artifact resolution for Maven publishing.
//!
//! Turns a source glob plus an optional capture-group regexp into grouped,
//! fully specified artifact coordinates:
//!
//! glob → matched files → per-file extraction → defaulting → batches keyed by
//! `groupId:artifactId:version`.

mod coordinate;
mod error;
mod extract;
mod matcher;
mod resolve;

pub use coordinate::{ArtifactCoordinate, Batch, BatchKey, DefaultCoordinate, Resolution};
pub use error::{ResolveError, ResolveResult};
pub use extract::{extract, ExtractionPattern, CAPTURE_NAMES};
pub use matcher::{match_sources, slash_path, workspace_root};
pub use resolve::resolve;

use std::path::Path;

/// Run the whole pipeline for files under `base_dir` matching `glob`.
pub fn resolve_sources(
    base_dir: &Path,
    glob: &str,
    pattern: Option<&ExtractionPattern>,
    defaults: &DefaultCoordinate,
) -> ResolveResult<Resolution> {
    let root = workspace_root(base_dir)?;
    let sources = match_sources(&root, glob)?;
    let parsed = extract(&root, &sources, pattern, defaults)?;
    resolve(parsed, defaults)
}
