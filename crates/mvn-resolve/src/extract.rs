//! Coordinate extraction from matched file paths.

use regex_lite::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::coordinate::{ArtifactCoordinate, DefaultCoordinate};
use crate::error::{ResolveError, ResolveResult};
use crate::matcher::slash_path;

/// Capture group names an extraction pattern may use.
pub const CAPTURE_NAMES: &[&str] = &["group", "artifact", "version", "classifier", "extension"];

/// A regular expression whose named groups populate coordinate fields.
#[derive(Debug, Clone)]
pub struct ExtractionPattern {
    regex: Regex,
}

impl ExtractionPattern {
    /// Compile `pattern`, rejecting group names outside [`CAPTURE_NAMES`].
    pub fn new(pattern: &str) -> ResolveResult<Self> {
        let regex = Regex::new(pattern)?;
        if let Some(name) = regex
            .capture_names()
            .flatten()
            .find(|name| !CAPTURE_NAMES.contains(name))
        {
            return Err(ResolveError::Configuration(format!(
                "capture group '{}' is not recognized (expected one of: {})",
                name,
                CAPTURE_NAMES.join(", ")
            )));
        }
        Ok(Self { regex })
    }

    /// Compile `pattern` unless it is empty.
    pub fn optional(pattern: &str) -> ResolveResult<Option<Self>> {
        if pattern.is_empty() {
            Ok(None)
        } else {
            Self::new(pattern).map(Some)
        }
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Apply the pattern to `relative` and build a partial coordinate for `file`.
    ///
    /// Groups that did not take part in the match leave their field unset.
    pub fn capture(&self, relative: &str, file: PathBuf) -> Option<ArtifactCoordinate> {
        let captures = self.regex.captures(relative)?;
        let mut coordinate = ArtifactCoordinate::unset(file);
        for name in self.regex.capture_names().flatten() {
            let Some(value) = captures.name(name) else {
                continue;
            };
            let field = match name {
                "group" => &mut coordinate.group_id,
                "artifact" => &mut coordinate.artifact_id,
                "version" => &mut coordinate.version,
                "classifier" => &mut coordinate.classifier,
                "extension" => &mut coordinate.extension,
                _ => continue,
            };
            *field = value.as_str().to_string();
        }
        Some(coordinate)
    }
}

impl fmt::Display for ExtractionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produce one partial coordinate per source.
///
/// Without a pattern exactly one source is allowed and it receives the
/// default coordinate verbatim. With a pattern, each source's path relative
/// to `base_dir` must match or the whole extraction fails.
pub fn extract(
    base_dir: &Path,
    sources: &[PathBuf],
    pattern: Option<&ExtractionPattern>,
    defaults: &DefaultCoordinate,
) -> ResolveResult<Vec<ArtifactCoordinate>> {
    let Some(pattern) = pattern else {
        return match sources {
            [] => Err(ResolveError::NotFound),
            [single] => Ok(vec![ArtifactCoordinate::from_default(defaults, single)]),
            many => Err(ResolveError::Configuration(format!(
                "multiple sources found ({}) but no regexp was defined",
                many.iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        };
    };

    let mut parsed = Vec::with_capacity(sources.len());
    for source in sources {
        let relative = source.strip_prefix(base_dir).map_err(|_| {
            ResolveError::Configuration(format!(
                "source {} is outside workspace {}",
                source.display(),
                base_dir.display()
            ))
        })?;
        let relative = slash_path(relative);
        let coordinate = pattern
            .capture(&relative, source.clone())
            .ok_or_else(|| ResolveError::PatternMismatch {
                pattern: pattern.as_str().to_string(),
                path: relative.clone(),
            })?;
        tracing::debug!(artifact = %coordinate, "parsed artifact");
        parsed.push(coordinate);
    }

    if parsed.is_empty() {
        return Err(ResolveError::NotFound);
    }
    Ok(parsed)
}
