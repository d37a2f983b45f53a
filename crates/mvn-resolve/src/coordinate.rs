//! Coordinate, batch and resolution types.

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ResolveError, ResolveResult};

/// Statically configured fallback coordinate.
///
/// Any field left empty by extraction is taken from here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultCoordinate {
    /// e.g. `org.springframework`
    #[serde(rename = "group", alias = "group_id")]
    pub group_id: String,

    /// e.g. `spring-core`
    #[serde(rename = "artifact", alias = "artifact_id")]
    pub artifact_id: String,

    /// e.g. `4.1.3.RELEASE`
    pub version: String,

    /// e.g. `sources`, `javadoc`, or empty for the primary artifact
    pub classifier: String,

    /// Packaging type, e.g. `jar`, `tar.gz`, `zip`
    pub extension: String,
}

/// A single deployable file plus its coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: String,
    pub extension: String,

    /// Absolute path to the bytes on disk.
    pub file: PathBuf,
}

impl ArtifactCoordinate {
    /// An empty coordinate for `file`; every field is unset.
    pub fn unset(file: impl Into<PathBuf>) -> Self {
        Self {
            group_id: String::new(),
            artifact_id: String::new(),
            version: String::new(),
            classifier: String::new(),
            extension: String::new(),
            file: file.into(),
        }
    }

    /// The default coordinate assigned verbatim to `file`.
    pub fn from_default(defaults: &DefaultCoordinate, file: impl Into<PathBuf>) -> Self {
        Self {
            group_id: defaults.group_id.clone(),
            artifact_id: defaults.artifact_id.clone(),
            version: defaults.version.clone(),
            classifier: defaults.classifier.clone(),
            extension: defaults.extension.clone(),
            file: file.into(),
        }
    }

    /// Fill every empty field from `defaults`. Present values are kept.
    pub fn apply_defaults(&mut self, defaults: &DefaultCoordinate) {
        fill(&mut self.group_id, &defaults.group_id);
        fill(&mut self.artifact_id, &defaults.artifact_id);
        fill(&mut self.version, &defaults.version);
        fill(&mut self.classifier, &defaults.classifier);
        fill(&mut self.extension, &defaults.extension);
    }

    /// Check that the deploy identity is fully specified.
    pub fn ensure_complete(&self) -> ResolveResult<()> {
        let required = [
            ("group", &self.group_id),
            ("artifact", &self.artifact_id),
            ("version", &self.version),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(ResolveError::Configuration(format!(
                    "{} is not set for {} (capture it in the regexp or set a default)",
                    field,
                    self.file.display()
                )));
            }
        }
        Ok(())
    }

    /// Grouping key of this coordinate.
    pub fn key(&self) -> BatchKey {
        BatchKey::new(&self.group_id, &self.artifact_id, &self.version)
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

fn fill(field: &mut String, default: &str) {
    if field.is_empty() {
        field.push_str(default);
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        if !self.extension.is_empty() {
            write!(f, "@{}", self.extension)?;
        }
        write!(f, " ({})", self.file.display())
    }
}

/// `groupId:artifactId:version`, the deploy identity shared by a batch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BatchKey(String);

impl BatchKey {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        Self(format!("{}:{}:{}", group_id, artifact_id, version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Artifacts sharing a [`BatchKey`], deployed together in one transaction.
///
/// Never empty: the first artifact is the primary, the rest are attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Batch {
    artifacts: Vec<ArtifactCoordinate>,
}

impl Batch {
    pub fn new(primary: ArtifactCoordinate) -> Self {
        Self {
            artifacts: vec![primary],
        }
    }

    pub fn attach(&mut self, artifact: ArtifactCoordinate) {
        self.artifacts.push(artifact);
    }

    pub fn primary(&self) -> &ArtifactCoordinate {
        &self.artifacts[0]
    }

    pub fn attached(&self) -> &[ArtifactCoordinate] {
        &self.artifacts[1..]
    }

    pub fn artifacts(&self) -> &[ArtifactCoordinate] {
        &self.artifacts
    }

    /// Primary plus attachments; always at least one.
    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }
}

/// Resolved batches, iterated in lexicographic key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Resolution {
    batches: BTreeMap<BatchKey, Batch>,
}

impl Resolution {
    pub(crate) fn from_batches(batches: BTreeMap<BatchKey, Batch>) -> Self {
        Self { batches }
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Batch> {
        self.batches.get(&BatchKey(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &BatchKey> {
        self.batches.keys()
    }

    pub fn batches(&self) -> impl Iterator<Item = &Batch> {
        self.batches.values()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, BatchKey, Batch> {
        self.batches.iter()
    }

    /// Total number of artifacts across all batches.
    pub fn artifact_count(&self) -> usize {
        self.batches.values().map(Batch::artifact_count).sum()
    }
}

impl<'a> IntoIterator for &'a Resolution {
    type Item = (&'a BatchKey, &'a Batch);
    type IntoIter = btree_map::Iter<'a, BatchKey, Batch>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
