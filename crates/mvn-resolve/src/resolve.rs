//! Defaulting and grouping of extracted coordinates into batches.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::coordinate::{ArtifactCoordinate, Batch, DefaultCoordinate, Resolution};
use crate::error::{ResolveError, ResolveResult};

/// Fill unset fields from `defaults` and partition by `group:artifact:version`.
///
/// Within a batch artifacts keep their input order, so the first input with a
/// given key becomes the primary artifact.
pub fn resolve(
    coordinates: Vec<ArtifactCoordinate>,
    defaults: &DefaultCoordinate,
) -> ResolveResult<Resolution> {
    let mut batches: BTreeMap<_, Batch> = BTreeMap::new();

    for mut coordinate in coordinates {
        coordinate.apply_defaults(defaults);
        coordinate.ensure_complete()?;

        match batches.entry(coordinate.key()) {
            Entry::Occupied(mut batch) => batch.get_mut().attach(coordinate),
            Entry::Vacant(slot) => {
                slot.insert(Batch::new(coordinate));
            }
        }
    }

    let resolution = Resolution::from_batches(batches);
    if resolution.is_empty() {
        return Err(ResolveError::NotFound);
    }

    for (key, batch) in &resolution {
        tracing::debug!(%key, artifacts = batch.artifact_count(), "resolved batch");
    }
    Ok(resolution)
}
