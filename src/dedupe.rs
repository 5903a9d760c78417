//! Deduplication of dataset records
//!
//! Several queries can match the same logical dataset with different time
//! spans. They are merged into one record covering every requested span.

use crate::errors::Result;
use crate::record::DatasetRecord;
use crate::time::TimeSpan;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// Collapse records sharing a key.
///
/// The first record of each key keeps its metadata and files; its time span
/// becomes the earliest start and latest end over the group. Records without
/// a span do not take part in the min/max, and a group where only some records
/// carry a span is reported. Output is sorted by key.
///
/// # Errors
///
/// Returns an error if a span holds an unparseable period string.
pub fn deduplicate_datasets(datasets: Vec<DatasetRecord>) -> Result<Vec<DatasetRecord>> {
    let mut groups: BTreeMap<String, DatasetRecord> = BTreeMap::new();
    let mut missing_span: HashSet<String> = HashSet::new();

    for record in datasets {
        if record.time_span.is_none() {
            missing_span.insert(record.key.clone());
        }

        match groups.entry(record.key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                let representative = slot.get_mut();
                representative.time_span =
                    widen(representative.time_span.take(), record.time_span)?;
            }
        }
    }

    let merged: Vec<DatasetRecord> = groups.into_values().collect();
    for record in &merged {
        if record.time_span.is_some() && missing_span.contains(&record.key) {
            warn!(
                "Dataset {} was requested both with and without a time span; using {:?}",
                record.key, record.time_span
            );
        }
    }

    Ok(merged)
}

fn widen(current: Option<TimeSpan>, other: Option<TimeSpan>) -> Result<Option<TimeSpan>> {
    match (current, other) {
        (Some(a), Some(b)) => a.union(&b).map(Some),
        (Some(a), None) => Ok(Some(a)),
        (None, other) => Ok(other),
    }
}
