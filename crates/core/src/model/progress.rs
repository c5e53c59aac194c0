use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::model::ids::ExerciseId;

/// Set of completed exercises, with the time each was first completed.
///
/// Completing an exercise again keeps the original timestamp; the set never
/// shrinks while the process runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressRecord {
    completed: BTreeMap<ExerciseId, DateTime<Utc>>,
}

impl ProgressRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `id`; returns `true` only the first time.
    pub fn mark_completed(&mut self, id: ExerciseId, at: DateTime<Utc>) -> bool {
        match self.completed.entry(id) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(at);
                true
            }
        }
    }

    #[must_use]
    pub fn is_completed(&self, id: &ExerciseId) -> bool {
        self.completed.contains_key(id)
    }

    #[must_use]
    pub fn completed_at(&self, id: &ExerciseId) -> Option<DateTime<Utc>> {
        self.completed.get(id).copied()
    }

    pub fn completed_ids(&self) -> impl Iterator<Item = &ExerciseId> {
        self.completed.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.completed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    /// Share of `exercises` that are completed, as a whole percentage.
    pub fn completion_percent<'a>(
        &self,
        exercises: impl IntoIterator<Item = &'a ExerciseId>,
    ) -> u8 {
        let mut total = 0_usize;
        let mut done = 0_usize;
        for id in exercises {
            total += 1;
            if self.is_completed(id) {
                done += 1;
            }
        }
        percent(done, total)
    }
}

/// `100 * done / total`, rounded half up; `0` when `total == 0`.
#[must_use]
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = done.min(total);
    let value = (done * 200 + total) / (total * 2);
    u8::try_from(value).unwrap_or(100)
}
