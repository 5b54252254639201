//! In-memory registry of injected faults
//!
//! One registry per fault domain, constructed explicitly and shared through
//! `Arc`. The lock is only held for map operations; callers do cluster I/O
//! before or after, never under it.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::types::InjectedFaultRecord;

#[derive(Debug, Default)]
pub struct FaultRegistry {
    records: Mutex<HashMap<String, InjectedFaultRecord>>,
}

impl FaultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, InjectedFaultRecord>> {
        // Map operations never panic midway; a poisoned map is still consistent
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or replace a record keyed by its id
    pub fn put(&self, record: InjectedFaultRecord) {
        self.lock().insert(record.record_id.clone(), record);
    }

    pub fn remove(&self, record_id: &str) -> Option<InjectedFaultRecord> {
        self.lock().remove(record_id)
    }

    pub fn get(&self, record_id: &str) -> Option<InjectedFaultRecord> {
        self.lock().get(record_id).cloned()
    }

    /// Snapshot of every record, oldest first
    pub fn get_all(&self) -> Vec<InjectedFaultRecord> {
        let mut records: Vec<_> = self.lock().values().cloned().collect();
        records.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.record_id.cmp(&b.record_id)));
        records
    }

    /// Remove every record matching `predicate` and return the removed ones
    pub fn remove_if<F>(&self, mut predicate: F) -> Vec<InjectedFaultRecord>
    where
        F: FnMut(&InjectedFaultRecord) -> bool,
    {
        let mut records = self.lock();
        let doomed: Vec<String> = records
            .values()
            .filter(|record| predicate(record))
            .map(|record| record.record_id.clone())
            .collect();

        doomed.iter().filter_map(|id| records.remove(id)).collect()
    }

    /// Empty the registry, returning everything it held
    pub fn drain(&self) -> Vec<InjectedFaultRecord> {
        self.lock().drain().map(|(_, record)| record).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Strictly increasing epoch-millisecond source for record ids
///
/// Two calls within the same wall-clock millisecond still yield distinct
/// values: the second one gets the previous value plus one.
#[derive(Debug, Default)]
pub struct RecordIdClock {
    last: Mutex<i64>,
}

impl RecordIdClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_at(&self, now: DateTime<Utc>) -> i64 {
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let candidate = now.timestamp_millis();
        let issued = if candidate > *last { candidate } else { *last + 1 };
        *last = issued;
        issued
    }

    pub fn next(&self) -> i64 {
        self.next_at(Utc::now())
    }
}
