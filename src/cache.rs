use std::collections::HashMap;
use std::time::Instant;

use crate::query::ViewName;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Fresh,
    Stale,
    Revalidating,
    Error,
}

#[derive(Debug)]
pub struct CacheEntry {
    pub data: Vec<Task>,
    pub fetched_at: Option<Instant>,
    pub status: CacheStatus,
    /// Generation of the one in-flight revalidation, if any
    inflight: Option<u64>,
    /// Invalidated while a revalidation was in flight
    dirty: bool,
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            fetched_at: None,
            status: CacheStatus::Stale,
            inflight: None,
            dirty: false,
        }
    }
}

/// Keyed cache of view results with stale-while-revalidate semantics.
///
/// All transitions happen synchronously between suspension points: callers
/// take a generation before the fetch and apply the outcome after, and a
/// completion whose generation no longer matches the in-flight one is
/// discarded. At most one revalidation per view is in flight; concurrent
/// requests coalesce onto it.
pub struct ViewCache {
    entries: HashMap<ViewName, CacheEntry>,
    next_generation: u64,
}

impl ViewCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_generation: 1,
        }
    }

    /// Last known tasks for a view, possibly stale, never blocking.
    pub fn data(&self, view: ViewName) -> &[Task] {
        self.entries.get(&view).map(|e| e.data.as_slice()).unwrap_or(&[])
    }

    pub fn status(&self, view: ViewName) -> CacheStatus {
        self.entries
            .get(&view)
            .map(|e| e.status)
            .unwrap_or(CacheStatus::Stale)
    }

    pub fn fetched_at(&self, view: ViewName) -> Option<Instant> {
        self.entries.get(&view).and_then(|e| e.fetched_at)
    }

    /// Claim a revalidation slot. Returns None when the entry is already
    /// fresh or a fetch is in flight (the caller coalesces onto it).
    pub fn begin_revalidation(&mut self, view: ViewName) -> Option<u64> {
        let entry = self.entries.entry(view).or_default();
        if entry.inflight.is_some() || entry.status == CacheStatus::Fresh {
            return None;
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        entry.inflight = Some(generation);
        entry.status = CacheStatus::Revalidating;
        Some(generation)
    }

    /// Atomically replace a view's data. Returns false when the result was
    /// superseded and therefore discarded.
    pub fn apply_success(&mut self, view: ViewName, generation: u64, data: Vec<Task>) -> bool {
        let entry = self.entries.entry(view).or_default();
        if entry.inflight != Some(generation) {
            return false;
        }
        entry.inflight = None;
        entry.data = data;
        entry.fetched_at = Some(Instant::now());
        entry.status = if entry.dirty {
            entry.dirty = false;
            CacheStatus::Stale
        } else {
            CacheStatus::Fresh
        };
        true
    }

    /// Record a failed revalidation, keeping the previous data.
    pub fn apply_failure(&mut self, view: ViewName, generation: u64) -> bool {
        let entry = self.entries.entry(view).or_default();
        if entry.inflight != Some(generation) {
            return false;
        }
        entry.inflight = None;
        entry.status = if entry.dirty {
            entry.dirty = false;
            CacheStatus::Stale
        } else {
            CacheStatus::Error
        };
        true
    }

    pub fn invalidate(&mut self, view: ViewName) {
        let entry = self.entries.entry(view).or_default();
        if entry.inflight.is_some() {
            entry.dirty = true;
        } else {
            entry.status = CacheStatus::Stale;
        }
    }

    pub fn invalidate_all(&mut self) {
        for view in ViewName::ALL {
            self.invalidate(view);
        }
    }

    pub fn find_task(&self, id: &str) -> Option<&Task> {
        self.entries
            .values()
            .flat_map(|e| e.data.iter())
            .find(|t| t.id == id)
    }

    /// Apply an edit to every cached copy of a task. Returns how many views
    /// held it.
    pub fn update_task(&mut self, id: &str, mut f: impl FnMut(&mut Task)) -> usize {
        let mut touched = 0;
        for entry in self.entries.values_mut() {
            for task in entry.data.iter_mut().filter(|t| t.id == id) {
                f(task);
                touched += 1;
            }
        }
        touched
    }

    pub fn remove_task(&mut self, id: &str) -> Vec<ViewName> {
        let mut removed = Vec::new();
        for (view, entry) in self.entries.iter_mut() {
            let before = entry.data.len();
            entry.data.retain(|t| t.id != id);
            if entry.data.len() != before {
                removed.push(*view);
            }
        }
        removed
    }

    /// Insert an optimistic task into a view that has been fetched before.
    /// Views never read yet stay untouched; their first fetch will pick the
    /// task up from the store.
    pub fn insert_task(&mut self, view: ViewName, task: Task) -> bool {
        match self.entries.get_mut(&view) {
            Some(entry) => {
                entry.data.push(task);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> HashMap<ViewName, Vec<Task>> {
        self.entries
            .iter()
            .map(|(view, entry)| (*view, entry.data.clone()))
            .collect()
    }

    pub fn restore(&mut self, snapshot: HashMap<ViewName, Vec<Task>>) {
        for (view, data) in snapshot {
            self.entries.entry(view).or_default().data = data;
        }
    }
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new()
    }
}
