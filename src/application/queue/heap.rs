//! Indexed binary min-heap of pending render jobs.
//!
//! Jobs are ordered by `(tier, arrival)`. Every slot move is mirrored in a
//! key → slot map, which doubles as the dedup index and lets a pending job be
//! re-prioritised in O(log n) without searching the array.

use std::collections::HashMap;

use super::job::{DocumentKey, QueuedJob};

#[derive(Debug, Default)]
pub(crate) struct JobHeap {
    entries: Vec<QueuedJob>,
    positions: HashMap<DocumentKey, usize>,
}

impl JobHeap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn contains(&self, key: &DocumentKey) -> bool {
        self.positions.contains_key(key)
    }

    #[cfg(test)]
    pub(crate) fn peek(&self) -> Option<&QueuedJob> {
        self.entries.first()
    }

    /// Slot currently holding the pending job for `key`, with the job itself.
    ///
    /// Callers that change the job's priority must follow up with [`fix`](Self::fix).
    pub(crate) fn entry_mut(&mut self, key: &DocumentKey) -> Option<(usize, &mut QueuedJob)> {
        let index = *self.positions.get(key)?;
        self.entries.get_mut(index).map(|job| (index, job))
    }

    /// Insert a job, returning it back if its key is already queued.
    pub(crate) fn push(&mut self, job: QueuedJob) -> Result<usize, QueuedJob> {
        if self.positions.contains_key(&job.key) {
            return Err(job);
        }

        let index = self.entries.len();
        self.positions.insert(job.key.clone(), index);
        self.entries.push(job);
        Ok(self.sift_up(index))
    }

    /// Remove and return the highest-priority job.
    pub(crate) fn pop(&mut self) -> Option<QueuedJob> {
        let last = self.entries.len().checked_sub(1)?;
        self.swap(0, last);
        // `Vec::pop` releases the vacated slot, so no stale job lingers behind.
        let job = self.entries.pop()?;
        self.positions.remove(&job.key);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some(job)
    }

    /// Restore heap order after the job at `index` changed priority in place.
    pub(crate) fn fix(&mut self, index: usize) {
        if index >= self.entries.len() {
            return;
        }
        if !self.sift_down(index) {
            self.sift_up(index);
        }
    }

    fn less(&self, i: usize, j: usize) -> bool {
        self.entries[i].priority() < self.entries[j].priority()
    }

    fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        self.entries.swap(i, j);
        if let Some(slot) = self.positions.get_mut(&self.entries[i].key) {
            *slot = i;
        }
        if let Some(slot) = self.positions.get_mut(&self.entries[j].key) {
            *slot = j;
        }
    }

    fn sift_up(&mut self, mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.less(index, parent) {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
        index
    }

    /// Returns whether the element moved.
    fn sift_down(&mut self, start: usize) -> bool {
        let len = self.entries.len();
        let mut index = start;
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(child, index) {
                break;
            }
            self.swap(index, child);
            index = child;
        }
        index != start
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        assert_eq!(self.entries.len(), self.positions.len());
        for (index, job) in self.entries.iter().enumerate() {
            assert_eq!(self.positions.get(&job.key), Some(&index), "stale slot for {}", job.key);
            if index > 0 {
                let parent = (index - 1) / 2;
                assert!(
                    self.entries[parent].priority() <= job.priority(),
                    "heap order violated at {index}"
                );
            }
        }
    }
}
