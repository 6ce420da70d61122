//! Queue store
//!
//! Ordered playable entries plus a cursor pointing at the current one.
//!
//! ```text
//!   entries:  [ A ][ B ][ C ][ D ]
//!                    ^
//!              current_index = Some(1)
//! ```
//!
//! Invariant: after every operation `current_index` is `None` or a valid
//! index into `entries`. All mutations go through `&mut self`, so a reader
//! holding `&Queue` never sees a half-applied change.
//!
//! Shuffle mode does not re-randomize on every "next". A cyclic play order
//! (a permutation of entry ids) is kept alongside the entries and walked
//! instead, which keeps "previous" well-defined.

use crate::error::{PlaybackError, Result};
use crate::shuffle::{insert_after_cursor, play_order, shuffle_keeping};
use crate::types::{PlayMode, QueueEntryId, QueueEntrySnapshot, QueueSnapshot};
use encore_core::{TrackIdentity, TrackKey};
use rand::Rng;
use std::sync::Arc;

/// A track wrapped with queue-local bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    /// Queue-local id
    pub id: QueueEntryId,

    /// Shared, immutable track metadata
    pub track: Arc<TrackIdentity>,

    /// Monotonic insertion sequence number
    pub inserted_seq: u64,

    /// How many times this entry started playing
    pub play_count: u32,
}

/// Ordered queue with a current-index cursor
#[derive(Debug, Clone, Default)]
pub struct Queue {
    /// Entries in play order (sequential mode)
    entries: Vec<QueueEntry>,

    /// Cursor; `None` means no current track
    current: Option<usize>,

    /// Next id / insertion sequence to hand out
    next_seq: u64,

    /// Cyclic order walked in Shuffle mode, always a permutation of entry ids
    play_order: Vec<QueueEntryId>,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Mutation =====

    /// Append tracks to the end, preserving input order
    ///
    /// Returns the assigned entry ids. Does not move the cursor.
    pub fn append(&mut self, tracks: Vec<TrackIdentity>) -> Vec<QueueEntryId> {
        let mut rng = rand::thread_rng();
        let mut ids = Vec::with_capacity(tracks.len());

        for track in tracks {
            let entry = self.make_entry(track);
            ids.push(entry.id);
            self.add_to_play_order(entry.id, &mut rng);
            self.entries.push(entry);
        }

        self.check_invariants();
        ids
    }

    /// Insert a single track at `index` (`index == len` appends)
    ///
    /// The cursor keeps pointing at the same logical entry.
    pub fn insert_at(&mut self, index: usize, track: TrackIdentity) -> Result<QueueEntryId> {
        if index > self.entries.len() {
            return Err(PlaybackError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }

        let entry = self.make_entry(track);
        let id = entry.id;
        self.add_to_play_order(id, &mut rand::thread_rng());
        self.entries.insert(index, entry);

        if let Some(current) = self.current {
            if current >= index {
                self.current = Some(current + 1);
            }
        }

        self.check_invariants();
        Ok(id)
    }

    /// Remove the entry at `index`
    ///
    /// - Entry before the cursor: cursor shifts down by one
    /// - Entry at the cursor: cursor stays, so the following entry slides into
    ///   place (clamped to the new last index; `None` if the queue is now empty)
    /// - Entry after the cursor: cursor unchanged
    pub fn remove_at(&mut self, index: usize) -> Result<QueueEntry> {
        if index >= self.entries.len() {
            return Err(PlaybackError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }

        let entry = self.entries.remove(index);
        let len = self.entries.len();

        self.current = match self.current {
            Some(current) if index < current => Some(current - 1),
            Some(_) if len == 0 => None,
            Some(current) if index == current => Some(current.min(len - 1)),
            other => other,
        };
        self.play_order.retain(|id| *id != entry.id);

        self.check_invariants();
        Ok(entry)
    }

    /// Remove every entry and reset the cursor
    pub fn clear(&mut self) {
        self.entries.clear();
        self.play_order.clear();
        self.current = None;
    }

    /// Randomly permute the entries, keeping the current one in place
    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::thread_rng());
    }

    /// `shuffle` with a caller-provided RNG
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        shuffle_keeping(&mut self.entries, self.current, rng);
        self.regenerate_play_order_with(rng);
        self.check_invariants();
    }

    /// Move one entry from `from` to `to`, shifting the others
    ///
    /// The cursor follows the logical entry it pointed at.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.entries.len();
        for index in [from, to] {
            if index >= len {
                return Err(PlaybackError::IndexOutOfRange { index, len });
            }
        }

        if from == to {
            return Ok(());
        }

        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);

        if let Some(current) = self.current {
            self.current = Some(if current == from {
                to
            } else if from < current && to >= current {
                current - 1
            } else if from > current && to <= current {
                current + 1
            } else {
                current
            });
        }

        self.check_invariants();
        Ok(())
    }

    /// Jump the cursor; `None` clears it
    pub fn set_current_index(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(index) = index {
            if index >= self.entries.len() {
                return Err(PlaybackError::IndexOutOfRange {
                    index,
                    len: self.entries.len(),
                });
            }
        }
        self.current = index;
        Ok(())
    }

    /// Bump the play count of the entry at `index`
    pub fn mark_played(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.play_count = entry.play_count.saturating_add(1);
        }
    }

    /// Rebuild the Shuffle-mode order with the current entry first
    pub fn regenerate_play_order(&mut self) {
        self.regenerate_play_order_with(&mut rand::thread_rng());
    }

    /// `regenerate_play_order` with a caller-provided RNG
    pub fn regenerate_play_order_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let ids: Vec<QueueEntryId> = self.entries.iter().map(|e| e.id).collect();
        let first = self.current.map(|c| self.entries[c].id);
        self.play_order = play_order(&ids, first, rng);
    }

    // ===== Navigation (pure) =====

    /// Index that "next" resolves to under `mode`, without moving the cursor
    ///
    /// - Sequential: `current + 1`, `None` past the end
    /// - RepeatAll: `(current + 1) mod len`
    /// - RepeatOne: `current` unchanged
    /// - Shuffle: next entry of the cyclic play order
    ///
    /// With no current entry every mode starts from the head of its order.
    pub fn next(&self, mode: PlayMode) -> Option<usize> {
        let len = self.entries.len();
        if len == 0 {
            return None;
        }

        match mode {
            PlayMode::Sequential => match self.current {
                None => Some(0),
                Some(current) if current + 1 < len => Some(current + 1),
                Some(_) => None,
            },
            PlayMode::RepeatAll => Some(self.current.map_or(0, |c| (c + 1) % len)),
            PlayMode::RepeatOne => Some(self.current.unwrap_or(0)),
            PlayMode::Shuffle => {
                let target = match self.order_cursor() {
                    None => self.play_order[0],
                    Some(pos) => self.play_order[(pos + 1) % len],
                };
                self.index_of(target)
            }
        }
    }

    /// Index that "previous" resolves to under `mode`
    ///
    /// Mirrors `next`: Sequential clamps at 0, RepeatAll wraps to the last
    /// entry, RepeatOne stays, Shuffle walks the play order backwards.
    /// `None` when there is no current entry.
    pub fn previous(&self, mode: PlayMode) -> Option<usize> {
        let len = self.entries.len();
        let current = self.current?;

        match mode {
            PlayMode::Sequential => Some(current.saturating_sub(1)),
            PlayMode::RepeatAll => Some(if current == 0 { len - 1 } else { current - 1 }),
            PlayMode::RepeatOne => Some(current),
            PlayMode::Shuffle => {
                let pos = self.order_cursor()?;
                let target = self.play_order[(pos + len - 1) % len];
                self.index_of(target)
            }
        }
    }

    // ===== Queries =====

    /// Current cursor
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Current entry
    pub fn current(&self) -> Option<&QueueEntry> {
        self.current.and_then(|c| self.entries.get(c))
    }

    /// Entry at `index`
    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    /// All entries in order
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Index of the entry with `id`
    pub fn index_of(&self, id: QueueEntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// First index holding the track with `key`
    pub fn position_of(&self, key: &TrackKey) -> Option<usize> {
        self.entries.iter().position(|e| &e.track.key() == key)
    }

    /// Shuffle-mode order (entry ids)
    pub fn play_order(&self) -> &[QueueEntryId] {
        &self.play_order
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot for the UI
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            entries: self
                .entries
                .iter()
                .map(|e| QueueEntrySnapshot {
                    id: e.id,
                    track: Arc::clone(&e.track),
                })
                .collect(),
            current_index: self.current,
        }
    }

    // ===== Internal =====

    fn make_entry(&mut self, track: TrackIdentity) -> QueueEntry {
        let seq = self.next_seq;
        self.next_seq += 1;
        QueueEntry {
            id: QueueEntryId(seq),
            track: Arc::new(track),
            inserted_seq: seq,
            play_count: 0,
        }
    }

    fn order_cursor(&self) -> Option<usize> {
        let id = self.current()?.id;
        self.play_order.iter().position(|o| *o == id)
    }

    fn add_to_play_order<R: Rng + ?Sized>(&mut self, id: QueueEntryId, rng: &mut R) {
        let cursor = self.order_cursor();
        insert_after_cursor(&mut self.play_order, cursor, id, rng);
    }

    fn check_invariants(&self) {
        debug_assert!(
            self.current.map_or(true, |c| c < self.entries.len()),
            "cursor {:?} out of range for {} entries",
            self.current,
            self.entries.len()
        );
        debug_assert_eq!(self.play_order.len(), self.entries.len());
    }
}
