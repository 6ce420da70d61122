//! Property-based tests for the queue store
//!
//! Uses proptest to check the cursor invariant and navigation rules across
//! random mutation sequences.

use encore_core::TrackIdentity;
use encore_playback::{PlayMode, Queue};
use proptest::prelude::*;
use std::collections::HashSet;

// ===== Helpers =====

#[derive(Debug, Clone)]
enum Op {
    Append(usize),
    Insert(usize),
    Remove(usize),
    Reorder(usize, usize),
    SetCurrent(Option<usize>),
    Shuffle,
    Clear,
    Next(PlayMode),
    Previous(PlayMode),
}

fn arbitrary_mode() -> impl Strategy<Value = PlayMode> {
    prop_oneof![
        Just(PlayMode::Sequential),
        Just(PlayMode::RepeatOne),
        Just(PlayMode::RepeatAll),
        Just(PlayMode::Shuffle),
    ]
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1usize..4).prop_map(Op::Append),
        2 => (0usize..12).prop_map(Op::Insert),
        3 => (0usize..12).prop_map(Op::Remove),
        2 => (0usize..12, 0usize..12).prop_map(|(a, b)| Op::Reorder(a, b)),
        2 => proptest::option::of(0usize..12).prop_map(Op::SetCurrent),
        1 => Just(Op::Shuffle),
        1 => Just(Op::Clear),
        3 => arbitrary_mode().prop_map(Op::Next),
        2 => arbitrary_mode().prop_map(Op::Previous),
    ]
}

fn track(n: usize) -> TrackIdentity {
    TrackIdentity::new(format!("t{n}"), format!("Track {n}"))
}

fn apply(queue: &mut Queue, op: &Op, counter: &mut usize) {
    match op {
        Op::Append(count) => {
            let tracks = (0..*count)
                .map(|_| {
                    *counter += 1;
                    track(*counter)
                })
                .collect();
            queue.append(tracks);
        }
        Op::Insert(index) => {
            *counter += 1;
            let _ = queue.insert_at(*index, track(*counter));
        }
        Op::Remove(index) => {
            let _ = queue.remove_at(*index);
        }
        Op::Reorder(from, to) => {
            let _ = queue.reorder(*from, *to);
        }
        Op::SetCurrent(index) => {
            let _ = queue.set_current_index(*index);
        }
        Op::Shuffle => queue.shuffle(),
        Op::Clear => queue.clear(),
        Op::Next(mode) => {
            if let Some(index) = queue.next(*mode) {
                queue.set_current_index(Some(index)).unwrap();
            }
        }
        Op::Previous(mode) => {
            if let Some(index) = queue.previous(*mode) {
                queue.set_current_index(Some(index)).unwrap();
            }
        }
    }
}

fn filled_queue(len: usize, current: usize) -> Queue {
    let mut queue = Queue::new();
    queue.append((0..len).map(track).collect());
    queue.set_current_index(Some(current % len)).unwrap();
    queue
}

// ===== Property Tests =====

proptest! {
    /// Property: the cursor is None or a valid index after every operation
    #[test]
    fn cursor_always_valid(ops in prop::collection::vec(arbitrary_op(), 1..80)) {
        let mut queue = Queue::new();
        let mut counter = 0;

        for op in &ops {
            apply(&mut queue, op, &mut counter);

            if let Some(current) = queue.current_index() {
                prop_assert!(current < queue.len(), "cursor {} with len {} after {:?}", current, queue.len(), op);
            }
            if queue.is_empty() {
                prop_assert_eq!(queue.current_index(), None);
            }
        }
    }

    /// Property: the shuffle play order is always a permutation of the entries
    #[test]
    fn play_order_is_permutation(ops in prop::collection::vec(arbitrary_op(), 1..60)) {
        let mut queue = Queue::new();
        let mut counter = 0;

        for op in &ops {
            apply(&mut queue, op, &mut counter);

            let entry_ids: HashSet<_> = queue.entries().iter().map(|e| e.id).collect();
            let order_ids: HashSet<_> = queue.play_order().iter().copied().collect();
            prop_assert_eq!(queue.play_order().len(), queue.len());
            prop_assert_eq!(entry_ids, order_ids);
        }
    }

    /// Property: removal keeps pointing at the same entry unless it was removed
    #[test]
    fn removal_follows_logical_entry(len in 2usize..20, current in 0usize..20, remove in 0usize..20) {
        let mut queue = filled_queue(len, current);
        let remove = remove % len;
        let current_id = queue.current().unwrap().id;

        queue.remove_at(remove).unwrap();

        if queue.entries().iter().any(|e| e.id == current_id) {
            prop_assert_eq!(queue.current().unwrap().id, current_id);
        } else {
            // Following entry slid into place, or clamped to the new last index
            let expected = (current % len).min(len - 2);
            prop_assert_eq!(queue.current_index(), Some(expected));
        }
    }

    /// Property: next() in the fixed-order modes matches its definition
    #[test]
    fn next_matches_mode_rules(len in 1usize..30, current in 0usize..30) {
        let queue = filled_queue(len, current);
        let current = current % len;

        let sequential = if current + 1 < len { Some(current + 1) } else { None };
        prop_assert_eq!(queue.next(PlayMode::Sequential), sequential);
        prop_assert_eq!(queue.next(PlayMode::RepeatAll), Some((current + 1) % len));
        prop_assert_eq!(queue.next(PlayMode::RepeatOne), Some(current));
    }

    /// Property: a full shuffle cycle visits every entry exactly once
    #[test]
    fn shuffle_cycle_visits_all(len in 1usize..25, current in 0usize..25) {
        let mut queue = filled_queue(len, current);
        queue.regenerate_play_order();

        let mut seen = HashSet::new();
        for _ in 0..len {
            let next = queue.next(PlayMode::Shuffle).unwrap();
            queue.set_current_index(Some(next)).unwrap();
            seen.insert(next);
        }
        prop_assert_eq!(seen.len(), len);
    }

    /// Property: reorder keeps the same set of entries and the current entry
    #[test]
    fn reorder_preserves_entries(len in 1usize..20, current in 0usize..20, from in 0usize..20, to in 0usize..20) {
        let mut queue = filled_queue(len, current);
        let before: HashSet<_> = queue.entries().iter().map(|e| e.id).collect();
        let current_id = queue.current().unwrap().id;

        queue.reorder(from % len, to % len).unwrap();

        let after: HashSet<_> = queue.entries().iter().map(|e| e.id).collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(queue.current().unwrap().id, current_id);
    }
}
