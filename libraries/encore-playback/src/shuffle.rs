//! Shuffle algorithms for queue randomization
//!
//! Fisher-Yates based. Two flavours:
//! - Physical shuffle of the queue that keeps the playing entry in place
//! - Cyclic play order for Shuffle mode, with a chosen entry first

use rand::seq::SliceRandom;
use rand::Rng;

/// Shuffle `items` in place, keeping `pinned` (if any) at its index
///
/// Every other element ends up at a uniformly random position among the
/// remaining slots.
pub fn shuffle_keeping<T, R: Rng + ?Sized>(items: &mut Vec<T>, pinned: Option<usize>, rng: &mut R) {
    match pinned {
        Some(index) if index < items.len() => {
            let kept = items.remove(index);
            items.shuffle(rng);
            items.insert(index, kept);
        }
        _ => items.shuffle(rng),
    }
}

/// Build a cyclic play order over `ids`
///
/// `first` (if present in `ids`) is placed at the head so the walk starts
/// from the entry that is already playing.
pub fn play_order<T: Copy + PartialEq, R: Rng + ?Sized>(
    ids: &[T],
    first: Option<T>,
    rng: &mut R,
) -> Vec<T> {
    let mut order: Vec<T> = ids.to_vec();
    order.shuffle(rng);

    if let Some(first) = first {
        if let Some(pos) = order.iter().position(|id| *id == first) {
            order.swap(0, pos);
        }
    }

    order
}

/// Insert `id` at a random position after `cursor` in a play order
///
/// Keeps everything up to and including the cursor untouched so the part of
/// the order already walked is not disturbed.
pub fn insert_after_cursor<T, R: Rng + ?Sized>(
    order: &mut Vec<T>,
    cursor: Option<usize>,
    id: T,
    rng: &mut R,
) {
    let start = cursor.map_or(0, |c| (c + 1).min(order.len()));
    let pos = rng.gen_range(start..=order.len());
    order.insert(pos, id);
}
