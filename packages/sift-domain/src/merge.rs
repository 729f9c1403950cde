//! Folds one batch of rank changes into a settled list.
//!
//! The working buffer is indexed by `rank - 1`. Insertions are placed first, in batch order.
//! Moves are then resolved in batch order: the occupant still sitting at a move's old rank is
//! lifted out and placed at its destination. Placing an entry into an occupied slot displaces
//! the occupant, which must itself have a pending move; the displaced entry is placed next, and
//! so on until a placement lands in an empty slot. Swaps, rotations and longer permutation
//! cycles resolve in one pass per chain.

use std::collections::{HashMap, HashSet};

use crate::{ChangeRecord, MergeError, ResolvedResult, Result};

/// Applies `changes` to `current` and returns the new list of exactly `total_length` results.
///
/// `current` is left untouched. Any batch that cannot produce a dense, duplicate-free list is
/// rejected as a whole.
pub fn merge(
	current: &[ResolvedResult],
	total_length: u32,
	changes: &[ChangeRecord],
) -> Result<Vec<ResolvedResult>> {
	let prior = current.len() as u32;

	if total_length < prior {
		return Err(MergeError::ShrinkingList { prior, total_length });
	}

	validate(prior, total_length, changes)?;

	let mut slots: Vec<Option<ResolvedResult>> = Vec::with_capacity(total_length as usize);

	slots.extend(current.iter().cloned().map(Some));
	slots.resize(total_length as usize, None);

	let mut insertions = Vec::new();
	let mut moves = Vec::new();

	for change in changes {
		match change.old_rank {
			Some(old_rank) => moves.push((old_rank, change)),
			None => insertions.push(change),
		}
	}

	let mut pending: HashMap<u32, &ChangeRecord> =
		moves.iter().map(|(old_rank, change)| (*old_rank, *change)).collect();

	for change in insertions {
		place(&mut slots, &mut pending, change)?;
	}

	for (old_rank, _) in &moves {
		// Already relocated as part of an earlier displacement chain.
		let Some(change) = pending.remove(old_rank) else {
			continue;
		};
		let occupant = slots[*old_rank as usize - 1]
			.take()
			.ok_or(MergeError::MoveFromEmptySlot { old_rank: *old_rank })?;

		check_identity(*old_rank, &occupant, change)?;
		place(&mut slots, &mut pending, change)?;
	}

	slots
		.into_iter()
		.enumerate()
		.map(|(index, slot)| slot.ok_or(MergeError::Gap { rank: index as u32 + 1 }))
		.collect()
}

fn validate(prior: u32, total_length: u32, changes: &[ChangeRecord]) -> Result<()> {
	let mut destinations = HashSet::with_capacity(changes.len());
	let mut origins = HashSet::new();

	for change in changes {
		if change.rank == 0 || change.rank > total_length {
			return Err(MergeError::RankOutOfRange { rank: change.rank, total_length });
		}
		if !destinations.insert(change.rank) {
			return Err(MergeError::DuplicateRank { rank: change.rank });
		}

		let Some(old_rank) = change.old_rank else {
			continue;
		};

		if old_rank == 0 || old_rank > total_length {
			return Err(MergeError::RankOutOfRange { rank: old_rank, total_length });
		}
		if old_rank > prior {
			return Err(MergeError::MoveFromEmptySlot { old_rank });
		}
		if !origins.insert(old_rank) {
			return Err(MergeError::DuplicateOldRank { old_rank });
		}
	}

	Ok(())
}

/// Runs one displacement chain starting with `change`.
fn place<'a>(
	slots: &mut [Option<ResolvedResult>],
	pending: &mut HashMap<u32, &'a ChangeRecord>,
	mut change: &'a ChangeRecord,
) -> Result<()> {
	loop {
		let index = change.rank as usize - 1;
		let Some(displaced) = slots[index].replace(ResolvedResult::from_change(change)) else {
			return Ok(());
		};
		// The displaced entry has not been placed in this batch yet, so its slot is still its
		// old rank.
		let displaced_rank = index as u32 + 1;

		match pending.remove(&displaced_rank) {
			Some(next) => {
				check_identity(displaced_rank, &displaced, next)?;

				change = next;
			},
			None =>
				return Err(MergeError::OrphanedEntry {
					rank: displaced_rank,
					path: displaced.path,
				}),
		}
	}
}

fn check_identity(old_rank: u32, occupant: &ResolvedResult, change: &ChangeRecord) -> Result<()> {
	if occupant.path == change.path {
		Ok(())
	} else {
		Err(MergeError::IdentityMismatch {
			old_rank,
			expected: change.path.clone(),
			found: occupant.path.clone(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn settled(paths: &[&str]) -> Vec<ResolvedResult> {
		paths
			.iter()
			.enumerate()
			.map(|(index, path)| ResolvedResult {
				rank: index as u32 + 1,
				name: path.to_string(),
				path: path.to_string(),
				score: 1.0 - index as f32 * 0.1,
			})
			.collect()
	}

	fn paths(list: &[ResolvedResult]) -> Vec<&str> {
		list.iter().map(|result| result.path.as_str()).collect()
	}

	fn moved(old_rank: u32, rank: u32, path: &str) -> ChangeRecord {
		ChangeRecord::moved(old_rank, rank, path, path, 0.5)
	}

	#[test]
	fn places_insertions_into_empty_list() {
		let changes = vec![
			ChangeRecord::inserted(1, "cat.png", "/pics/cat.png", 0.9),
			ChangeRecord::inserted(2, "dog.png", "/pics/dog.png", 0.8),
		];
		let merged = merge(&[], 2, &changes).expect("Merge failed.");

		assert_eq!(merged.len(), 2);
		assert_eq!(merged[0].name, "cat.png");
		assert_eq!(merged[0].rank, 1);
		assert_eq!(merged[1].name, "dog.png");
		assert_eq!(merged[1].rank, 2);
	}

	#[test]
	fn empty_batch_with_same_length_is_identity() {
		let current = settled(&["a", "b", "c"]);
		let merged = merge(&current, 3, &[]).expect("Merge failed.");

		assert_eq!(merged, current);
	}

	#[test]
	fn swaps_two_entries_and_leaves_the_rest() {
		let current = settled(&["a", "b", "c"]);
		let changes = vec![moved(1, 3, "a"), moved(3, 1, "c")];
		let merged = merge(&current, 3, &changes).expect("Merge failed.");

		assert_eq!(paths(&merged), vec!["c", "b", "a"]);
		assert_eq!(merged[1], current[1]);
	}

	#[test]
	fn resolves_rotation_cycle() {
		let current = settled(&["a", "b", "c", "d"]);
		let changes = vec![moved(1, 2, "a"), moved(2, 3, "b"), moved(3, 4, "c"), moved(4, 1, "d")];
		let merged = merge(&current, 4, &changes).expect("Merge failed.");

		assert_eq!(paths(&merged), vec!["d", "a", "b", "c"]);
	}

	#[test]
	fn insertion_pushes_a_chain_down() {
		let current = settled(&["a", "b"]);
		let changes = vec![
			ChangeRecord::inserted(1, "n", "n", 0.99),
			moved(1, 2, "a"),
			moved(2, 3, "b"),
		];
		let merged = merge(&current, 3, &changes).expect("Merge failed.");

		assert_eq!(paths(&merged), vec!["n", "a", "b"]);
		assert!(merged.iter().enumerate().all(|(index, result)| result.rank == index as u32 + 1));
	}

	#[test]
	fn score_only_change_keeps_position_and_takes_new_score() {
		let current = settled(&["a", "b"]);
		let changes = vec![ChangeRecord::moved(2, 2, "b", "b", 0.77)];
		let merged = merge(&current, 2, &changes).expect("Merge failed.");

		assert_eq!(paths(&merged), vec!["a", "b"]);
		assert_eq!(merged[1].score, 0.77);
	}

	#[test]
	fn does_not_mutate_input() {
		let current = settled(&["a", "b"]);
		let before = current.clone();
		let _ = merge(&current, 2, &[moved(1, 2, "a"), moved(2, 1, "b")]).expect("Merge failed.");

		assert_eq!(current, before);
	}

	#[test]
	fn rejects_shrinking_list() {
		let current = settled(&["a", "b"]);

		assert_eq!(
			merge(&current, 1, &[]),
			Err(MergeError::ShrinkingList { prior: 2, total_length: 1 })
		);
	}

	#[test]
	fn rejects_growth_without_entries() {
		let current = settled(&["a"]);

		assert_eq!(merge(&current, 2, &[]), Err(MergeError::Gap { rank: 2 }));
	}

	#[test]
	fn rejects_displacement_without_destination() {
		let current = settled(&["a", "b"]);
		let changes = vec![ChangeRecord::inserted(1, "n", "n", 0.9)];

		assert_eq!(
			merge(&current, 3, &changes),
			Err(MergeError::OrphanedEntry { rank: 1, path: "a".to_string() })
		);
	}

	#[test]
	fn rejects_move_naming_a_different_occupant() {
		let current = settled(&["a", "b"]);
		let changes = vec![moved(1, 2, "x"), moved(2, 1, "b")];

		assert!(matches!(
			merge(&current, 2, &changes),
			Err(MergeError::IdentityMismatch { old_rank: 1, .. })
		));
	}
}
