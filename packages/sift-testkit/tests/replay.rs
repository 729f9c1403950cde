use proptest::prelude::*;

use sift_domain::{ResolvedResult, merge};
use sift_testkit::batches_from_snapshots;

type Ranking = Vec<(String, f32)>;

fn ranking(scores: Vec<u16>) -> Ranking {
	let mut ranking: Ranking = scores
		.into_iter()
		.enumerate()
		.map(|(index, score)| (format!("/docs/f{index}.txt"), f32::from(score) / 500.0))
		.collect();

	ranking.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

	ranking
}

/// Successive rankings of a growing result set, as a backend would refine them.
fn arb_history() -> impl Strategy<Value = Vec<Ranking>> {
	prop::collection::vec(prop::collection::vec(0_u16..500, 0..16), 1..6).prop_map(|mut rounds| {
		rounds.sort_by_key(Vec::len);

		rounds.into_iter().map(ranking).collect()
	})
}

fn assert_matches(list: &[ResolvedResult], expected: &Ranking) -> Result<(), TestCaseError> {
	let paths: Vec<&str> = list.iter().map(|result| result.path.as_str()).collect();
	let expected_paths: Vec<&str> = expected.iter().map(|(path, _)| path.as_str()).collect();

	prop_assert_eq!(paths, expected_paths);

	for (index, (result, (_, score))) in list.iter().zip(expected).enumerate() {
		prop_assert_eq!(result.rank, index as u32 + 1);
		prop_assert_eq!(result.score, *score);
	}

	Ok(())
}

proptest! {
	/// Folding every batch reproduces each intermediate ranking exactly.
	#[test]
	fn replaying_batches_tracks_every_ranking(history in arb_history()) {
		let batches = batches_from_snapshots(&history);
		let mut list = Vec::new();

		for (batch, expected) in batches.iter().zip(&history) {
			list = merge(&list, batch.total_length, &batch.changes)
				.map_err(|err| TestCaseError::fail(err.to_string()))?;

			assert_matches(&list, expected)?;
		}

		prop_assert!(batches.last().is_some_and(|batch| batch.is_terminal()));
	}

	/// A valid batch settles to the same list whatever order its records arrive in.
	#[test]
	fn record_order_within_a_batch_does_not_matter(history in arb_history()) {
		let batches = batches_from_snapshots(&history);
		let mut list = Vec::new();

		for (batch, expected) in batches.iter().zip(&history) {
			let reversed: Vec<_> = batch.changes.iter().rev().cloned().collect();

			list = merge(&list, batch.total_length, &reversed)
				.map_err(|err| TestCaseError::fail(err.to_string()))?;

			assert_matches(&list, expected)?;
		}
	}
}
