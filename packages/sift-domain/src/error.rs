pub type Result<T, E = MergeError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
	#[error("Batch shrinks the list from {prior} to {total_length} results.")]
	ShrinkingList { prior: u32, total_length: u32 },
	#[error("Rank {rank} is outside 1..={total_length}.")]
	RankOutOfRange { rank: u32, total_length: u32 },
	#[error("Rank {rank} is the destination of more than one change.")]
	DuplicateRank { rank: u32 },
	#[error("Old rank {old_rank} is the origin of more than one move.")]
	DuplicateOldRank { old_rank: u32 },
	#[error("Move from old rank {old_rank} refers to an empty slot.")]
	MoveFromEmptySlot { old_rank: u32 },
	#[error("Move from old rank {old_rank} names {expected:?} but the slot holds {found:?}.")]
	IdentityMismatch { old_rank: u32, expected: String, found: String },
	#[error("Result {path:?} at rank {rank} was displaced without a destination.")]
	OrphanedEntry { rank: u32, path: String },
	#[error("Rank {rank} is still empty after the batch was applied.")]
	Gap { rank: u32 },
}
