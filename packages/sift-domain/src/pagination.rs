use std::{num::NonZeroU32, ops::Range};

use serde::Serialize;

/// Page bookkeeping for one session. Pages are 1-based.
///
/// Until the result stream is exhausted the page count is unknown and page moves are
/// optimistic; afterwards every move is clamped into `1..=max(1, max_pages)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Pagination {
	page_size: NonZeroU32,
	current_page: u32,
	max_pages: Option<u32>,
}
impl Pagination {
	pub fn new(page_size: NonZeroU32, initial_page: u32) -> Self {
		Self { page_size, current_page: initial_page.max(1), max_pages: None }
	}

	pub fn page_size(&self) -> u32 {
		self.page_size.get()
	}

	pub fn current_page(&self) -> u32 {
		self.current_page
	}

	pub fn max_pages(&self) -> Option<u32> {
		self.max_pages
	}

	pub fn has_next_page(&self) -> bool {
		self.max_pages.is_none_or(|max| self.current_page < max)
	}

	pub fn set_page(&mut self, page: u32) -> u32 {
		let page = page.max(1);

		self.current_page = match self.max_pages {
			Some(max) => clamp_page(page, max),
			None => page,
		};

		self.current_page
	}

	pub fn next_page(&mut self) -> u32 {
		self.set_page(self.current_page.saturating_add(1))
	}

	pub fn previous_page(&mut self) -> u32 {
		self.set_page(self.current_page.saturating_sub(1))
	}

	/// Fixes the page count once the final list length is known and pulls the current page
	/// back into range.
	pub fn mark_exhausted(&mut self, total_length: u32) -> u32 {
		let max = max_pages(total_length, self.page_size);

		self.max_pages = Some(max);
		self.current_page = clamp_page(self.current_page, max);

		max
	}

	/// Number of results the list must hold to fully cover the current page.
	pub fn fill_target(&self) -> usize {
		self.current_page as usize * self.page_size.get() as usize
	}

	pub fn window(&self, len: usize) -> Range<usize> {
		window(self.current_page, self.page_size, len)
	}
}

pub fn max_pages(total_length: u32, page_size: NonZeroU32) -> u32 {
	total_length.div_ceil(page_size.get())
}

pub fn clamp_page(page: u32, max_pages: u32) -> u32 {
	page.clamp(1, max_pages.max(1))
}

/// Index range of `page` within a list of `len` results; empty past the end.
pub fn window(page: u32, page_size: NonZeroU32, len: usize) -> Range<usize> {
	let size = page_size.get() as usize;
	let start = (page.max(1) as usize - 1).saturating_mul(size).min(len);
	let end = start.saturating_add(size).min(len);

	start..end
}

#[cfg(test)]
mod tests {
	use super::*;

	fn size(n: u32) -> NonZeroU32 {
		NonZeroU32::new(n).expect("Page size must be non-zero.")
	}

	#[test]
	fn windows_cover_full_and_partial_pages() {
		assert_eq!(window(2, size(20), 45), 20..40);
		assert_eq!(window(3, size(20), 45), 40..45);
		assert_eq!(window(4, size(20), 45), 45..45);
	}

	#[test]
	fn page_moves_are_optimistic_until_exhausted() {
		let mut pagination = Pagination::new(size(10), 1);

		assert_eq!(pagination.set_page(7), 7);
		assert!(pagination.has_next_page());
		assert_eq!(pagination.previous_page(), 6);
	}

	#[test]
	fn exhaustion_clamps_current_page() {
		let mut pagination = Pagination::new(size(20), 5);

		assert_eq!(pagination.mark_exhausted(45), 3);
		assert_eq!(pagination.current_page(), 3);
		assert_eq!(pagination.next_page(), 3);
		assert!(!pagination.has_next_page());
	}

	#[test]
	fn empty_result_set_stays_on_first_page() {
		let mut pagination = Pagination::new(size(20), 2);

		assert_eq!(pagination.mark_exhausted(0), 0);
		assert_eq!(pagination.current_page(), 1);
		assert_eq!(pagination.previous_page(), 1);
	}
}
