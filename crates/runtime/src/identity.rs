//! Batch-scoped identifier allocation.

use pathbatch_protocol::NodeId;

/// Issues increasing node ids for one batch.
///
/// Every batch owns a fresh allocator, so ids restart at [`BASELINE`](Self::BASELINE)
/// per batch and are never reused within it.
#[derive(Debug)]
pub struct IdentityAllocator {
	next: NodeId,
}

impl Default for IdentityAllocator {
	fn default() -> Self {
		Self::new()
	}
}

impl IdentityAllocator {
	/// First id handed out.
	pub const BASELINE: NodeId = 0;

	pub fn new() -> Self {
		Self { next: Self::BASELINE }
	}

	/// Returns the next id and advances the counter.
	pub fn next(&mut self) -> NodeId {
		let id = self.next;
		self.next += 1;
		id
	}
}
