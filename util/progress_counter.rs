use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A counter that can be incremented from multiple threads and read from another, used to report the progress of long running operations.
#[derive(Clone, Debug)]
pub struct ProgressCounter {
	current: Arc<AtomicU64>,
	total: u64,
}

impl ProgressCounter {
	pub fn new(total: u64) -> Self {
		Self {
			current: Arc::new(AtomicU64::new(0)),
			total,
		}
	}

	pub fn total(&self) -> u64 {
		self.total
	}

	pub fn get(&self) -> u64 {
		self.current.load(Ordering::Relaxed)
	}

	pub fn set(&self, value: u64) {
		self.current.store(value, Ordering::Relaxed);
	}

	pub fn inc(&self, amount: u64) {
		self.current.fetch_add(amount, Ordering::Relaxed);
	}
}

#[test]
fn test_progress_counter() {
	let counter = ProgressCounter::new(10);
	assert_eq!(counter.get(), 0);
	counter.inc(3);
	counter.inc(2);
	assert_eq!(counter.get(), 5);
	counter.set(10);
	assert_eq!(counter.get(), counter.total());
}

#[test]
fn test_progress_counter_shares_state_across_clones() {
	let counter = ProgressCounter::new(2);
	let clone = counter.clone();
	clone.inc(1);
	assert_eq!(counter.get(), 1);
}
