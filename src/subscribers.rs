use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::error::panic_message;

pub(crate) type Callback<T> = Rc<dyn Fn(&T)>;

pub(crate) type Entry<T> = (SubscriptionId, Callback<T>);

/// Identifies one registered callback on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
	fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

pub(crate) struct Subscribers<T, const N: usize = 2> {
	vec: SmallVec<[Entry<T>; N]>,
}

impl<T, const N: usize> Default for Subscribers<T, N> {
	fn default() -> Self {
		Subscribers {
			vec: SmallVec::new(),
		}
	}
}

impl<T, const N: usize> Subscribers<T, N> {
	pub fn add(&mut self, callback: Callback<T>) -> SubscriptionId {
		let id = SubscriptionId::next();
		self.vec.push((id, callback));
		id
	}

	pub fn remove(&mut self, id: SubscriptionId) -> bool {
		match self.vec.iter().position(|(item, _)| *item == id) {
			Some(index) => {
				self.vec.remove(index);
				true
			}
			None => false,
		}
	}

	pub fn contains(&self, id: SubscriptionId) -> bool {
		self.vec.iter().any(|(item, _)| *item == id)
	}

	pub fn is_empty(&self) -> bool {
		self.vec.is_empty()
	}

	pub fn len(&self) -> usize {
		self.vec.len()
	}

	pub fn clear(&mut self) {
		self.vec.clear();
	}

	/// Callbacks registered right now. Delivery goes through a snapshot so a
	/// callback may subscribe or unsubscribe without touching the live list.
	pub fn snapshot(&self) -> SmallVec<[Entry<T>; N]> {
		self.vec.clone()
	}
}

/// Invokes every callback with `value`. Entries for which `registered`
/// reports `false` at their turn are skipped, so a callback removed by an
/// earlier one in the same delivery stays silent.
///
/// A panicking callback is reported and skipped; the remaining callbacks
/// still run. Returns the number of failures.
pub(crate) fn deliver<T>(
	callbacks: &[Entry<T>],
	value: &T,
	registered: impl Fn(SubscriptionId) -> bool,
) -> usize {
	let mut failed = 0;
	for (id, callback) in callbacks {
		if !registered(*id) {
			continue;
		}
		if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(value))) {
			failed += 1;
			tracing::error!(
				panic = %panic_message(&*payload),
				"subscriber panicked, continuing delivery"
			);
		}
	}
	failed
}
