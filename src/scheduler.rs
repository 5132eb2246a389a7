use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::addr::RcAddr;
use crate::node::Node;
use crate::{microtask, propagation};

thread_local! {
	static SCHEDULER: RefCell<Scheduler> = RefCell::new(Scheduler::default());
	static STARTED: Cell<bool> = Cell::new(false);
}

/// Pending invalidations plus the Idle / Flush-Armed state.
#[derive(Default)]
struct Scheduler {
	pending: BTreeSet<RcAddr<dyn Node>>,
	armed: bool,
}

/// Queues `node` for the next flush, arming one if none is armed yet.
pub(crate) fn mark_dirty(node: Rc<dyn Node>) {
	let arm = SCHEDULER.with(|scheduler| {
		let mut scheduler = scheduler.borrow_mut();
		scheduler.pending.insert(RcAddr::new(node));
		!std::mem::replace(&mut scheduler.armed, true)
	});

	if arm {
		tracing::trace!("flush armed");
		microtask::queue(flush);
	}
}

/// Returns `true` while a flush is queued but has not started yet.
pub fn is_flush_armed() -> bool {
	SCHEDULER.with(|scheduler| scheduler.borrow().armed)
}

pub(crate) fn flush() {
	// Back to idle before propagating: writes made by subscribers arm a new
	// flush instead of joining this one.
	let dirty = SCHEDULER.with(|scheduler| {
		let mut scheduler = scheduler.borrow_mut();
		scheduler.armed = false;
		std::mem::take(&mut scheduler.pending)
	});

	tracing::trace!(pending = dirty.len(), "flush started");
	let settled = propagation::propagate(dirty);
	tracing::trace!(
		rounds = settled.rounds,
		notified = settled.notified,
		failed = settled.failed,
		"flush finished"
	);
}

pub fn in_batch() -> bool {
	STARTED.with(|s| s.get())
}

/// Runs `func` as one unit of writes. When the outermost batch returns on a
/// target without a host microtask queue, deferred flushes are drained, so the
/// writes are settled by the time `batch` returns.
pub fn batch<R>(func: impl FnOnce() -> R) -> R {
	let scope = BatchScope::start();
	let result = func();
	if scope.is_root {
		drop(scope);
		#[cfg(not(target_arch = "wasm32"))]
		microtask::tick();
	}
	result
}

struct BatchScope {
	is_root: bool,
}

impl BatchScope {
	fn start() -> Self {
		let is_root = STARTED.with(|s| !s.replace(true));
		BatchScope { is_root }
	}
}

impl Drop for BatchScope {
	fn drop(&mut self) {
		if self.is_root {
			STARTED.with(|s| s.set(false));
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::panic::{self, AssertUnwindSafe};

	use super::*;
	use crate::{tick, Source};

	#[test]
	fn writes_in_one_turn_coalesce_into_one_flush() {
		let a = Source::new(0);
		let seen = Rc::new(RefCell::new(Vec::new()));
		let _sub = a.subscribe({
			let seen = seen.clone();
			move |value: &i32| seen.borrow_mut().push(*value)
		});

		for value in 1..=5 {
			a.set(value);
		}
		assert!(is_flush_armed());

		assert_eq!(tick(), 1);
		assert!(!is_flush_armed());
		assert_eq!(*seen.borrow(), vec![0, 5]);
	}

	#[test]
	fn writes_from_subscribers_arm_a_new_flush() {
		let a = Source::new(1);
		let b = Source::new(10);
		let armed_inside = Rc::new(RefCell::new(Vec::new()));
		let seen_b = Rc::new(RefCell::new(Vec::new()));

		let _sub_a = a.subscribe({
			let (b, armed_inside) = (b.clone(), armed_inside.clone());
			move |value: &i32| {
				if *value == 2 {
					b.set(20);
					armed_inside.borrow_mut().push(is_flush_armed());
				}
			}
		});
		let _sub_b = b.subscribe({
			let seen_b = seen_b.clone();
			move |value: &i32| seen_b.borrow_mut().push(*value)
		});

		a.set(2);
		assert_eq!(tick(), 2);
		assert_eq!(*armed_inside.borrow(), vec![true]);
		assert_eq!(*seen_b.borrow(), vec![10, 20]);
	}

	#[test]
	fn batch_settles_before_returning() {
		let a = Source::new(1);
		let seen = Rc::new(RefCell::new(Vec::new()));
		let _sub = a.subscribe({
			let seen = seen.clone();
			move |value: &i32| seen.borrow_mut().push(*value)
		});

		let returned = batch(|| {
			assert!(in_batch());
			batch(|| a.set(2));
			assert!(seen.borrow().len() == 1);
			a.set(3);
			"done"
		});

		assert_eq!(returned, "done");
		assert!(!in_batch());
		assert_eq!(*seen.borrow(), vec![1, 3]);
	}

	#[test]
	fn panicking_batch_resets_its_state() {
		let result = panic::catch_unwind(AssertUnwindSafe(|| {
			batch(|| panic!("batch failure"));
		}));
		assert!(result.is_err());
		assert!(!in_batch());
	}
}
