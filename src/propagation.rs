//! One flush worth of propagation.
//!
//! Starting from the dirty nodes, every round first recomputes the derived
//! nodes in it, then notifies all of its nodes, then moves on to their
//! dependents. A node settles at most once per flush, which bounds diamonds
//! and accidental cycles alike.

use std::collections::BTreeSet;

use fxhash::FxHashSet;

use crate::addr::RcAddr;
use crate::node::{Node, NodeKind};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Settled {
	pub rounds: usize,
	pub notified: usize,
	pub failed: usize,
}

/// Settles every node reachable from `dirty`.
///
/// Ordering only looks inside one round. A derived node reached one round
/// before one of its deeper inputs recomputes against that input's previous
/// value and, being processed already, is not revisited in this flush.
pub(crate) fn propagate(dirty: impl IntoIterator<Item = RcAddr<dyn Node>>) -> Settled {
	let mut settled = Settled::default();
	let mut processed = FxHashSet::<usize>::default();
	let mut frontier: BTreeSet<RcAddr<dyn Node>> = dirty.into_iter().collect();

	while !frontier.is_empty() {
		let round: Vec<_> = std::mem::take(&mut frontier)
			.into_iter()
			.filter(|node| !processed.contains(&node.addr()))
			.collect();
		let round = order(round);
		settled.rounds += 1;

		// Recompute the whole round before anyone is notified, so subscribers
		// never see a half-updated layer.
		let mut failed = FxHashSet::<usize>::default();
		for node in &round {
			if node.kind() == NodeKind::Derived {
				if let Err(err) = node.recompute() {
					tracing::error!(error = %err, "derived node kept its previous value");
					failed.insert(node.addr());
				}
			}
		}

		let mut notified = Vec::with_capacity(round.len());
		for node in round {
			processed.insert(node.addr());
			if failed.contains(&node.addr()) {
				settled.failed += 1;
				continue;
			}
			node.notify();
			settled.notified += 1;
			notified.push(node);
		}

		for node in &notified {
			for dependent in node.dependents() {
				let dependent = RcAddr::new(dependent);
				if !processed.contains(&dependent.addr()) {
					frontier.insert(dependent);
				}
			}
		}
	}

	settled
}

/// Orders a round so that a derived node comes after every node of the same
/// round it read last time. Nodes caught in a cycle keep their relative order
/// at the end.
fn order(round: Vec<RcAddr<dyn Node>>) -> Vec<RcAddr<dyn Node>> {
	if round.len() < 2 {
		return round;
	}

	let members: FxHashSet<usize> = round.iter().map(RcAddr::addr).collect();
	let mut emitted = FxHashSet::<usize>::default();
	let mut ordered = Vec::with_capacity(round.len());
	let mut pending = round;

	while !pending.is_empty() {
		let (ready, blocked): (Vec<_>, Vec<_>) = pending.into_iter().partition(|node| {
			let addr = node.addr();
			node.source_addrs()
				.into_iter()
				.all(|source| source == addr || !members.contains(&source) || emitted.contains(&source))
		});

		if ready.is_empty() {
			ordered.extend(blocked);
			break;
		}

		emitted.extend(ready.iter().map(RcAddr::addr));
		ordered.extend(ready);
		pending = blocked;
	}

	ordered
}

#[cfg(test)]
mod tests {
	use std::cell::{Cell, RefCell};
	use std::rc::Rc;

	use super::*;
	use crate::{tick, Derived, Payload, Source, Subscription, Value};

	fn counted<T: Payload>(count: &Rc<Cell<usize>>, func: impl Fn() -> T + 'static) -> Derived<T> {
		let count = count.clone();
		Derived::new(move || {
			count.set(count.get() + 1);
			func()
		})
	}

	fn record<T: Payload>(value: &Value<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let subscription = value.subscribe({
			let seen = seen.clone();
			move |value: &T| seen.borrow_mut().push(value.clone())
		});
		(seen, subscription)
	}

	#[test]
	fn chain_settles_each_node_once_with_fresh_values() {
		let a = Source::new(1);
		let b_count = Rc::new(Cell::new(0));
		let c_count = Rc::new(Cell::new(0));

		let b = counted(&b_count, {
			let a = a.clone();
			move || a.get() * 10
		});
		let c = counted(&c_count, {
			let b = b.clone();
			move || b.get() + 1
		});

		let (seen_a, _sa) = record(&Value::from(a.clone()));
		let (seen_b, _sb) = record(&Value::from(b.clone()));
		let (seen_c, _sc) = record(&Value::from(c.clone()));

		a.set(2);
		tick();

		assert_eq!(b_count.get(), 2);
		assert_eq!(c_count.get(), 2);
		assert_eq!(*seen_a.borrow(), vec![1, 2]);
		assert_eq!(*seen_b.borrow(), vec![10, 20]);
		assert_eq!(*seen_c.borrow(), vec![11, 21]);
	}

	#[test]
	fn diamond_settles_the_join_once() {
		let a = Source::new(1);
		let d_count = Rc::new(Cell::new(0));

		let b = Derived::new({
			let a = a.clone();
			move || a.get() + 1
		});
		let c = Derived::new({
			let a = a.clone();
			move || a.get() * 2
		});
		let d = counted(&d_count, {
			let (b, c) = (b.clone(), c.clone());
			move || b.get() + c.get()
		});
		let (seen_d, _sd) = record(&Value::from(d.clone()));

		a.set(5);
		tick();

		assert_eq!(d_count.get(), 2);
		assert_eq!(*seen_d.borrow(), vec![4, 16]);
	}

	#[test]
	fn same_round_reads_see_the_new_layer() {
		let a = Source::new(1);
		let b = Derived::new({
			let a = a.clone();
			move || a.get() * 2
		});
		let sum_count = Rc::new(Cell::new(0));
		let sum = counted(&sum_count, {
			let (a, b) = (a.clone(), b.clone());
			move || a.get() + b.get()
		});
		let (seen, _s) = record(&Value::from(sum.clone()));

		a.set(2);
		tick();

		assert_eq!(sum_count.get(), 2);
		assert_eq!(*seen.borrow(), vec![3, 6]);
	}

	#[test]
	fn failing_subscriber_does_not_stop_propagation() {
		let a = Source::new(1);
		let b = Derived::new({
			let a = a.clone();
			move || a.get() + 100
		});

		let _bad = a.subscribe(|value: &i32| {
			if *value == 2 {
				panic!("observer failure");
			}
		});
		let (seen_a, _sa) = record(&Value::from(a.clone()));
		let (seen_b, _sb) = record(&Value::from(b.clone()));

		a.set(2);
		tick();

		assert_eq!(*seen_a.borrow(), vec![1, 2]);
		assert_eq!(*seen_b.borrow(), vec![101, 102]);
	}

	#[test]
	fn failing_recompute_keeps_the_previous_value() {
		let a = Source::new(1);
		let b = Derived::new({
			let a = a.clone();
			move || {
				let value = a.get();
				if value == 13 {
					panic!("unlucky input");
				}
				value * 2
			}
		});
		let c = Derived::new({
			let b = b.clone();
			move || b.get() + 1
		});
		let (seen_b, _sb) = record(&Value::from(b.clone()));
		let (seen_c, _sc) = record(&Value::from(c.clone()));

		a.set(13);
		tick();
		assert_eq!(b.get(), 2);
		assert_eq!(b.source_count(), 1);
		assert_eq!(*seen_b.borrow(), vec![2]);
		assert_eq!(*seen_c.borrow(), vec![3]);

		a.set(4);
		tick();
		assert_eq!(*seen_b.borrow(), vec![2, 8]);
		assert_eq!(*seen_c.borrow(), vec![3, 9]);
	}

	#[test]
	fn self_reading_node_settles_once_per_flush() {
		let a = Source::new(1);
		let count = Rc::new(Cell::new(0));
		let slot: Rc<RefCell<Option<Derived<i32>>>> = Rc::new(RefCell::new(None));

		let looped = counted(&count, {
			let (a, slot) = (a.clone(), slot.clone());
			move || {
				let previous = slot.borrow().as_ref().map(|this| this.get()).unwrap_or(0);
				a.get() + previous
			}
		});
		*slot.borrow_mut() = Some(looped.clone());

		a.set(2);
		tick();
		assert_eq!(count.get(), 2);
		assert_eq!(looped.get_untracked(), 3);

		a.set(3);
		tick();
		assert_eq!(count.get(), 3);
		assert_eq!(looped.get_untracked(), 6);
		assert_eq!(looped.source_count(), 1);

		let body = Rc::downgrade(&looped.body);
		slot.borrow_mut().take();
		drop(looped);
		assert!(body.upgrade().is_none());
	}

	#[test]
	fn join_ahead_of_its_deeper_input_keeps_the_earlier_layer() {
		let a = Source::new(1);
		let b = Derived::new({
			let a = a.clone();
			move || a.get() + 1
		});
		let c = Derived::new({
			let b = b.clone();
			move || b.get() + 1
		});
		let d = Derived::new({
			let (a, c) = (a.clone(), c.clone());
			move || a.get() + c.get()
		});
		let (seen_d, _sd) = record(&Value::from(d.clone()));

		a.set(2);
		tick();

		// `d` settles in the round of `b`, before `c` has caught up.
		assert_eq!(c.get_untracked(), 4);
		assert_eq!(d.get_untracked(), 5);
		assert_eq!(*seen_d.borrow(), vec![4, 5]);
	}

	#[test]
	fn settled_counts_rounds_and_notifications() {
		let a = Source::new(1);
		let _b = Derived::new({
			let a = a.clone();
			move || a.get() + 1
		});

		let dirty = vec![RcAddr::new(a.body.clone() as Rc<dyn Node>)];
		let settled = propagate(dirty);

		assert_eq!(
			settled,
			Settled {
				rounds: 2,
				notified: 2,
				failed: 0,
			}
		);
	}
}
