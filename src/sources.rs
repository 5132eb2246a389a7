use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

use crate::addr::RcAddr;
use crate::node::Node;

/// Upstream nodes read by one evaluation of a derived node.
///
/// Holds strong references, so a derived node keeps what it reads alive. The
/// reverse edges live in each source's `used_by` set as weak references.
#[derive(Default)]
pub(crate) struct Sources {
	based_on: BTreeSet<RcAddr<dyn Node>>,
}

impl Sources {
	pub fn new() -> Self {
		Self {
			based_on: BTreeSet::new(),
		}
	}

	pub fn based_on(&mut self, observable: Rc<dyn Node>) {
		self.based_on.insert(RcAddr::new(observable));
	}

	pub fn len(&self) -> usize {
		self.based_on.len()
	}

	pub fn addrs(&self) -> Vec<usize> {
		self.based_on.iter().map(RcAddr::addr).collect()
	}

	/// Unregisters `parent` from every source and forgets them.
	pub fn release(&mut self, parent: &Weak<dyn Node>) {
		for item in std::mem::take(&mut self.based_on) {
			item.not_used_by(parent)
		}
	}

	/// Replaces the recorded sources with `next`, unregistering `parent` from
	/// the ones it no longer reads.
	pub fn swap(&mut self, next: Sources, parent: &Weak<dyn Node>) {
		let prev = std::mem::replace(&mut self.based_on, next.based_on);

		prev.iter()
			.filter(|k| !self.based_on.contains(*k))
			.for_each(|k| k.not_used_by(parent));
	}

	/// Drops the edges registered by an evaluation that did not complete,
	/// keeping the ones still recorded here.
	pub fn discard(&self, attempt: Sources, parent: &Weak<dyn Node>) {
		attempt
			.based_on
			.iter()
			.filter(|k| !self.based_on.contains(*k))
			.for_each(|k| k.not_used_by(parent));
	}
}
