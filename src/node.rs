use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::addr::WeakAddr;
use crate::subscribers::{self, Callback, Subscribers, SubscriptionId};
use crate::{Payload, Result};

/// Discriminant of a state node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
	/// Changes only through explicit writes.
	Source,
	/// Changes only through recomputation from the nodes it reads.
	Derived,
}

/// Type-erased view of a state node, as seen by the scheduler and by the
/// nodes wired to it.
pub(crate) trait Node: 'static {
	fn kind(&self) -> NodeKind;

	/// Re-evaluates a derived node. Sources have nothing to recompute.
	fn recompute(&self) -> Result<()>;

	/// Delivers the current value to every subscriber.
	fn notify(&self);

	/// Live downstream nodes.
	fn dependents(&self) -> Vec<Rc<dyn Node>>;

	/// Addresses of the upstream nodes read by the last recompute.
	fn source_addrs(&self) -> Vec<usize>;

	/// Notify this node that `derived` started to read it.
	fn used_by(&self, derived: Weak<dyn Node>);

	/// Notify this node that `derived` stopped reading it.
	fn not_used_by(&self, derived: &Weak<dyn Node>);

	fn unsubscribe(&self, id: SubscriptionId);
}

/// State shared by both node kinds: the value, its subscribers and the
/// downstream edges.
pub(crate) struct Core<T> {
	value: RefCell<T>,
	subscribers: RefCell<Subscribers<T>>,
	used_by: RefCell<BTreeSet<WeakAddr<dyn Node>>>,
}

impl<T: Payload> Core<T> {
	pub fn new(value: T) -> Self {
		Core {
			value: RefCell::new(value),
			subscribers: RefCell::new(Subscribers::default()),
			used_by: RefCell::new(BTreeSet::new()),
		}
	}

	pub fn get(&self) -> T {
		self.value.borrow().clone()
	}

	pub fn with<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		func(&*self.value.borrow())
	}

	/// Stores `value` unless it is the same as the current one. Returns
	/// whether the stored value changed.
	pub fn store(&self, value: T) -> bool {
		if self.value.borrow().same(&value) {
			return false;
		}
		*self.value.borrow_mut() = value;
		true
	}

	/// Stores `value` unconditionally and returns the previous one together
	/// with whether it counts as a change.
	pub fn replace(&self, value: T) -> (T, bool) {
		let old = std::mem::replace(&mut *self.value.borrow_mut(), value);
		let changed = !old.same(&*self.value.borrow());
		(old, changed)
	}

	pub fn notify(&self) {
		let value = self.get();
		let callbacks = self.subscribers.borrow().snapshot();
		subscribers::deliver(&callbacks, &value, |id| self.is_subscribed(id));
	}

	/// Registers `callback` and immediately hands it the current value.
	pub fn subscribe(&self, callback: Callback<T>) -> SubscriptionId {
		let id = self.subscribers.borrow_mut().add(callback.clone());
		let value = self.get();
		subscribers::deliver(&[(id, callback)], &value, |id| self.is_subscribed(id));
		id
	}

	fn is_subscribed(&self, id: SubscriptionId) -> bool {
		self.subscribers.borrow().contains(id)
	}

	/// Removes a callback. Returns `true` when this left the node idle.
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		let removed = self.subscribers.borrow_mut().remove(id);
		removed && self.is_idle()
	}

	pub fn is_idle(&self) -> bool {
		self.subscribers.borrow().is_empty()
			&& self.used_by.borrow().iter().all(|item| !item.is_live())
	}

	pub fn subscriber_count(&self) -> usize {
		self.subscribers.borrow().len()
	}

	pub fn dependents(&self) -> Vec<Rc<dyn Node>> {
		let mut used_by = self.used_by.borrow_mut();
		used_by.retain(WeakAddr::is_live);
		used_by.iter().filter_map(|item| item.upgrade()).collect()
	}

	pub fn used_by(&self, derived: Weak<dyn Node>) {
		self.used_by.borrow_mut().insert(WeakAddr::new(derived));
	}

	pub fn not_used_by(&self, derived: &Weak<dyn Node>) {
		self.used_by
			.borrow_mut()
			.remove(&WeakAddr::new(derived.clone()));
	}

	/// Drops every subscriber and downstream edge.
	pub fn clear(&self) {
		self.subscribers.borrow_mut().clear();
		self.used_by.borrow_mut().clear();
	}
}

/// Disposer returned by `subscribe`.
#[must_use = "the callback stays registered until `unsubscribe` is called"]
pub struct Subscription {
	node: Rc<dyn Node>,
	id: SubscriptionId,
}

impl Subscription {
	pub(crate) fn new(node: Rc<dyn Node>, id: SubscriptionId) -> Self {
		Subscription { node, id }
	}

	pub fn id(&self) -> SubscriptionId {
		self.id
	}

	/// Removes the callback. If the node is left without subscribers and
	/// dependents, its edges are torn down.
	pub fn unsubscribe(self) {
		self.node.unsubscribe(self.id)
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("kind", &self.node.kind())
			.finish()
	}
}
