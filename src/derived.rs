use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::error::panic_message;
use crate::node::{Core, Node, NodeKind, Subscription};
use crate::sources::Sources;
use crate::subscribers::{Callback, SubscriptionId};
use crate::value::Access;
use crate::{tracking, Error, Payload, Result, Value};

/// State cell whose value is recomputed from the nodes it reads.
///
/// This is the protocol node used by derived-value builders: it is read and
/// subscribed to like a [`Source`](crate::Source), but its value only changes
/// when the scheduler recomputes it during a flush. It cannot be written to.
pub struct Derived<T: Payload> {
	pub(crate) body: Rc<DerivedBody<T>>,
}

pub(crate) struct DerivedBody<T: Payload> {
	core: Core<T>,
	func: Box<dyn Fn() -> T>,
	sources: RefCell<Sources>,
	/// Cleared when a teardown released the sources.
	attached: Cell<bool>,
	this: Weak<DerivedBody<T>>,
}

impl<T: Payload> Drop for DerivedBody<T> {
	fn drop(&mut self) {
		let parent = self.this.clone() as Weak<dyn Node>;
		self.sources.get_mut().release(&parent);
	}
}

impl<T: Payload> Clone for Derived<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T: Payload> Derived<T> {
	/// Evaluates `func` once, recording what it reads, and keeps it up to date
	/// from then on.
	pub fn new(func: impl Fn() -> T + 'static) -> Self {
		let func: Box<dyn Fn() -> T> = Box::new(func);
		Derived {
			body: Rc::new_cyclic(|this: &Weak<DerivedBody<T>>| {
				let parent = this.clone() as Weak<dyn Node>;
				let (value, sources) = tracking::run_tracked(parent, || func());
				DerivedBody {
					core: Core::new(value),
					func,
					sources: RefCell::new(sources),
					attached: Cell::new(true),
					this: this.clone(),
				}
			}),
		}
	}

	#[inline]
	pub fn kind(&self) -> NodeKind {
		NodeKind::Derived
	}

	#[inline]
	pub fn get(&self) -> T {
		self.body.get()
	}

	#[inline]
	pub fn get_untracked(&self) -> T {
		self.body.core.get()
	}

	#[inline]
	pub fn with<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		self.body.track();
		self.body.core.with(func)
	}

	pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
		DerivedBody::subscribe(&self.body, Rc::new(callback))
	}

	pub fn subscriber_count(&self) -> usize {
		self.body.core.subscriber_count()
	}

	/// Number of nodes read by the last successful evaluation.
	pub fn source_count(&self) -> usize {
		self.body.sources.borrow().len()
	}

	#[cfg(test)]
	pub(crate) fn is_attached(&self) -> bool {
		self.body.attached.get()
	}
}

impl<T: Payload> DerivedBody<T> {
	pub fn get(&self) -> T {
		self.track();
		self.core.get()
	}

	fn track(&self) {
		self.attach();
		tracking::track(|| self.this.upgrade().map(|this| this as Rc<dyn Node>));
	}

	/// Re-evaluates a node whose sources were released by a teardown so it
	/// reacts to its inputs again.
	fn attach(&self) {
		if self.attached.get() {
			return;
		}
		tracing::debug!("re-attaching derived node");
		if let Err(err) = self.recompute() {
			tracing::error!(error = %err, "derived node failed to re-attach");
		}
	}

	pub fn subscribe(this: &Rc<Self>, callback: Callback<T>) -> Subscription {
		this.attach();
		let id = this.core.subscribe(callback);
		Subscription::new(this.clone(), id)
	}

	fn teardown(&self) {
		tracing::debug!(sources = self.sources.borrow().len(), "derived left idle, tearing down");
		self.core.clear();
		let parent = self.this.clone() as Weak<dyn Node>;
		self.sources.borrow_mut().release(&parent);
		self.attached.set(false);
	}
}

impl<T: Payload> Node for DerivedBody<T> {
	fn kind(&self) -> NodeKind {
		NodeKind::Derived
	}

	fn recompute(&self) -> Result<()> {
		let parent = self.this.clone() as Weak<dyn Node>;
		let (result, read) = tracking::run_tracked(parent.clone(), || {
			panic::catch_unwind(AssertUnwindSafe(|| (self.func)()))
		});

		match result {
			Ok(value) => {
				self.sources.borrow_mut().swap(read, &parent);
				self.core.replace(value);
				self.attached.set(true);
				Ok(())
			}
			Err(payload) => {
				self.sources.borrow().discard(read, &parent);
				Err(Error::Recompute {
					message: panic_message(&*payload),
				})
			}
		}
	}

	fn notify(&self) {
		self.core.notify()
	}

	fn dependents(&self) -> Vec<Rc<dyn Node>> {
		self.core.dependents()
	}

	fn source_addrs(&self) -> Vec<usize> {
		self.sources.borrow().addrs()
	}

	fn used_by(&self, derived: Weak<dyn Node>) {
		self.core.used_by(derived)
	}

	fn not_used_by(&self, derived: &Weak<dyn Node>) {
		self.core.not_used_by(derived)
	}

	fn unsubscribe(&self, id: SubscriptionId) {
		if self.core.unsubscribe(id) {
			self.teardown();
		}
	}
}

impl<T: Payload> Access<T> for DerivedBody<T> {
	fn get(&self) -> T {
		DerivedBody::get(self)
	}

	fn get_untracked(&self) -> T {
		self.core.get()
	}

	fn set(&self, _: T) -> Result<()> {
		Err(Error::DerivedWrite)
	}

	fn subscribe(self: Rc<Self>, callback: Callback<T>) -> Subscription {
		DerivedBody::subscribe(&self, callback)
	}
}

impl<T: Payload> From<Derived<T>> for Value<T> {
	fn from(derived: Derived<T>) -> Self {
		Value::new(derived.body)
	}
}

impl<T> Debug for Derived<T>
where
	T: Payload + Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.body.core.with(|value| value.fmt(f))
	}
}
