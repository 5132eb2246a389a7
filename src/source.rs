use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::node::{Core, Node, NodeKind, Subscription};
use crate::state::{Read, Subscribe, Write};
use crate::subscribers::{Callback, SubscriptionId};
use crate::value::Access;
use crate::{scheduler, tracking, Payload, Result, Value};

/// Externally writable state cell.
pub struct Source<T: Payload> {
	pub(crate) body: Rc<SourceBody<T>>,
}

pub(crate) struct SourceBody<T: Payload> {
	core: Core<T>,
	this: Weak<SourceBody<T>>,
}

impl<T: Payload> Clone for Source<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> Default for Source<T>
where
	T: Payload + Default,
{
	fn default() -> Self {
		Source::new(Default::default())
	}
}

impl<T: Payload> Source<T> {
	pub fn new(value: T) -> Self {
		Source {
			body: Rc::new_cyclic(|this| SourceBody {
				core: Core::new(value),
				this: this.clone(),
			}),
		}
	}

	/// Splits the cell into its read, write and subscribe capabilities.
	pub fn split(self) -> (Read<T>, Write<T>, Subscribe<T>) {
		(
			Read::new(self.body.clone()),
			Write::new(self.body.clone()),
			Subscribe::new(self.body),
		)
	}

	#[inline]
	pub fn kind(&self) -> NodeKind {
		NodeKind::Source
	}

	#[inline]
	pub fn get(&self) -> T {
		self.body.get()
	}

	#[inline]
	pub fn get_untracked(&self) -> T {
		self.body.get_untracked()
	}

	#[inline]
	pub fn with<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		self.body.with(func)
	}

	#[inline]
	pub fn set(&self, value: T) {
		self.body.set(value)
	}

	#[inline]
	pub fn replace(&self, value: T) -> T {
		self.body.replace(value)
	}

	#[inline]
	pub fn update(&self, func: impl FnOnce(&mut T)) {
		self.body.update(func)
	}

	pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
		SourceBody::subscribe(&self.body, Rc::new(callback))
	}

	pub fn subscriber_count(&self) -> usize {
		self.body.core.subscriber_count()
	}

	#[cfg(test)]
	pub(crate) fn weak_node(&self) -> Weak<dyn Node> {
		Rc::downgrade(&self.body) as Weak<dyn Node>
	}

	#[cfg(test)]
	pub(crate) fn addr(&self) -> usize {
		crate::addr::RcAddr::new(self.body.clone() as Rc<dyn Node>).addr()
	}
}

impl<T: Payload> SourceBody<T> {
	pub fn get(&self) -> T {
		tracking::track(|| self.this.upgrade().map(|this| this as Rc<dyn Node>));
		self.core.get()
	}

	pub fn get_untracked(&self) -> T {
		self.core.get()
	}

	pub fn with<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		tracking::track(|| self.this.upgrade().map(|this| this as Rc<dyn Node>));
		self.core.with(func)
	}

	pub fn set(&self, value: T) {
		if self.core.store(value) {
			self.invalidate();
		}
	}

	pub fn replace(&self, value: T) -> T {
		let (old, changed) = self.core.replace(value);
		if changed {
			self.invalidate();
		}
		old
	}

	pub fn update(&self, func: impl FnOnce(&mut T)) {
		let mut next = self.core.get();
		func(&mut next);
		self.set(next);
	}

	pub fn subscribe(this: &Rc<Self>, callback: Callback<T>) -> Subscription {
		let id = this.core.subscribe(callback);
		Subscription::new(this.clone(), id)
	}

	fn invalidate(&self) {
		if let Some(this) = self.this.upgrade() {
			scheduler::mark_dirty(this);
		}
	}
}

impl<T: Payload> Node for SourceBody<T> {
	fn kind(&self) -> NodeKind {
		NodeKind::Source
	}

	fn recompute(&self) -> Result<()> {
		Ok(())
	}

	fn notify(&self) {
		self.core.notify()
	}

	fn dependents(&self) -> Vec<Rc<dyn Node>> {
		self.core.dependents()
	}

	fn source_addrs(&self) -> Vec<usize> {
		Vec::new()
	}

	fn used_by(&self, derived: Weak<dyn Node>) {
		self.core.used_by(derived)
	}

	fn not_used_by(&self, derived: &Weak<dyn Node>) {
		self.core.not_used_by(derived)
	}

	fn unsubscribe(&self, id: SubscriptionId) {
		if self.core.unsubscribe(id) {
			tracing::debug!("source left idle, tearing down");
			self.core.clear();
		}
	}
}

impl<T: Payload> Access<T> for SourceBody<T> {
	fn get(&self) -> T {
		SourceBody::get(self)
	}

	fn get_untracked(&self) -> T {
		SourceBody::get_untracked(self)
	}

	fn set(&self, value: T) -> Result<()> {
		SourceBody::set(self, value);
		Ok(())
	}

	fn subscribe(self: Rc<Self>, callback: Callback<T>) -> Subscription {
		SourceBody::subscribe(&self, callback)
	}
}

impl<T: Payload> From<Source<T>> for Value<T> {
	fn from(source: Source<T>) -> Self {
		Value::new(source.body)
	}
}

impl<T> Debug for Source<T>
where
	T: Payload + Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.body.core.with(|value| value.fmt(f))
	}
}
