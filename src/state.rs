//! The factory: one source cell handed out as three separate capabilities.

use std::rc::Rc;

use crate::node::Subscription;
use crate::source::SourceBody;
use crate::{Payload, Source, Value};

/// Creates a source cell holding `initial` and returns its read, write and
/// subscribe capabilities.
///
/// ```
/// let (count, set_count, on_count) = kraai::create(1);
///
/// let sub = on_count.subscribe(|value| println!("count is {value}"));
/// set_count.set(count.get() + 1);
/// kraai::tick();
/// sub.unsubscribe();
/// ```
pub fn create<T: Payload>(initial: T) -> (Read<T>, Write<T>, Subscribe<T>) {
	Source::new(initial).split()
}

/// Read capability of a source cell.
pub struct Read<T: Payload> {
	body: Rc<SourceBody<T>>,
}

/// Write capability of a source cell.
pub struct Write<T: Payload> {
	body: Rc<SourceBody<T>>,
}

/// Subscribe capability of a source cell.
pub struct Subscribe<T: Payload> {
	body: Rc<SourceBody<T>>,
}

impl<T: Payload> Read<T> {
	pub(crate) fn new(body: Rc<SourceBody<T>>) -> Self {
		Read { body }
	}

	/// Current value. Inside a derived computation the read is tracked.
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
}

impl<T: Payload> Write<T> {
	pub(crate) fn new(body: Rc<SourceBody<T>>) -> Self {
		Write { body }
	}

	/// Stores `value` and schedules a flush, unless `value` is the same
	/// primitive that is already stored.
	#[inline]
	pub fn set(&self, value: T) {
		self.body.set(value)
	}

	#[inline]
	pub fn update(&self, func: impl FnOnce(&mut T)) {
		self.body.update(func)
	}
}

impl<T: Payload> Subscribe<T> {
	pub(crate) fn new(body: Rc<SourceBody<T>>) -> Self {
		Subscribe { body }
	}

	/// Registers `callback`, calls it right away with the current value and
	/// then once per flush that touches this cell.
	pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
		SourceBody::subscribe(&self.body, Rc::new(callback))
	}
}

macro_rules! capability {
	($($name:ident),*) => {
		$(
			impl<T: Payload> Clone for $name<T> {
				fn clone(&self) -> Self {
					$name {
						body: self.body.clone(),
					}
				}
			}

			impl<T: Payload> From<$name<T>> for Source<T> {
				fn from(capability: $name<T>) -> Self {
					Source {
						body: capability.body,
					}
				}
			}
		)*
	};
}

capability!(Read, Write, Subscribe);

impl<T: Payload> From<Read<T>> for Value<T> {
	fn from(read: Read<T>) -> Self {
		Value::new(read.body)
	}
}
