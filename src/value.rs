use std::rc::Rc;

use crate::node::{Node, NodeKind, Subscription};
use crate::subscribers::Callback;
use crate::{Payload, Result};

/// Read side of any node kind, erased over the kind.
pub struct Value<T> {
	value: Rc<dyn Access<T>>,
}

impl<T> Clone for Value<T> {
	fn clone(&self) -> Self {
		Value {
			value: self.value.clone(),
		}
	}
}

impl<T> Value<T>
where
	T: Payload,
{
	pub(crate) fn new(value: Rc<dyn Access<T>>) -> Self {
		Value { value }
	}

	pub fn kind(&self) -> NodeKind {
		self.value.kind()
	}

	pub fn get(&self) -> T {
		self.value.get()
	}

	pub fn get_untracked(&self) -> T {
		self.value.get_untracked()
	}

	/// Writes through to a source node. Derived nodes reject the write with
	/// [`Error::DerivedWrite`](crate::Error::DerivedWrite) and keep their value.
	pub fn set(&self, value: T) -> Result<()> {
		self.value.set(value)
	}

	pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
		self.value.clone().subscribe(Rc::new(callback))
	}
}

pub(crate) trait Access<T>: Node {
	fn get(&self) -> T;
	fn get_untracked(&self) -> T;
	fn set(&self, value: T) -> Result<()>;
	fn subscribe(self: Rc<Self>, callback: Callback<T>) -> Subscription;
}
