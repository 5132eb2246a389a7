use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::{Rc, Weak};

/// Thin address of a (possibly unsized) pointee. Vtable halves are ignored so
/// two handles to the same allocation always compare equal.
#[inline]
fn thin<T: ?Sized>(ptr: *const T) -> usize {
	ptr as *const () as usize
}

/// Strong handle ordered and hashed by the address of its allocation.
pub struct RcAddr<T: ?Sized> {
	ptr: Rc<T>,
}

impl<T: ?Sized> RcAddr<T> {
	pub fn new(ptr: Rc<T>) -> Self {
		RcAddr { ptr }
	}

	pub fn addr(&self) -> usize {
		thin(Rc::as_ptr(&self.ptr))
	}
}

impl<T: ?Sized> Clone for RcAddr<T> {
	fn clone(&self) -> Self {
		RcAddr {
			ptr: self.ptr.clone(),
		}
	}
}

impl<T: ?Sized> Deref for RcAddr<T> {
	type Target = Rc<T>;
	fn deref(&self) -> &Self::Target {
		&self.ptr
	}
}

impl<T: ?Sized> PartialEq for RcAddr<T> {
	fn eq(&self, other: &Self) -> bool {
		self.addr() == other.addr()
	}
}

impl<T: ?Sized> Eq for RcAddr<T> {}

impl<T: ?Sized> Ord for RcAddr<T> {
	fn cmp(&self, other: &Self) -> Ordering {
		self.addr().cmp(&other.addr())
	}
}

impl<T: ?Sized> PartialOrd for RcAddr<T> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl<T: ?Sized> Hash for RcAddr<T> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.addr().hash(state)
	}
}

/// Weak counterpart of [`RcAddr`]. A dead entry keeps its allocation reserved,
/// so its address cannot be handed to a new node while the entry exists.
pub struct WeakAddr<T: ?Sized> {
	ptr: Weak<T>,
}

impl<T: ?Sized> WeakAddr<T> {
	pub fn new(ptr: Weak<T>) -> Self {
		WeakAddr { ptr }
	}

	pub fn addr(&self) -> usize {
		thin(Weak::as_ptr(&self.ptr))
	}

	pub fn is_live(&self) -> bool {
		self.ptr.strong_count() > 0
	}
}

impl<T: ?Sized> Deref for WeakAddr<T> {
	type Target = Weak<T>;
	fn deref(&self) -> &Self::Target {
		&self.ptr
	}
}

impl<T: ?Sized> PartialEq for WeakAddr<T> {
	fn eq(&self, other: &Self) -> bool {
		self.addr() == other.addr()
	}
}

impl<T: ?Sized> Eq for WeakAddr<T> {}

impl<T: ?Sized> Ord for WeakAddr<T> {
	fn cmp(&self, other: &Self) -> Ordering {
		self.addr().cmp(&other.addr())
	}
}

impl<T: ?Sized> PartialOrd for WeakAddr<T> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

#[cfg(test)]
mod tests {
	use std::fmt::Debug;

	use super::*;

	#[test]
	fn trait_objects_compare_by_allocation() {
		let value = Rc::new(5_u8);
		let a: Rc<dyn Debug> = value.clone();
		let b: Rc<dyn Debug> = value;
		let other: Rc<dyn Debug> = Rc::new(5_u8);

		assert!(RcAddr::new(a.clone()) == RcAddr::new(b));
		assert!(RcAddr::new(a.clone()) != RcAddr::new(other));
		assert_eq!(
			RcAddr::new(a.clone()).addr(),
			WeakAddr::new(Rc::downgrade(&a)).addr()
		);
	}

	#[test]
	fn weak_entries_report_liveness() {
		let value = Rc::new(1_u32);
		let weak = WeakAddr::new(Rc::downgrade(&value));
		assert!(weak.is_live());
		drop(value);
		assert!(!weak.is_live());
	}
}
