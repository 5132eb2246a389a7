use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;

/// A value that can live inside a state node.
///
/// Change detection is by identity, not structure. Primitive payloads are
/// identified by their value, so writing an equal primitive is a no-op.
/// Every other payload behaves like an object reference: the node always owns
/// its own copy, so a written value is never the one already stored and every
/// write counts as a change, even when the two are structurally equal.
///
/// User types opt in with an empty impl, which selects reference semantics:
///
/// ```
/// #[derive(Clone)]
/// struct Todo {
/// 	title: String,
/// }
///
/// impl kraai::Payload for Todo {}
/// ```
pub trait Payload: Clone + 'static {
	/// Returns `true` when writing `next` over `self` must not be treated as a
	/// change.
	fn same(&self, next: &Self) -> bool {
		let _ = next;
		false
	}
}

macro_rules! primitive {
	($($ty:ty),* $(,)?) => {
		$(
			impl Payload for $ty {
				#[inline]
				fn same(&self, next: &Self) -> bool {
					self == next
				}
			}
		)*
	};
}

primitive!(
	(),
	bool,
	char,
	i8,
	i16,
	i32,
	i64,
	i128,
	isize,
	u8,
	u16,
	u32,
	u64,
	u128,
	usize,
	f32,
	f64,
	String,
	&'static str,
);

impl<T: Payload> Payload for Option<T> {
	fn same(&self, next: &Self) -> bool {
		match (self, next) {
			(None, None) => true,
			(Some(current), Some(next)) => current.same(next),
			_ => false,
		}
	}
}

impl<T: Clone + 'static> Payload for Vec<T> {}
impl<T: Clone + 'static> Payload for VecDeque<T> {}
impl<T: Clone + 'static> Payload for Box<T> {}
impl<T: ?Sized + 'static> Payload for Rc<T> {}
impl<K: Clone + 'static, V: Clone + 'static, S: Clone + 'static> Payload for HashMap<K, V, S> {}
impl<T: Clone + 'static, S: Clone + 'static> Payload for HashSet<T, S> {}
impl<K: Clone + 'static, V: Clone + 'static> Payload for BTreeMap<K, V> {}
impl<T: Clone + 'static> Payload for BTreeSet<T> {}
