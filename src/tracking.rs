//! Dependency tracking context.
//!
//! One slot per thread names the derived node currently being recomputed.
//! Reads performed while the slot is occupied record an edge in both
//! directions: the reader joins the read node's dependents, and the read
//! node joins the reader's source set for this evaluation.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::node::Node;
use crate::sources::Sources;

thread_local! {
	static ACTIVE: RefCell<Option<Frame>> = RefCell::new(None);
}

struct Frame {
	node: Weak<dyn Node>,
	read: Sources,
}

/// Returns `true` while a derived computation is running on this thread.
pub fn is_tracking() -> bool {
	active().is_some()
}

pub(crate) fn active() -> Option<Weak<dyn Node>> {
	ACTIVE.with(|active| active.borrow().as_ref().map(|frame| frame.node.clone()))
}

/// Records a read of the node produced by `observed`. Without an active
/// computation this does nothing and `observed` is never called.
///
/// A computation reading its own node records no edge: the node would hold a
/// strong reference to itself and never be freed.
pub(crate) fn track(observed: impl FnOnce() -> Option<Rc<dyn Node>>) {
	ACTIVE.with(|active| {
		if let Some(frame) = active.borrow_mut().as_mut() {
			if let Some(observed) = observed() {
				if Weak::as_ptr(&frame.node) as *const () == Rc::as_ptr(&observed) as *const () {
					return;
				}
				observed.used_by(frame.node.clone());
				frame.read.based_on(observed);
			}
		}
	});
}

/// Runs `func` with `node` installed as the active computation and returns
/// its result together with every node it read.
///
/// The previous slot value is restored on every exit path, unwinding
/// included.
pub(crate) fn run_tracked<R>(node: Weak<dyn Node>, func: impl FnOnce() -> R) -> (R, Sources) {
	let scope = Scope::enter(node);
	let result = func();
	(result, scope.exit())
}

struct Scope {
	previous: Option<Option<Frame>>,
}

impl Scope {
	fn enter(node: Weak<dyn Node>) -> Self {
		let frame = Frame {
			node,
			read: Sources::new(),
		};
		let previous = ACTIVE.with(|active| active.replace(Some(frame)));
		Scope {
			previous: Some(previous),
		}
	}

	fn exit(mut self) -> Sources {
		let previous = self.previous.take().flatten();
		ACTIVE
			.with(|active| active.replace(previous))
			.map(|frame| frame.read)
			.unwrap_or_default()
	}
}

impl Drop for Scope {
	fn drop(&mut self) {
		if let Some(previous) = self.previous.take() {
			ACTIVE.with(|active| {
				active.replace(previous);
			});
		}
	}
}
