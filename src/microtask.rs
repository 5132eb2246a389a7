//! Deferral to the end of the current synchronous turn.
//!
//! On `wasm32` tasks go to the host's `queueMicrotask`. Elsewhere there is no
//! ambient event loop, so tasks wait in a per-thread queue until the host
//! calls [`tick`] (or an outermost [`batch`](crate::batch) returns).
//!
//! Subscriber and recompute isolation is built on unwinding. `wasm32` targets
//! abort on panic by default, so there a panicking callback takes the whole
//! module down instead of being logged and skipped.

#[cfg(target_arch = "wasm32")]
mod host {
	use wasm_bindgen::prelude::*;

	#[wasm_bindgen]
	extern "C" {
		#[wasm_bindgen(js_name = queueMicrotask)]
		fn queue_microtask(closure: &JsValue);
	}

	pub fn queue<F: FnOnce() + 'static>(func: F) {
		queue_microtask(&Closure::once_into_js(func));
	}
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn queue<F: FnOnce() + 'static>(func: F) {
	host::queue(func)
}

/// Microtasks are drained by the host on `wasm32`; this is a no-op there.
#[cfg(target_arch = "wasm32")]
pub fn tick() -> usize {
	0
}

#[cfg(not(target_arch = "wasm32"))]
mod local {
	use std::cell::{Cell, RefCell};
	use std::collections::VecDeque;

	thread_local! {
		static QUEUE: RefCell<VecDeque<Box<dyn FnOnce()>>> = RefCell::new(VecDeque::new());
		static DRAINING: Cell<bool> = Cell::new(false);
	}

	pub fn queue<F: FnOnce() + 'static>(func: F) {
		QUEUE.with(|queue| queue.borrow_mut().push_back(Box::new(func)));
	}

	struct Draining;

	impl Drop for Draining {
		fn drop(&mut self) {
			DRAINING.with(|draining| draining.set(false));
		}
	}

	pub fn tick() -> usize {
		if DRAINING.with(|draining| draining.replace(true)) {
			return 0;
		}
		let _draining = Draining;

		let mut ran = 0;
		loop {
			let task = QUEUE.with(|queue| queue.borrow_mut().pop_front());
			match task {
				Some(task) => {
					task();
					ran += 1;
				}
				None => break,
			}
		}
		ran
	}
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn queue<F: FnOnce() + 'static>(func: F) {
	local::queue(func)
}

/// Runs every deferred task queued on this thread, including tasks queued by
/// the tasks themselves, and returns how many ran.
///
/// Call it where the host's synchronous turn ends, e.g. after dispatching an
/// input event. A call made from inside a running task returns `0`
/// immediately: work queued there runs after the current task, never inside
/// it.
#[cfg(not(target_arch = "wasm32"))]
pub fn tick() -> usize {
	local::tick()
}
