use std::any::Any;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// Derived nodes only change through recomputation.
	#[error("cannot write to a derived node")]
	DerivedWrite,

	#[error("derived computation panicked: {message}")]
	Recompute { message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		(*message).to_owned()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		String::from("<non-string panic payload>")
	}
}
