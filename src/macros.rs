pub use enclose::*;

/// Builds a [`Derived`](crate::Derived) node, cloning the listed captures into
/// the computation.
///
/// ```
/// use kraai::derived;
///
/// let (count, _, _) = kraai::create(2);
/// let double = derived!((count) => count.get() * 2);
/// assert_eq!(double.get(), 4);
/// ```
#[macro_export]
macro_rules! derived {
    (( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::Derived::new($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
    };
    (=> $($b:tt)*) => {
        $crate::Derived::new(move || { $($b)* })
    };
}

/// [`batch`](crate::batch) with `enclose`-style captures.
#[macro_export]
macro_rules! batch {
    (( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::batch($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
    };
    (=> $($b:tt)*) => {
        $crate::batch(move || { $($b)* })
    };
}
