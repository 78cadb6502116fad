//! Thread-safety bounds that follow the `parallel` feature.
//!
//! With `parallel`, expressions evaluated on several threads must be shared
//! across them, so [`MaybeSync`] requires [`Sync`]. Without it the bounds are
//! implemented for every type and closures capturing `Rc` or `Cell` remain
//! usable in expressions.

#[cfg(feature = "parallel")]
mod imp {
    pub trait MaybeSend: Send {}
    impl<T: Send> MaybeSend for T {}

    pub trait MaybeSync: Sync {}
    impl<T: Sync> MaybeSync for T {}

    pub trait MaybeSendSync: Send + Sync {}
    impl<T: Send + Sync> MaybeSendSync for T {}
}

#[cfg(not(feature = "parallel"))]
mod imp {
    pub trait MaybeSend {}
    impl<T> MaybeSend for T {}

    pub trait MaybeSync {}
    impl<T> MaybeSync for T {}

    pub trait MaybeSendSync {}
    impl<T> MaybeSendSync for T {}
}

pub use imp::{MaybeSend, MaybeSendSync, MaybeSync};

#[cfg(test)]
mod tests {
    use super::*;

    fn requires_sync<T: MaybeSync>(_: &T) {}

    #[test]
    fn test_plain_closure_is_maybe_sync() {
        let scale = 2.0f64;
        let f = move |x: f64| x * scale;
        requires_sync(&f);
        assert_eq!(f(1.5), 3.0);
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn test_cell_closure_without_parallel() {
        use std::cell::Cell;
        let calls = Cell::new(0usize);
        let f = |x: f64| {
            calls.set(calls.get() + 1);
            x
        };
        requires_sync(&f);
        f(1.0);
        assert_eq!(calls.get(), 1);
    }
}
