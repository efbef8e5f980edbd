use std::cell::RefCell;
use std::sync::{Mutex, PoisonError};

/// An object that a pool can construct and later reinitialize in place.
///
/// The argument type `A` is passed both to [`create()`][Self::create] when the pool needs a new
/// object and to [`recycle()`][Self::recycle] when the pool hands out an object that no caller
/// references anymore. Use a tuple if the object needs several arguments and `()` if it needs
/// none. A type may implement the trait for several argument types.
///
/// Construction may fail. Reinitialization may not: the object already exists and the pool has
/// committed to handing it out.
///
/// # Examples
///
/// ```
/// use std::convert::Infallible;
///
/// use recycle_pool::Recycle;
///
/// struct Packet {
///     payload: Vec<u8>,
/// }
///
/// impl Recycle<usize> for Packet {
///     type Error = Infallible;
///
///     fn create(len: usize) -> Result<Self, Self::Error> {
///         Ok(Self {
///             payload: vec![0; len],
///         })
///     }
///
///     fn recycle(&mut self, len: usize) {
///         self.payload.clear();
///         self.payload.resize(len, 0);
///     }
/// }
/// ```
pub trait Recycle<A = ()>: Sized {
    /// The error returned when a new object cannot be constructed.
    ///
    /// Use [`Infallible`][std::convert::Infallible] to enable the non-fallible `make()` methods
    /// of the pools.
    type Error;

    /// Constructs a new object from the arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be constructed. The pool forwards this error to the
    /// caller of `try_make()` unchanged.
    fn create(args: A) -> Result<Self, Self::Error>;

    /// Reinitializes an existing object from the arguments, as if it had just been created.
    fn recycle(&mut self, args: A);
}

// Pooled objects are shared, so callers who want to write into them wrap them in a cell or lock.
// The pool reaches the inner object through exclusive access, without locking.

impl<T, A> Recycle<A> for Mutex<T>
where
    T: Recycle<A>,
{
    type Error = T::Error;

    fn create(args: A) -> Result<Self, Self::Error> {
        T::create(args).map(Self::new)
    }

    fn recycle(&mut self, args: A) {
        // The object is being reinitialized, so whatever state a panicking holder left behind
        // is about to be overwritten anyway.
        self.get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .recycle(args);
    }
}

impl<T, A> Recycle<A> for RefCell<T>
where
    T: Recycle<A>,
{
    type Error = T::Error;

    fn create(args: A) -> Result<Self, Self::Error> {
        T::create(args).map(Self::new)
    }

    fn recycle(&mut self, args: A) {
        self.get_mut().recycle(args);
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::panic::{self, AssertUnwindSafe};

    use super::*;

    #[derive(Debug, Default)]
    struct Counter {
        value: u32,
        recycled: u32,
    }

    impl Recycle<u32> for Counter {
        type Error = Infallible;

        fn create(value: u32) -> Result<Self, Self::Error> {
            Ok(Self { value, recycled: 0 })
        }

        fn recycle(&mut self, value: u32) {
            self.value = value;
            self.recycled = self.recycled.wrapping_add(1);
        }
    }

    struct Picky;

    impl Recycle<bool> for Picky {
        type Error = &'static str;

        fn create(accept: bool) -> Result<Self, Self::Error> {
            if accept { Ok(Self) } else { Err("rejected") }
        }

        fn recycle(&mut self, _accept: bool) {}
    }

    #[test]
    fn mutex_forwards_to_inner() {
        let Ok(mut counter) = <Mutex<Counter> as Recycle<u32>>::create(5);

        counter.recycle(7_u32);

        let inner = counter.into_inner().unwrap();
        assert_eq!(inner.value, 7);
        assert_eq!(inner.recycled, 1);
    }

    #[test]
    fn refcell_forwards_to_inner() {
        let Ok(mut counter) = <RefCell<Counter> as Recycle<u32>>::create(5);

        counter.recycle(9_u32);
        counter.recycle(11_u32);

        let inner = counter.into_inner();
        assert_eq!(inner.value, 11);
        assert_eq!(inner.recycled, 2);
    }

    #[test]
    fn wrapper_propagates_creation_error() {
        assert!(<Mutex<Picky> as Recycle<bool>>::create(true).is_ok());
        assert!(matches!(
            <Mutex<Picky> as Recycle<bool>>::create(false),
            Err("rejected")
        ));
        assert!(matches!(
            <RefCell<Picky> as Recycle<bool>>::create(false),
            Err("rejected")
        ));
    }

    #[test]
    fn poisoned_mutex_is_still_recycled() {
        let Ok(mut counter) = <Mutex<Counter> as Recycle<u32>>::create(1);

        _ = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = counter.lock().unwrap();
            panic!("poison the lock");
        }));
        assert!(counter.is_poisoned());

        counter.recycle(3_u32);

        let inner = counter.into_inner().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(inner.value, 3);
    }
}
