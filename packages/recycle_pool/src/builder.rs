use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;

use new_zealand::nz;

use crate::{CircularPool, LinkedPool, ListPool};

/// Capacity of a pool created without specifying one.
pub const DEFAULT_CAPACITY: NonZero<usize> = nz!(16);

/// Builder for creating an instance of [`CircularPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`CircularPool::new()`][1] holds up to
/// [`DEFAULT_CAPACITY`] objects.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use recycle_pool::CircularPool;
///
/// let pool = CircularPool::<String>::builder().capacity(nz!(4)).build();
///
/// assert_eq!(pool.capacity(), 4);
/// ```
///
/// [1]: CircularPool::new
#[must_use]
pub struct CircularPoolBuilder<T> {
    capacity: NonZero<usize>,

    _item: PhantomData<T>,
}

impl<T> fmt::Debug for CircularPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T> CircularPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            _item: PhantomData,
        }
    }

    /// Sets the number of slots in the pool.
    ///
    /// The capacity can later be changed with [`CircularPool::resize()`], which discards the
    /// contents of the pool.
    pub fn capacity(mut self, capacity: NonZero<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builds the pool with the specified configuration.
    #[must_use]
    pub fn build(self) -> CircularPool<T> {
        CircularPool::new_inner(self.capacity)
    }
}

/// Builder for creating an instance of [`LinkedPool`].
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use recycle_pool::LinkedPool;
///
/// let pool = LinkedPool::<Vec<u8>>::builder().capacity(nz!(32)).build();
///
/// assert_eq!(pool.capacity(), 32);
/// ```
#[must_use]
pub struct LinkedPoolBuilder<T> {
    capacity: NonZero<usize>,

    _item: PhantomData<T>,
}

impl<T> fmt::Debug for LinkedPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T> LinkedPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            _item: PhantomData,
        }
    }

    /// Sets the maximum number of objects the pool keeps track of.
    ///
    /// Once the pool is full, each new object replaces the first one in the pool.
    pub fn capacity(mut self, capacity: NonZero<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builds the pool with the specified configuration.
    #[must_use]
    pub fn build(self) -> LinkedPool<T> {
        LinkedPool::new_inner(self.capacity)
    }
}

/// Builder for creating an instance of [`ListPool`].
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use recycle_pool::ListPool;
///
/// let pool = ListPool::<Vec<u8>>::builder().capacity(nz!(256)).build();
///
/// assert_eq!(pool.capacity(), 256);
/// ```
#[must_use]
pub struct ListPoolBuilder<T> {
    capacity: NonZero<usize>,

    _item: PhantomData<T>,
}

impl<T> fmt::Debug for ListPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T> ListPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            _item: PhantomData,
        }
    }

    /// Sets the maximum number of objects the pool keeps track of.
    ///
    /// Once the pool is full, new objects are still handed out but the pool forgets about them.
    pub fn capacity(mut self, capacity: NonZero<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builds the pool with the specified configuration.
    #[must_use]
    pub fn build(self) -> ListPool<T> {
        ListPool::new_inner(self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(
            CircularPoolBuilder::<u32>::new().build().capacity(),
            DEFAULT_CAPACITY.get()
        );
        assert_eq!(
            LinkedPoolBuilder::<u32>::new().build().capacity(),
            DEFAULT_CAPACITY.get()
        );
        assert_eq!(
            ListPoolBuilder::<u32>::new().build().capacity(),
            DEFAULT_CAPACITY.get()
        );
    }

    #[test]
    fn debug_names_item_type() {
        let builder = LinkedPoolBuilder::<String>::new().capacity(nz!(3));

        let debug = format!("{builder:?}");

        assert!(debug.contains("String"));
        assert!(debug.contains("capacity: 3"));
    }

    #[test]
    fn thread_mobility() {
        assert_impl_all!(CircularPoolBuilder<String>: Send, Sync);
        assert_impl_all!(LinkedPoolBuilder<String>: Send, Sync);
        assert_impl_all!(ListPoolBuilder<String>: Send, Sync);
    }
}
