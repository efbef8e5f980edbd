use std::any::type_name;
use std::convert::Infallible;
use std::fmt;
use std::num::NonZero;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::{LinkedSlots, ListPoolBuilder, Recycle, slot};

/// A capacity-capped object pool that never evicts on its own and is cleaned up explicitly.
///
/// The pool keeps a sequence of objects and a cursor into it. Each call to [`make()`][1]:
///
/// 1. reuses the object under the cursor if no caller references it anymore;
/// 2. otherwise moves to the next object, reusing it if free or replacing it with a new object
///    if a caller still holds it;
/// 3. at the end of the sequence, appends a new object while there is capacity left. When the
///    pool is full, the new object is handed out without the pool keeping track of it.
///
/// Reused objects are always reinitialized in place.
///
/// Objects held by callers for a long time stay in the pool until [`release()`][2] is called,
/// which removes them and moves the cursor back to the start. A typical usage pattern is a
/// processing loop that makes many objects per iteration and calls [`release()`][2] at the end of
/// each iteration.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use recycle_pool::{Buffer, ListPool};
///
/// let mut pool = ListPool::<Buffer<u8>>::builder().capacity(nz!(4)).build();
///
/// for _ in 0..3 {
///     let batch: Vec<_> = (0..4).map(|_| pool.make(1500)).collect();
///     assert_eq!(pool.size(), 4);
///
///     drop(batch);
///     pool.release();
/// }
///
/// // All buffers were released by the caller in time, so the pool kept reusing them.
/// assert_eq!(pool.size(), 4);
/// ```
///
/// [1]: Self::make
/// [2]: Self::release
pub struct ListPool<T> {
    slots: LinkedSlots<T>,
}

impl<T> ListPool<T> {
    #[must_use]
    pub(crate) fn new_inner(capacity: NonZero<usize>) -> Self {
        Self {
            slots: LinkedSlots::new(capacity),
        }
    }

    /// Creates a new [`ListPool`] with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`ListPool`].
    pub fn builder() -> ListPoolBuilder<T> {
        ListPoolBuilder::new()
    }

    /// Number of objects the pool keeps track of.
    ///
    /// Objects handed out while the pool was full are not counted.
    #[must_use]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Maximum number of objects the pool keeps track of.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Whether the pool holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.len() == 0
    }

    /// Hands out an object, recycling one the pool already holds if possible.
    ///
    /// The returned object is always valid. When the pool is full and no object could be
    /// recycled, the returned object is simply not tracked by the pool.
    ///
    /// # Errors
    ///
    /// Returns the error from [`Recycle::create()`] if a new object was required but could not
    /// be constructed. The pool is left unchanged in that case.
    pub fn try_make<A>(&mut self, args: A) -> Result<Arc<T>, T::Error>
    where
        T: Recycle<A>,
    {
        let mut args = args;

        if let Some(current) = self.slots.current_mut() {
            match slot::try_recycle(current, args) {
                Ok(entry) => {
                    trace!("recycled entry under cursor");
                    return Ok(entry);
                }
                Err(returned) => args = returned,
            }
        }

        if !self.slots.at_end() {
            return self.slots.advance_and_make(args);
        }

        let entry = slot::create(args)?;

        if self.slots.is_full() {
            trace!(
                capacity = self.slots.capacity(),
                "pool full, handing out untracked object"
            );
        } else {
            self.slots.insert_after_cursor(Arc::clone(&entry));
            trace!(size = self.slots.len(), "appended new entry");
        }

        Ok(entry)
    }

    /// Hands out an object, recycling one the pool already holds if possible.
    ///
    /// This is [`try_make()`][Self::try_make] for objects whose construction cannot fail.
    pub fn make<A>(&mut self, args: A) -> Arc<T>
    where
        T: Recycle<A, Error = Infallible>,
    {
        match self.try_make(args) {
            Ok(entry) => entry,
            Err(never) => match never {},
        }
    }

    /// Removes from the pool every object that is still referenced by a caller, then
    /// [resets][Self::reset] the cursor.
    ///
    /// Objects that are free stay in the pool, in their previous order. Calling this again
    /// without making objects in between has no further effect.
    pub fn release(&mut self) {
        let released = self.slots.retain_free();

        debug!(
            released,
            size = self.slots.len(),
            "released referenced objects from list pool"
        );

        self.reset();
    }

    /// Moves the cursor back to the start of the pool.
    ///
    /// The pool keeps all its objects. The next call to [`make()`][Self::make] starts probing
    /// for a free object at the first one.
    pub fn reset(&mut self) {
        self.slots.rewind();
    }

    /// Removes all objects from the pool.
    ///
    /// Objects still referenced by callers remain valid.
    pub fn clear(&mut self) {
        self.slots.clear();

        debug!("cleared list pool");
    }
}

impl<T> Default for ListPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ListPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::indexing_slicing,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::linked_slots::Cursor;
    use crate::test_objects::{Fallible, Foo, SharedFoo};

    fn pool_with_capacity(capacity: NonZero<usize>) -> ListPool<Foo> {
        ListPool::builder().capacity(capacity).build()
    }

    #[test]
    fn smoke_test() {
        let mut pool = pool_with_capacity(nz!(256));
        let capacity = pool.capacity();

        let mut c: Option<SharedFoo> = None;

        for _ in 0..10 {
            c = Some(pool.make(()));
            assert_eq!(Arc::strong_count(c.as_ref().unwrap()), 2);
        }
        drop(c.take());
        assert_eq!(pool.size(), 10);

        pool.release();

        for _ in 0..10 {
            c = Some(pool.make(()));
            assert_eq!(Arc::strong_count(c.as_ref().unwrap()), 2);
        }
        assert_eq!(pool.size(), 10);

        let c1 = pool.make(());
        let c2 = pool.make(());
        let c3 = pool.make(());
        drop(c.take());
        assert_eq!(pool.size(), 13);

        pool.release();
        assert_eq!(pool.size(), 10);

        pool.clear();
        assert_eq!(pool.size(), 0);

        for _ in 0..capacity {
            c = Some(pool.make(()));
            assert_eq!(Arc::strong_count(c.as_ref().unwrap()), 2);
        }
        assert_eq!(pool.size(), capacity);

        // Objects made while the pool is full are not tracked.
        for _ in 0..10 {
            let foo = pool.make(());
            assert_eq!(Arc::strong_count(&foo), 1);
        }

        // Only the pool references its objects, so nothing gets released.
        drop(c.take());
        assert_eq!(pool.size(), capacity);
        pool.release();
        assert_eq!(pool.size(), capacity);

        // Same again, to show that the pool behaves the same after a release.
        for _ in 0..capacity {
            c = Some(pool.make(()));
            assert_eq!(Arc::strong_count(c.as_ref().unwrap()), 2);
        }
        assert_eq!(pool.size(), capacity);

        for _ in 0..10 {
            let foo = pool.make(());
            assert_eq!(Arc::strong_count(&foo), 1);
        }
        drop(c);
        assert_eq!(pool.size(), capacity);

        for held in [c1, c2, c3] {
            assert_eq!(Arc::strong_count(&held), 1);
        }
    }

    #[test]
    fn example_walkthrough() {
        let mut pool = pool_with_capacity(nz!(4));

        _ = pool.make(());

        // The first object was not kept, so it is reused.
        let foo = pool.make(());
        assert_eq!(pool.size(), 1);

        // The first object is in use, so a second one is created.
        let foo2 = pool.make(());
        assert_eq!(pool.size(), 2);
        let foo2_ptr = Arc::as_ptr(&foo2);
        drop(foo2);

        // The object under the cursor is free again and gets reused.
        let foo2 = pool.make(());
        assert_eq!(pool.size(), 2);
        assert_eq!(Arc::as_ptr(&foo2), foo2_ptr);

        // Both objects are referenced here, so the pool forgets about them.
        pool.release();
        assert_eq!(pool.size(), 0);
        assert_eq!(Arc::strong_count(&foo), 1);
        assert_eq!(Arc::strong_count(&foo2), 1);

        let foo3 = pool.make(());
        let foo4 = pool.make(());
        let foo5 = pool.make(());
        let foo4_ptr = Arc::as_ptr(&foo4);
        drop(foo4);

        // Resetting only moves the cursor.
        pool.reset();
        assert_eq!(pool.size(), 3);

        // foo3 is still referenced, so its position gets a new object.
        let foo6 = pool.make(());
        assert_eq!(pool.size(), 3);
        assert!(!Arc::ptr_eq(&foo6, &foo3));
        assert_eq!(Arc::strong_count(&foo3), 1);

        // foo4 was dropped, so its object is reused.
        let foo7 = pool.make(());
        assert_eq!(pool.size(), 3);
        assert_eq!(Arc::as_ptr(&foo7), foo4_ptr);

        // foo5 is still referenced, so its position gets a new object.
        let foo8 = pool.make(());
        assert_eq!(pool.size(), 3);
        assert!(!Arc::ptr_eq(&foo8, &foo5));

        // The end of the pool is reached and there is room for one more.
        let foo9 = pool.make(());
        assert_eq!(pool.size(), 4);
        assert_eq!(Arc::strong_count(&foo9), 2);

        // The pool is full, so the new object is not tracked.
        let foo10 = pool.make(());
        assert_eq!(pool.size(), 4);
        assert_eq!(Arc::strong_count(&foo10), 1);
    }

    #[test]
    fn release_is_idempotent() {
        let mut pool = pool_with_capacity(nz!(8));

        let held: Vec<_> = (0..5).map(|_| pool.make(())).collect();
        drop(held);
        let _kept = pool.make(());
        let _also_kept = pool.make(());

        pool.release();
        let size = pool.size();
        pool.release();

        assert_eq!(pool.size(), size);
        assert_eq!(size, 4);
    }

    #[test]
    fn reset_keeps_size() {
        let mut pool = pool_with_capacity(nz!(4));

        let _a = pool.make(());
        let _b = pool.make(());
        assert_eq!(pool.slots.cursor(), Cursor::At(1));

        pool.reset();

        assert_eq!(pool.size(), 2);
        assert_eq!(pool.slots.cursor(), Cursor::BeforeStart);
    }

    #[test]
    fn recycling_reinitializes() {
        let mut pool = ListPool::<Cell<u8>>::new();

        let cell = pool.make(7);
        cell.set(42);
        drop(cell);

        let cell = pool.make(9);
        assert_eq!(cell.get(), 9);

        drop(cell);
        pool.reset();

        let cell = pool.make(11);
        assert_eq!(cell.get(), 11);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn failed_construction_leaves_pool_unchanged() {
        let mut pool = ListPool::<Fallible>::builder().capacity(nz!(1)).build();

        let first = pool.try_make(true).unwrap();

        assert!(pool.try_make(false).is_err());
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.slots.cursor(), Cursor::At(0));

        pool.reset();
        assert!(pool.try_make(false).is_err());
        assert_eq!(pool.slots.cursor(), Cursor::BeforeStart);
        assert!(Arc::ptr_eq(&first, &pool.slots.entries()[0]));
    }

    #[test]
    fn thread_mobility() {
        assert_impl_all!(ListPool<String>: Send, Sync);
        assert_not_impl_any!(ListPool<Rc<u32>>: Send, Sync);
    }
}
