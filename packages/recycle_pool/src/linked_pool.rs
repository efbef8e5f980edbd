use std::any::type_name;
use std::convert::Infallible;
use std::fmt;
use std::num::NonZero;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::{LinkedPoolBuilder, LinkedSlots, Recycle, slot};

/// A capacity-capped object pool that grows as a sequence and loops back to its head when full.
///
/// Like [`CircularPool`][crate::CircularPool], this pool does not need explicit maintenance:
/// objects that callers hold on to for a long time are eventually pushed out of the pool by
/// newer objects. [`release()`][Self::release] drops them right away when that is preferable.
/// The pool differs from [`CircularPool`][crate::CircularPool] in how it probes for free objects:
///
/// 1. If the first object in the pool is free, it is handed out again *as is*, without being
///    reinitialized. This is the fast path for callers that drop their handle before asking for
///    the next object.
/// 2. Otherwise the pool looks at the object after its cursor. A free object there is
///    reinitialized and handed out; an object still held by a caller is replaced by a new one.
/// 3. When the cursor is at the end of the sequence, a new object is appended while there is
///    capacity left. Once the pool is full, the new object replaces the first object and the
///    cursor starts over from the beginning.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use recycle_pool::{Buffer, LinkedPool};
///
/// let mut pool = LinkedPool::<Buffer<u8>>::builder().capacity(nz!(2)).build();
///
/// let first = pool.make(64);
/// let second = pool.make(64);
/// assert_eq!(pool.size(), 2);
///
/// // The pool is full and both objects are in use, so the first one is pushed out.
/// let third = pool.make(64);
/// assert_eq!(pool.size(), 2);
/// assert_eq!(std::sync::Arc::strong_count(&first), 1);
/// ```
pub struct LinkedPool<T> {
    slots: LinkedSlots<T>,
}

impl<T> LinkedPool<T> {
    #[must_use]
    pub(crate) fn new_inner(capacity: NonZero<usize>) -> Self {
        Self {
            slots: LinkedSlots::new(capacity),
        }
    }

    /// Creates a new [`LinkedPool`] with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`LinkedPool`].
    pub fn builder() -> LinkedPoolBuilder<T> {
        LinkedPoolBuilder::new()
    }

    /// Number of objects the pool keeps track of.
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
    /// See the [type-level documentation][LinkedPool] for the recycling policy.
    ///
    /// # Errors
    ///
    /// Returns the error from [`Recycle::create()`] if a new object was required but could not
    /// be constructed. The pool is left unchanged in that case.
    pub fn try_make<A>(&mut self, args: A) -> Result<Arc<T>, T::Error>
    where
        T: Recycle<A>,
    {
        if self.slots.head_mut().is_some_and(slot::is_free) {
            if let Some(head) = self.slots.seek_head() {
                trace!("handed out first entry again");
                return Ok(head);
            }
        }

        if !self.slots.at_end() {
            return self.slots.advance_and_make(args);
        }

        let entry = slot::create(args)?;

        if self.slots.is_full() {
            self.slots.rewind();

            if let Some(evicted) = self.slots.replace_head(Arc::clone(&entry)) {
                trace!(
                    external_holders = slot::external_holders(&evicted),
                    "pool full, evicted first entry"
                );
            }
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

    /// Removes from the pool every object that is still referenced by a caller and moves the
    /// cursor back to the start.
    ///
    /// Objects that are free stay in the pool, in their previous order. Calling this again
    /// without making objects in between has no further effect on the size.
    pub fn release(&mut self) {
        let released = self.slots.retain_free();

        debug!(
            released,
            size = self.slots.len(),
            "released referenced objects from linked pool"
        );

        self.slots.rewind();
    }

    /// Removes all objects from the pool.
    ///
    /// Objects still referenced by callers remain valid.
    pub fn clear(&mut self) {
        self.slots.clear();

        debug!("cleared linked pool");
    }
}

impl<T> Default for LinkedPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LinkedPool<T> {
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

    fn pool_with_capacity(capacity: NonZero<usize>) -> LinkedPool<Foo> {
        LinkedPool::builder().capacity(capacity).build()
    }

    #[test]
    fn smoke_test() {
        let mut pool = pool_with_capacity(nz!(5));

        assert_eq!(pool.size(), 0);
        _ = pool.make(());
        assert_eq!(pool.size(), 1);
        _ = pool.make(());
        assert_eq!(pool.size(), 1);

        let c1 = pool.make(());
        assert_eq!(Arc::strong_count(&c1), 2);

        let c2 = pool.make(());
        let c2_ptr = Arc::as_ptr(&c2);
        drop(c2);
        assert_eq!(pool.size(), 2);

        _ = pool.make(());
        assert_eq!(pool.size(), 3);

        let c1_ptr = Arc::as_ptr(&c1);
        drop(c1);
        let c1 = pool.make(());
        assert_eq!(pool.size(), 3);
        assert_eq!(Arc::as_ptr(&c1), c1_ptr);
        assert_eq!(Arc::as_ptr(&pool.make(())), c2_ptr);

        pool.clear();
        assert_eq!(pool.size(), 0);
        assert!(pool.is_empty());

        let mut held: [Option<SharedFoo>; 5] = Default::default();

        for i in 0..24 {
            held[i % 5] = Some(pool.make(()));
            assert_eq!(Arc::strong_count(held[i % 5].as_ref().unwrap()), 2);
        }

        assert_eq!(pool.size(), 5);
    }

    #[test]
    fn example_evicts_held_objects() {
        let mut pool = pool_with_capacity(nz!(2));

        _ = pool.make(());
        assert_eq!(pool.size(), 1);

        // The first object was not kept by the caller, so it is handed out again.
        let foo1 = pool.make(());
        assert_eq!(pool.size(), 1);

        let foo2 = pool.make(());
        assert_eq!(pool.size(), 2);
        let foo2_ptr = Arc::as_ptr(&foo2);
        drop(foo2);

        // The second object is free again; the pool loops back to the first position because
        // it is full and its cursor is at the end.
        let foo2 = pool.make(());
        assert_eq!(pool.size(), 2);
        assert_ne!(Arc::as_ptr(&foo2), foo2_ptr);
        assert_eq!(Arc::strong_count(&foo1), 1);

        // The object at the first position is held, so it gets replaced.
        let _foo4 = pool.make(());
        assert_eq!(pool.size(), 2);
        assert_eq!(Arc::strong_count(&foo2), 1);
    }

    #[test]
    fn head_is_handed_out_without_reinitialization() {
        let mut pool = LinkedPool::<Cell<u8>>::new();

        let cell = pool.make(1);
        cell.set(42);
        drop(cell);

        let cell = pool.make(2);
        assert_eq!(cell.get(), 42);
    }

    #[test]
    fn entries_after_head_are_reinitialized() {
        let mut pool = LinkedPool::<Cell<u8>>::new();

        let a = pool.make(1);
        let b = pool.make(2);
        b.set(42);
        drop(a);
        drop(b);

        let head = pool.make(3);
        assert_eq!(head.get(), 1);

        let second = pool.make(4);
        assert_eq!(second.get(), 4);
        assert_eq!(pool.size(), 2);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let mut pool = pool_with_capacity(nz!(3));
        let mut held = Vec::new();

        for n in 1..=10 {
            held.push(pool.make(()));
            assert_eq!(pool.size(), n.min(3));
        }
    }

    #[test]
    fn cursor_rewinds_when_full() {
        let mut pool = pool_with_capacity(nz!(2));

        let _a = pool.make(());
        let _b = pool.make(());
        assert_eq!(pool.slots.cursor(), Cursor::At(1));

        let c = pool.make(());
        assert_eq!(pool.slots.cursor(), Cursor::BeforeStart);
        assert!(Arc::ptr_eq(&c, &pool.slots.entries()[0]));
    }

    #[test]
    fn release_drops_referenced_objects() {
        let mut pool = pool_with_capacity(nz!(4));

        let held: Vec<_> = (0..4).map(|_| pool.make(())).collect();
        assert_eq!(pool.size(), 4);
        assert!(held.iter().all(|foo| Arc::strong_count(foo) == 2));

        pool.release();

        assert_eq!(pool.size(), 0);
        assert!(pool.is_empty());
        assert_eq!(pool.slots.cursor(), Cursor::BeforeStart);
        assert!(held.iter().all(|foo| Arc::strong_count(foo) == 1));
    }

    #[test]
    fn release_keeps_free_objects_in_order() {
        let mut pool = pool_with_capacity(nz!(4));

        let a = pool.make(());
        let b = pool.make(());
        let c = pool.make(());
        let _d = pool.make(());
        let a_ptr = Arc::as_ptr(&a);
        let c_ptr = Arc::as_ptr(&c);
        drop(a);
        drop(c);

        pool.release();

        assert_eq!(pool.size(), 2);
        assert_eq!(Arc::strong_count(&b), 1);
        assert_eq!(Arc::as_ptr(&pool.slots.entries()[0]), a_ptr);
        assert_eq!(Arc::as_ptr(&pool.slots.entries()[1]), c_ptr);
        assert_eq!(pool.slots.cursor(), Cursor::BeforeStart);

        // The free head is handed out first after a release.
        assert_eq!(Arc::as_ptr(&pool.make(())), a_ptr);
    }

    #[test]
    fn release_is_idempotent() {
        let mut pool = pool_with_capacity(nz!(8));

        let held: Vec<_> = (0..5).map(|_| pool.make(())).collect();
        let _kept = held.first().map(Arc::clone);
        drop(held);
        let _also_kept = pool.make(());

        pool.release();
        let size = pool.size();
        pool.release();

        assert_eq!(pool.size(), size);
        assert_eq!(size, 4);
    }

    #[test]
    fn failed_construction_leaves_pool_unchanged() {
        let mut pool = LinkedPool::<Fallible>::builder()
            .capacity(nz!(2))
            .build();

        let first = pool.try_make(true).unwrap();

        assert!(pool.try_make(false).is_err());
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.slots.cursor(), Cursor::At(0));

        pool.slots.rewind();
        assert!(pool.try_make(false).is_err());
        assert_eq!(pool.slots.cursor(), Cursor::BeforeStart);
        assert!(Arc::ptr_eq(&first, &pool.slots.entries()[0]));
    }

    #[test]
    fn thread_mobility() {
        assert_impl_all!(LinkedPool<String>: Send, Sync);
        assert_not_impl_any!(LinkedPool<Rc<u32>>: Send, Sync);
    }
}
