use std::any::type_name;
use std::convert::Infallible;
use std::fmt;
use std::mem;
use std::num::NonZero;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::{CircularPoolBuilder, Error, Recycle, Result, slot};

/// A fixed-capacity object pool that walks its slots like a ring buffer.
///
/// Each call to [`make()`][1] hands out a shared handle to an object. The pool keeps its own
/// reference to every object it hands out and reinitializes an object in place once all handles
/// given to callers have been dropped, instead of allocating a new one.
///
/// # Recycling policy
///
/// To keep [`make()`][1] constant-time, the pool only ever looks at two slots:
///
/// 1. The first slot. Reusing it whenever possible keeps the pool small when callers release
///    their handles quickly.
/// 2. The slot after the most recently used one.
///
/// If neither is free, a new object is created. While the pool has unused capacity the object
/// goes into a new slot; once the pool is full, the cursor wraps around and the new object
/// overwrites the next slot in the ring. Callers still holding a handle to the overwritten object
/// keep it alive and usable, the pool merely forgets about it.
///
/// # Examples
///
/// ```
/// use std::convert::Infallible;
///
/// use new_zealand::nz;
/// use recycle_pool::{CircularPool, Recycle};
///
/// #[derive(Default)]
/// struct Frame {
///     sequence: u64,
/// }
///
/// impl Recycle<u64> for Frame {
///     type Error = Infallible;
///
///     fn create(sequence: u64) -> Result<Self, Self::Error> {
///         Ok(Self { sequence })
///     }
///
///     fn recycle(&mut self, sequence: u64) {
///         self.sequence = sequence;
///     }
/// }
///
/// let mut pool = CircularPool::<Frame>::builder().capacity(nz!(2)).build();
///
/// let first = pool.make(1);
/// assert_eq!(first.sequence, 1);
/// drop(first);
///
/// // The first object is no longer referenced by the caller, so it is reinitialized and reused.
/// let second = pool.make(2);
/// assert_eq!(second.sequence, 2);
/// assert_eq!(pool.size(), 1);
/// ```
///
/// # Thread safety
///
/// The pool is mutated through exclusive references and performs no synchronization of its own.
/// Handles are [`Arc`]s, so they can be sent to other threads when the object type allows it.
///
/// [1]: Self::make
pub struct CircularPool<T> {
    /// One slot per unit of capacity. Only the first `size` slots have ever been filled.
    slots: Box<[Option<Arc<T>>]>,

    /// Number of slots that have been filled since the last reset of the pool.
    size: usize,

    /// Index of the most recently used slot. Always less than the capacity.
    cursor: usize,
}

impl<T> CircularPool<T> {
    #[must_use]
    pub(crate) fn new_inner(capacity: NonZero<usize>) -> Self {
        Self {
            slots: empty_slots(capacity.get()),
            size: 0,
            cursor: 0,
        }
    }

    /// Creates a new [`CircularPool`] with the default configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use recycle_pool::{CircularPool, DEFAULT_CAPACITY};
    ///
    /// let pool = CircularPool::<Vec<u8>>::new();
    ///
    /// assert_eq!(pool.size(), 0);
    /// assert_eq!(pool.capacity(), DEFAULT_CAPACITY.get());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`CircularPool`].
    pub fn builder() -> CircularPoolBuilder<T> {
        CircularPoolBuilder::new()
    }

    /// Number of slots that currently hold an object.
    ///
    /// Objects handed out after they were evicted from the pool are not counted.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Maximum number of objects the pool keeps track of.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether the pool holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Hands out an object, recycling one the pool already holds if possible.
    ///
    /// See the [type-level documentation][CircularPool] for the recycling policy.
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

        if self.size > 0 {
            if let Some(first) = self.slots.first_mut().and_then(Option::as_mut) {
                match slot::try_recycle(first, args) {
                    Ok(entry) => {
                        trace!(index = 0, "recycled first slot");
                        self.cursor = 0;
                        return Ok(entry);
                    }
                    Err(returned) => args = returned,
                }
            }

            // The cursor is less than the capacity, so this cannot overflow.
            let next = self.cursor.wrapping_add(1);

            if next < self.size {
                if let Some(entry) = self.slots.get_mut(next).and_then(Option::as_mut) {
                    match slot::try_recycle(entry, args) {
                        Ok(entry) => {
                            trace!(index = next, "recycled next slot");
                            self.cursor = next;
                            return Ok(entry);
                        }
                        Err(returned) => args = returned,
                    }
                }
            }
        }

        let entry = slot::create(args)?;

        if self.size != self.capacity() {
            self.size = self.size.wrapping_add(1);
        }

        self.cursor = self.cursor.wrapping_add(1);

        if self.cursor >= self.size {
            self.cursor = 0;
        }

        let target = self
            .slots
            .get_mut(self.cursor)
            .expect("cursor is always less than the size, which never exceeds the capacity");

        match target.replace(Arc::clone(&entry)) {
            Some(evicted) => trace!(
                index = self.cursor,
                external_holders = slot::external_holders(&evicted),
                "evicted slot"
            ),
            None => trace!(index = self.cursor, size = self.size, "filled new slot"),
        }

        Ok(entry)
    }

    /// Hands out an object, recycling one the pool already holds if possible.
    ///
    /// This is [`try_make()`][Self::try_make] for objects whose construction cannot fail.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use recycle_pool::{Buffer, CircularPool};
    ///
    /// let mut pool = CircularPool::<Buffer<u8>>::new();
    ///
    /// let buffer = pool.make(1024);
    /// assert_eq!(buffer.len(), 1024);
    ///
    /// // The pool holds a reference as well.
    /// assert_eq!(Arc::strong_count(&buffer), 2);
    /// ```
    pub fn make<A>(&mut self, args: A) -> Arc<T>
    where
        T: Recycle<A, Error = Infallible>,
    {
        match self.try_make(args) {
            Ok(entry) => entry,
            Err(never) => match never {},
        }
    }

    /// Changes the capacity of the pool.
    ///
    /// The pool forgets all objects it holds. Objects still referenced by callers remain valid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`] if `capacity` is zero. The pool is left unchanged in that
    /// case.
    ///
    /// # Example
    ///
    /// ```rust
    /// use recycle_pool::{Buffer, CircularPool, Error};
    ///
    /// let mut pool = CircularPool::<Buffer<u8>>::new();
    /// let buffer = pool.make(16);
    ///
    /// pool.resize(4).unwrap();
    /// assert_eq!(pool.capacity(), 4);
    /// assert_eq!(pool.size(), 0);
    ///
    /// assert_eq!(pool.resize(0), Err(Error::ZeroCapacity));
    /// assert_eq!(pool.capacity(), 4);
    ///
    /// // The buffer outlives its removal from the pool.
    /// assert_eq!(buffer.len(), 16);
    /// ```
    pub fn resize(&mut self, capacity: usize) -> Result<()> {
        let capacity = NonZero::new(capacity).ok_or(Error::ZeroCapacity)?;

        self.slots = empty_slots(capacity.get());
        self.size = 0;
        self.cursor = 0;

        debug!(capacity, "resized circular pool");

        Ok(())
    }

    /// Removes from the pool every object that is still referenced by a caller.
    ///
    /// The remaining objects are packed into the first slots, in their previous order, and the
    /// cursor returns to the first slot. Calling this again without making objects in between
    /// has no further effect.
    pub fn release(&mut self) {
        let capacity = self.capacity();
        let previous_size = self.size;

        let mut kept = Vec::with_capacity(capacity);
        kept.extend(
            mem::take(&mut self.slots)
                .into_vec()
                .into_iter()
                .flatten()
                .filter_map(|mut entry| slot::is_free(&mut entry).then_some(entry))
                .map(Some),
        );

        self.size = kept.len();
        self.cursor = 0;

        kept.resize_with(capacity, || None);
        self.slots = kept.into_boxed_slice();

        debug!(
            released = previous_size.saturating_sub(self.size),
            size = self.size,
            "released referenced objects from circular pool"
        );
    }

    /// Removes all objects from the pool.
    ///
    /// Objects still referenced by callers remain valid.
    pub fn clear(&mut self) {
        self.slots.fill(None);
        self.size = 0;
        self.cursor = 0;

        debug!("cleared circular pool");
    }
}

impl<T> Default for CircularPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CircularPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("size", &self.size)
            .field("capacity", &self.capacity())
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

fn empty_slots<T>(capacity: usize) -> Box<[Option<Arc<T>>]> {
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || None);
    slots.into_boxed_slice()
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
    use crate::test_objects::{Fallible, Foo, SharedFoo};

    fn pool_with_capacity(capacity: NonZero<usize>) -> CircularPool<Foo> {
        CircularPool::builder().capacity(capacity).build()
    }

    #[test]
    fn smoke_test() {
        let mut pool = pool_with_capacity(nz!(5));

        assert_eq!(pool.size(), 0);
        assert!(pool.is_empty());

        _ = pool.make(());
        assert_eq!(pool.size(), 1);
        _ = pool.make(());
        assert_eq!(pool.size(), 1);

        let c1 = pool.make(());
        assert_eq!(Arc::strong_count(&c1), 2);
        assert_eq!(pool.size(), 1);

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
    fn size_never_exceeds_capacity_without_retention() {
        let mut pool = pool_with_capacity(nz!(3));

        for _ in 0..100 {
            _ = pool.make(());
            assert_eq!(pool.size(), 1);
        }
    }

    #[test]
    fn size_never_exceeds_capacity_with_retention() {
        let mut pool = pool_with_capacity(nz!(3));
        let mut held = Vec::new();

        for n in 1..=10 {
            held.push(pool.make(()));
            assert_eq!(pool.size(), n.min(3));
        }
    }

    #[test]
    fn rotating_holders_limit_growth() {
        let mut pool = pool_with_capacity(nz!(10));
        let mut held: [Option<SharedFoo>; 3] = Default::default();
        let mut next = 0;

        for _ in 0..20 {
            held[next] = Some(pool.make(()));
            next = (next + 1) % 3;

            assert!(pool.size() < 5);
        }
    }

    #[test]
    fn every_handed_out_object_is_tracked() {
        let mut pool = pool_with_capacity(nz!(10));
        let mut held: [Option<SharedFoo>; 2] = Default::default();

        // Deterministic stand-in for a random slot choice.
        let mut state = 0x2545_f491_u32;

        for _ in 0..1000 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let index = (state % 2) as usize;

            held[index] = Some(pool.make(()));
            assert_eq!(Arc::strong_count(held[index].as_ref().unwrap()), 2);
        }
    }

    #[test]
    fn release_drops_referenced_objects() {
        let mut pool = pool_with_capacity(nz!(10));

        let held: Vec<_> = (0..3).map(|_| pool.make(())).collect();
        assert_eq!(pool.size(), 3);

        pool.release();
        assert_eq!(pool.size(), 0);

        let held: Vec<_> = held.iter().map(|_| pool.make(())).collect();
        assert_eq!(pool.size(), 3);

        pool.release();
        assert_eq!(pool.size(), 0);

        for foo in &held {
            assert_eq!(Arc::strong_count(foo), 1);
        }
    }

    #[test]
    fn release_keeps_free_objects_in_order() {
        let mut pool = pool_with_capacity(nz!(4));

        let a = pool.make(());
        let b = pool.make(());
        let c = pool.make(());
        let a_ptr = Arc::as_ptr(&a);
        let c_ptr = Arc::as_ptr(&c);
        drop(a);
        drop(c);

        pool.release();
        assert_eq!(pool.size(), 2);
        assert_eq!(Arc::strong_count(&b), 1);

        // Both survivors are packed at the front, in their previous order.
        assert_eq!(Arc::as_ptr(pool.slots[0].as_ref().unwrap()), a_ptr);
        assert_eq!(Arc::as_ptr(pool.slots[1].as_ref().unwrap()), c_ptr);
        assert!(pool.slots[2].is_none());

        pool.release();
        assert_eq!(pool.size(), 2);

        assert_eq!(Arc::as_ptr(&pool.make(())), a_ptr);
    }

    #[test]
    fn resize_discards_contents() {
        let mut pool = pool_with_capacity(nz!(2));

        let held = pool.make(());
        _ = pool.make(());
        assert_eq!(pool.size(), 2);

        pool.resize(8).unwrap();

        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.size(), 0);
        assert_eq!(Arc::strong_count(&held), 1);
    }

    #[test]
    fn resize_to_zero_fails() {
        let mut pool = pool_with_capacity(nz!(2));
        let held = pool.make(());

        assert_eq!(pool.resize(0), Err(Error::ZeroCapacity));

        assert_eq!(pool.capacity(), 2);
        assert_eq!(pool.size(), 1);
        assert_eq!(Arc::strong_count(&held), 2);
    }

    #[test]
    fn recycling_reinitializes() {
        let mut pool = CircularPool::<Cell<u8>>::new();

        let cell = pool.make(7);
        assert_eq!(cell.get(), 7);
        cell.set(42);
        drop(cell);

        let cell = pool.make(9);
        assert_eq!(cell.get(), 9);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn failed_construction_leaves_pool_unchanged() {
        let mut pool = CircularPool::<Fallible>::builder()
            .capacity(nz!(2))
            .build();

        let first = pool.try_make(true).unwrap();
        assert_eq!(pool.size(), 1);

        assert!(pool.try_make(false).is_err());
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.cursor, 0);

        let second = pool.try_make(true).unwrap();
        assert_eq!(pool.size(), 2);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn thread_mobility() {
        assert_impl_all!(CircularPool<String>: Send, Sync);
        assert_not_impl_any!(CircularPool<Rc<u32>>: Send, Sync);
        assert_not_impl_any!(CircularPool<Cell<u32>>: Send, Sync);
    }

    #[test]
    fn debug_reports_state() {
        let mut pool = pool_with_capacity(nz!(3));
        _ = pool.make(());

        let debug = format!("{pool:?}");

        assert!(debug.contains("size: 1"));
        assert!(debug.contains("capacity: 3"));
    }
}
