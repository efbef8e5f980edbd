use std::any::type_name;
use std::convert::Infallible;
use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};

use crate::Recycle;

/// A contiguous run of elements whose visible length can shrink and grow again without
/// reallocating.
///
/// The buffer owns storage for [`capacity()`][Self::capacity] elements, of which the first
/// [`len()`][Self::len] are visible through the slice API. Shrinking the buffer keeps the storage
/// around so a later growth up to the capacity is free. This makes buffers a good fit for pooling:
/// a recycled buffer only reallocates when asked for more elements than it ever held.
///
/// # Examples
///
/// ```
/// use recycle_pool::Buffer;
///
/// let mut buffer = Buffer::<u8>::new(2048);
/// buffer[1] = 10;
/// assert_eq!(buffer[1], 10);
///
/// buffer.reset(1024);
/// assert_eq!(buffer.len(), 1024);
/// assert_eq!(buffer.capacity(), 2048);
/// assert_eq!(buffer[1], 0);
///
/// buffer.release();
/// assert_eq!(buffer.capacity(), 1024);
/// ```
#[derive(Clone)]
pub struct Buffer<T> {
    storage: Box<[T]>,

    // Never greater than `storage.len()`.
    len: usize,
}

impl<T> Buffer<T> {
    /// Number of visible elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of elements the buffer can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Whether the buffer has no visible elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shrinks the storage to exactly the visible length. The visible elements are kept.
    #[cfg_attr(test, mutants::skip)] // Removing the early return only costs a reallocation.
    pub fn release(&mut self) {
        if self.len == self.storage.len() {
            return;
        }

        let mut storage = mem::take(&mut self.storage).into_vec();
        storage.truncate(self.len);
        self.storage = storage.into_boxed_slice();
    }
}

impl<T: Default> Buffer<T> {
    /// Creates a buffer of `len` default-initialized elements.
    #[must_use]
    pub fn new(len: usize) -> Self {
        let mut storage = Vec::with_capacity(len);
        storage.resize_with(len, T::default);

        Self {
            storage: storage.into_boxed_slice(),
            len,
        }
    }

    /// Changes the visible length of the buffer.
    ///
    /// * A length of zero drops the storage.
    /// * A length above the capacity reallocates the storage to exactly `len` elements. The
    ///   previously visible elements are kept, the rest are default-initialized.
    /// * Any other length only changes which elements are visible. Elements that become visible
    ///   again have whatever value they had before.
    pub fn resize(&mut self, len: usize) {
        if len == 0 {
            self.storage = Box::default();
            self.len = 0;
            return;
        }

        if len > self.storage.len() {
            let mut storage = Vec::with_capacity(len);
            storage.extend(
                mem::take(&mut self.storage)
                    .into_vec()
                    .into_iter()
                    .take(self.len),
            );
            storage.resize_with(len, T::default);
            self.storage = storage.into_boxed_slice();
        }

        self.len = len;
    }

    /// Resizes the buffer and resets every visible element to its default value.
    pub fn reset(&mut self, len: usize) {
        self.resize(len);
        self.fill_with(T::default);
    }

    /// Empties the buffer and drops its storage.
    pub fn clear(&mut self) {
        self.reset(0);
    }
}

impl<T> Deref for Buffer<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.storage
            .get(..self.len)
            .expect("visible length never exceeds the storage length")
    }
}

impl<T> DerefMut for Buffer<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.storage
            .get_mut(..self.len)
            .expect("visible length never exceeds the storage length")
    }
}

impl<T> Default for Buffer<T> {
    fn default() -> Self {
        Self {
            storage: Box::default(),
            len: 0,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("elements", &self.deref())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

/// Pooled buffers are created with, and reset to, the requested length.
impl<T: Default> Recycle<usize> for Buffer<T> {
    type Error = Infallible;

    fn create(len: usize) -> Result<Self, Self::Error> {
        Ok(Self::new(len))
    }

    fn recycle(&mut self, len: usize) {
        self.reset(len);
    }
}

#[cfg(test)]
#[allow(
    clippy::indexing_slicing,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::ptr;
    use std::sync::{Arc, Mutex};

    use new_zealand::nz;
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::CircularPool;

    fn bytes(elements: &[u8]) -> Buffer<u8> {
        let mut buffer = Buffer::new(elements.len());
        buffer.copy_from_slice(elements);
        buffer
    }

    #[test]
    fn smoke_test() {
        let buffer = Buffer::<u8>::new(16);

        assert_eq!(buffer.len(), 16);
        assert_eq!(buffer.capacity(), 16);
        assert!(!buffer.is_empty());
        assert!(buffer.iter().all(|b| *b == 0));
    }

    #[test]
    fn length_and_capacity_transitions() {
        let mut buffer = Buffer::<u8>::new(2048);
        assert_eq!(buffer.len(), 2048);
        assert_eq!(buffer.capacity(), 2048);

        buffer.reset(1024);
        assert_eq!(buffer.len(), 1024);
        assert_eq!(buffer.capacity(), 2048);

        buffer.reset(4096);
        assert_eq!(buffer.len(), 4096);
        assert_eq!(buffer.capacity(), 4096);

        buffer.reset(1024);
        assert_eq!(buffer.len(), 1024);
        assert_eq!(buffer.capacity(), 4096);

        buffer.release();
        assert_eq!(buffer.len(), 1024);
        assert_eq!(buffer.capacity(), 1024);
    }

    #[test]
    fn index_and_pointer() {
        let mut buffer = Buffer::<u8>::new(2048);

        buffer[1] = 10;

        assert_eq!(buffer[1], 10);
        assert_eq!(ptr::from_ref(&buffer[0]), buffer.as_ptr());
    }

    #[test]
    fn iterate_mut() {
        let mut buffer = Buffer::<u8>::new(2048);

        let mut counter = 0_u8;
        for element in buffer.iter_mut() {
            counter = counter.wrapping_add(1);
            *element = counter;
        }

        assert_eq!(buffer[0], 1);
        assert_eq!(buffer[1], 2);
        assert_eq!(buffer[2], 3);
        assert_eq!(buffer[254], 255);
        assert_eq!(buffer[255], 0);
    }

    #[test]
    fn fill_and_copy() {
        let mut source = Buffer::<u8>::new(2048);
        source.fill(45);
        assert!(source.iter().all(|b| *b == 45));

        let mut destination = Buffer::<u8>::new(2048);
        destination.copy_from_slice(&source);
        assert!(destination.iter().all(|b| *b == 45));
    }

    #[test]
    fn holds_any_default_type() {
        let mut words = Buffer::<u64>::new(3);
        words.copy_from_slice(&[1, 2, 3]);
        assert_eq!(&*words, &[1, 2, 3]);

        let mut strings = Buffer::<String>::new(3);
        for (index, element) in strings.iter_mut().enumerate() {
            *element = (index + 1).to_string();
        }
        assert_eq!(&*strings, &["1", "2", "3"]);
    }

    #[test]
    fn resize_to_zero_drops_storage() {
        let mut buffer = Buffer::<u8>::new(64);

        buffer.resize(0);

        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 0);
    }

    #[test]
    fn shrink_and_grow_within_capacity_keeps_content() {
        let mut buffer = bytes(&[1, 2, 3, 4]);

        buffer.resize(2);
        assert_eq!(&*buffer, &[1, 2]);

        buffer.resize(4);
        assert_eq!(&*buffer, &[1, 2, 3, 4]);
    }

    #[test]
    fn grow_past_capacity_keeps_visible_prefix() {
        let mut buffer = bytes(&[1, 2, 3, 4]);
        buffer.resize(2);

        buffer.resize(6);

        assert_eq!(&*buffer, &[1, 2, 0, 0, 0, 0]);
        assert_eq!(buffer.capacity(), 6);
    }

    #[test]
    fn release_keeps_content() {
        let mut buffer = bytes(&[1, 2, 3, 4]);
        buffer.resize(3);

        buffer.release();

        assert_eq!(&*buffer, &[1, 2, 3]);
        assert_eq!(buffer.capacity(), 3);

        buffer.release();
        assert_eq!(buffer.capacity(), 3);
    }

    #[test]
    fn clear_drops_storage() {
        let mut buffer = Buffer::<u8>::new(8);

        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 0);
    }

    #[test]
    fn debug_shows_visible_elements() {
        let mut buffer = bytes(&[7, 8, 9]);
        buffer.resize(2);

        let debug = format!("{buffer:?}");

        assert!(debug.contains("[7, 8]"));
        assert!(debug.contains("capacity: 3"));
    }

    #[test]
    fn pooled_buffers_are_reset() {
        let mut pool = CircularPool::<Mutex<Buffer<u8>>>::builder()
            .capacity(nz!(2))
            .build();

        let first = pool.make(128);
        first.lock().unwrap().fill(0xff);
        assert_eq!(Arc::strong_count(&first), 2);
        drop(first);

        let second = pool.make(64);
        let second = second.lock().unwrap();

        assert_eq!(second.len(), 64);
        assert_eq!(second.capacity(), 128);
        assert!(second.iter().all(|b| *b == 0));
    }

    #[test]
    fn thread_mobility() {
        assert_impl_all!(Buffer<u8>: Send, Sync, Clone, Default);
    }
}
