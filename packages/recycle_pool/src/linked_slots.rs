use std::mem;
use std::num::NonZero;
use std::sync::Arc;

use tracing::trace;

use crate::{Recycle, slot};

/// Position of the cursor of a linked pool.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Cursor {
    /// Before the first entry. The next probe starts at the first entry.
    BeforeStart,

    /// At the entry with the given index.
    At(usize),
}

impl Cursor {
    /// Index of the entry after the cursor, which may be one past the last entry.
    fn successor(self) -> usize {
        match self {
            Self::BeforeStart => 0,
            // Entry indexes are bounded by the entry count, so this cannot overflow.
            Self::At(index) => index.wrapping_add(1),
        }
    }
}

/// Storage shared by [`LinkedPool`][crate::LinkedPool] and [`ListPool`][crate::ListPool].
///
/// The entries form an ordered sequence that only ever grows at the position after the cursor.
/// The cursor persists across calls and marks where the next probe for a free entry begins.
#[derive(Debug)]
pub(crate) struct LinkedSlots<T> {
    entries: Vec<Arc<T>>,
    cursor: Cursor,
    capacity: NonZero<usize>,
}

impl<T> LinkedSlots<T> {
    pub(crate) fn new(capacity: NonZero<usize>) -> Self {
        Self {
            entries: Vec::new(),
            cursor: Cursor::BeforeStart,
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity.get()
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Moves the cursor before the first entry.
    pub(crate) fn rewind(&mut self) {
        self.cursor = Cursor::BeforeStart;
    }

    /// Whether the cursor is at the last entry, or before the start of an empty sequence.
    pub(crate) fn at_end(&self) -> bool {
        self.cursor.successor() >= self.entries.len()
    }

    pub(crate) fn head_mut(&mut self) -> Option<&mut Arc<T>> {
        self.entries.first_mut()
    }

    /// The entry under the cursor, if the cursor is at an entry.
    pub(crate) fn current_mut(&mut self) -> Option<&mut Arc<T>> {
        match self.cursor {
            Cursor::BeforeStart => None,
            Cursor::At(index) => self.entries.get_mut(index),
        }
    }

    /// Moves the cursor to the first entry and returns a new handle to it.
    pub(crate) fn seek_head(&mut self) -> Option<Arc<T>> {
        let head = self.entries.first().map(Arc::clone)?;
        self.cursor = Cursor::At(0);
        Some(head)
    }

    /// Inserts an entry after the cursor and moves the cursor to it.
    pub(crate) fn insert_after_cursor(&mut self, entry: Arc<T>) {
        let index = self.cursor.successor();
        self.entries.insert(index, entry);
        self.cursor = Cursor::At(index);
    }

    /// Replaces the first entry, returning the previous one.
    pub(crate) fn replace_head(&mut self, entry: Arc<T>) -> Option<Arc<T>> {
        self.entries
            .first_mut()
            .map(|head| mem::replace(head, entry))
    }

    /// Moves the cursor to the next entry and hands out that entry if it is free, reinitialized
    /// in place. If it is held elsewhere, a new object takes its place in the sequence.
    ///
    /// The cursor only moves once an entry is available, so a failed construction leaves the
    /// sequence and the cursor unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is [at the end][Self::at_end].
    pub(crate) fn advance_and_make<A>(&mut self, args: A) -> Result<Arc<T>, T::Error>
    where
        T: Recycle<A>,
    {
        let index = self.cursor.successor();

        let current = self
            .entries
            .get_mut(index)
            .expect("caller must check that the cursor is not at the end");

        let entry = match slot::try_recycle(current, args) {
            Ok(recycled) => {
                trace!(index, "recycled entry after cursor");
                recycled
            }
            Err(args) => {
                let created = slot::create(args)?;
                trace!(
                    index,
                    external_holders = slot::external_holders(current),
                    "replaced referenced entry after cursor"
                );
                *current = Arc::clone(&created);
                created
            }
        };

        self.cursor = Cursor::At(index);

        Ok(entry)
    }

    /// Removes every entry that is referenced outside the pool and returns how many were removed.
    ///
    /// The cursor is left as is; callers are expected to rewind it.
    pub(crate) fn retain_free(&mut self) -> usize {
        let previous_len = self.entries.len();

        self.entries.retain_mut(slot::is_free);

        previous_len.saturating_sub(self.entries.len())
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.cursor = Cursor::BeforeStart;
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[Arc<T>] {
        &self.entries
    }
}

#[cfg(test)]
#[allow(
    clippy::indexing_slicing,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::convert::Infallible;

    use new_zealand::nz;

    use super::*;

    #[derive(Debug)]
    struct Tag(u32);

    impl Recycle<u32> for Tag {
        type Error = Infallible;

        fn create(value: u32) -> Result<Self, Self::Error> {
            Ok(Self(value))
        }

        fn recycle(&mut self, value: u32) {
            self.0 = value;
        }
    }

    fn tag(value: u32) -> Arc<Tag> {
        Arc::new(Tag(value))
    }

    #[test]
    fn successor() {
        assert_eq!(Cursor::BeforeStart.successor(), 0);
        assert_eq!(Cursor::At(0).successor(), 1);
        assert_eq!(Cursor::At(41).successor(), 42);
    }

    #[test]
    fn empty_is_at_end() {
        let slots = LinkedSlots::<Tag>::new(nz!(2));

        assert!(slots.at_end());
        assert!(!slots.is_full());
        assert_eq!(slots.cursor(), Cursor::BeforeStart);
    }

    #[test]
    fn insert_advances_cursor() {
        let mut slots = LinkedSlots::new(nz!(2));

        slots.insert_after_cursor(tag(1));
        assert_eq!(slots.cursor(), Cursor::At(0));
        assert!(slots.at_end());

        slots.insert_after_cursor(tag(2));
        assert_eq!(slots.cursor(), Cursor::At(1));
        assert!(slots.is_full());
        assert_eq!(slots.len(), 2);
    }

    #[test]
    fn insert_after_rewound_cursor_goes_first() {
        let mut slots = LinkedSlots::new(nz!(3));

        slots.insert_after_cursor(tag(1));
        slots.rewind();
        slots.insert_after_cursor(tag(2));

        assert_eq!(slots.entries()[0].0, 2);
        assert_eq!(slots.entries()[1].0, 1);
        assert_eq!(slots.cursor(), Cursor::At(0));
    }

    #[test]
    fn advance_recycles_free_entry() {
        let mut slots = LinkedSlots::new(nz!(2));
        slots.insert_after_cursor(tag(1));
        slots.rewind();

        let entry = slots.advance_and_make(5).unwrap();

        assert_eq!(entry.0, 5);
        assert!(Arc::ptr_eq(&entry, &slots.entries()[0]));
        assert_eq!(slots.cursor(), Cursor::At(0));
    }

    #[test]
    fn advance_replaces_referenced_entry() {
        let mut slots = LinkedSlots::new(nz!(2));
        slots.insert_after_cursor(tag(1));
        let held = Arc::clone(&slots.entries()[0]);
        slots.rewind();

        let entry = slots.advance_and_make(5).unwrap();

        assert_eq!(entry.0, 5);
        assert_eq!(held.0, 1);
        assert!(!Arc::ptr_eq(&entry, &held));
        assert_eq!(Arc::strong_count(&held), 1);
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn seek_head() {
        let mut slots = LinkedSlots::new(nz!(2));
        assert!(slots.seek_head().is_none());

        slots.insert_after_cursor(tag(1));
        slots.insert_after_cursor(tag(2));

        let head = slots.seek_head().unwrap();
        assert_eq!(head.0, 1);
        assert_eq!(slots.cursor(), Cursor::At(0));
    }

    #[test]
    fn replace_head() {
        let mut slots = LinkedSlots::new(nz!(2));
        assert!(slots.replace_head(tag(9)).is_none());

        slots.insert_after_cursor(tag(1));
        let previous = slots.replace_head(tag(2)).unwrap();

        assert_eq!(previous.0, 1);
        assert_eq!(slots.entries()[0].0, 2);
    }

    #[test]
    fn retain_free_removes_referenced() {
        let mut slots = LinkedSlots::new(nz!(4));
        for value in 0..4 {
            slots.insert_after_cursor(tag(value));
        }
        let held_1 = Arc::clone(&slots.entries()[1]);
        let held_3 = Arc::clone(&slots.entries()[3]);

        assert_eq!(slots.retain_free(), 2);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots.entries()[0].0, 0);
        assert_eq!(slots.entries()[1].0, 2);

        assert_eq!(slots.retain_free(), 0);
        assert_eq!(Arc::strong_count(&held_1), 1);
        assert_eq!(Arc::strong_count(&held_3), 1);
    }

    #[test]
    fn clear_rewinds() {
        let mut slots = LinkedSlots::new(nz!(2));
        slots.insert_after_cursor(tag(1));

        slots.clear();

        assert_eq!(slots.len(), 0);
        assert_eq!(slots.cursor(), Cursor::BeforeStart);
    }
}
