//! The holder-count protocol shared by all pools.
//!
//! Pool entries are plain [`Arc`]s. The pool keeps one strong reference in its own storage and
//! hands out clones, so the strong count tells us how many holders an entry has. An entry is free
//! for reuse only when the pool can obtain exclusive access to it, which means the pool is its
//! only strong holder and no [`Weak`][std::sync::Weak] handle exists that could be upgraded.

use std::sync::Arc;

use crate::Recycle;

/// Whether the pool is the only holder of the entry.
pub(crate) fn is_free<T>(entry: &mut Arc<T>) -> bool {
    Arc::get_mut(entry).is_some()
}

/// Reinitializes the entry in place and returns a new handle to it, if the pool is its only
/// holder.
///
/// If the entry is held elsewhere, the arguments are handed back so the caller can construct a
/// new object from them instead.
pub(crate) fn try_recycle<T, A>(entry: &mut Arc<T>, args: A) -> Result<Arc<T>, A>
where
    T: Recycle<A>,
{
    match Arc::get_mut(entry) {
        Some(object) => {
            object.recycle(args);
            Ok(Arc::clone(entry))
        }
        None => Err(args),
    }
}

/// Constructs a new, not yet stored, entry.
pub(crate) fn create<T, A>(args: A) -> Result<Arc<T>, T::Error>
where
    T: Recycle<A>,
{
    T::create(args).map(Arc::new)
}

/// Number of holders of an entry that are not the pool itself.
///
/// Only used for diagnostics when the pool drops an entry from its storage.
pub(crate) fn external_holders<T>(entry: &Arc<T>) -> usize {
    Arc::strong_count(entry).saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

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

    #[test]
    fn sole_holder_is_free() {
        let Ok(mut entry) = create::<Tag, u32>(1);

        assert!(is_free(&mut entry));
        assert_eq!(external_holders(&entry), 0);
    }

    #[test]
    fn clone_makes_entry_busy() {
        let Ok(mut entry) = create::<Tag, u32>(1);
        let held = Arc::clone(&entry);

        assert!(!is_free(&mut entry));
        assert_eq!(external_holders(&entry), 1);

        drop(held);
        assert!(is_free(&mut entry));
    }

    #[test]
    fn weak_handle_makes_entry_busy() {
        let Ok(mut entry) = create::<Tag, u32>(1);
        let weak = Arc::downgrade(&entry);

        assert!(!is_free(&mut entry));

        drop(weak);
        assert!(is_free(&mut entry));
    }

    #[test]
    fn recycle_free_entry_in_place() {
        let Ok(mut entry) = create::<Tag, u32>(1);
        let original = Arc::as_ptr(&entry);

        let Ok(recycled) = try_recycle(&mut entry, 2) else {
            panic!("free entry must be recycled");
        };

        assert_eq!(recycled.0, 2);
        assert_eq!(Arc::as_ptr(&recycled), original);
        assert_eq!(Arc::strong_count(&entry), 2);
    }

    #[test]
    fn recycle_busy_entry_returns_args() {
        let Ok(mut entry) = create::<Tag, u32>(1);
        let _held = Arc::clone(&entry);

        let result = try_recycle(&mut entry, 2);

        assert!(matches!(result, Err(2)));
        assert_eq!(entry.0, 1);
    }
}
