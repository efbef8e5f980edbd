//! Integration tests for the `recycle_pool` package.
//!
//! These tests exercise the pools through their public API only, including the way handles are
//! shared with other threads and outlive the pool that created them.

use std::cell::RefCell;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::thread;

use new_zealand::nz;
use recycle_pool::{Buffer, CircularPool, LinkedPool, ListPool, Recycle};

#[derive(Debug, Default)]
struct Foo {
    generation: u32,
}

impl Recycle for Foo {
    type Error = Infallible;

    fn create((): ()) -> Result<Self, Self::Error> {
        Ok(Self::default())
    }

    fn recycle(&mut self, (): ()) {
        self.generation = self.generation.wrapping_add(1);
    }
}

#[test]
fn circular_walkthrough() {
    let mut pool = CircularPool::<Foo>::builder().capacity(nz!(2)).build();

    _ = pool.make(());
    assert_eq!(pool.size(), 1);

    // The first object was not kept by the caller, so it is handed out again.
    let foo1 = pool.make(());
    assert_eq!(pool.size(), 1);
    assert_eq!(foo1.generation, 1);

    let mut foo2 = pool.make(());
    assert_eq!(pool.size(), 2);
    let first_foo2_ptr = Arc::as_ptr(&foo2);

    // The first slot is held by foo1 and the cursor is at the last slot, so the cursor wraps
    // around and a new object overwrites foo1's slot. The freed second slot is not probed.
    drop(foo2);
    foo2 = pool.make(());
    assert_eq!(pool.size(), 2);
    assert_eq!(Arc::strong_count(&foo1), 1);
    assert_ne!(Arc::as_ptr(&foo2), first_foo2_ptr);

    // The object in the second slot is free, so it is reused.
    let foo4 = pool.make(());
    assert_eq!(pool.size(), 2);
    assert_eq!(Arc::as_ptr(&foo4), first_foo2_ptr);
    assert_eq!(foo4.generation, 1);

    // foo2 holds the first slot and the cursor is at the last slot again, so foo2 is evicted.
    let _foo5 = pool.make(());
    assert_eq!(pool.size(), 2);
    assert_eq!(Arc::strong_count(&foo2), 1);
}

#[test]
fn weak_handle_keeps_object_in_use() {
    let mut pool = CircularPool::<Foo>::builder().capacity(nz!(2)).build();

    let first = pool.make(());
    let weak = Arc::downgrade(&first);
    drop(first);

    let second = pool.make(());

    assert!(!Arc::ptr_eq(&second, &weak.upgrade().unwrap()));
    assert_eq!(pool.size(), 2);
}

#[test]
fn handles_outlive_pool() {
    let mut pool = LinkedPool::<Foo>::new();

    let foo = pool.make(());
    drop(pool);

    assert_eq!(Arc::strong_count(&foo), 1);
    assert_eq!(foo.generation, 0);
}

#[test]
fn list_processing_loop() {
    let mut pool = ListPool::<Buffer<u8>>::builder().capacity(nz!(4)).build();
    let mut retained = Vec::new();

    for _ in 0..10 {
        let batch: Vec<_> = (0..3).map(|_| pool.make(64)).collect();

        // One object per iteration is kept beyond the end of the iteration.
        retained.push(Arc::clone(batch.first().unwrap()));
        drop(batch);

        pool.release();
        assert_eq!(pool.size(), 2);
    }

    assert!(retained.iter().all(|buffer| Arc::strong_count(buffer) == 1));
    assert!(retained.iter().all(|buffer| buffer.len() == 64));
}

#[test]
fn handles_shared_with_other_threads() {
    let mut pool = ListPool::<Mutex<Buffer<u8>>>::builder()
        .capacity(nz!(8))
        .build();

    let handles: Vec<_> = (0..4).map(|_| pool.make(256)).collect();
    assert_eq!(pool.size(), 4);

    thread::scope(|s| {
        for handle in handles {
            s.spawn(move || {
                handle.lock().unwrap().fill(0xEE);
            });
        }
    });

    // Every thread has dropped its handle, so the object under the cursor is reused and reset.
    let again = pool.make(256);
    assert_eq!(pool.size(), 4);
    assert!(again.lock().unwrap().iter().all(|b| *b == 0));
}

#[test]
fn pool_moves_between_threads() {
    let pool = CircularPool::<Mutex<Buffer<u8>>>::new();

    let (pool, handle) = thread::spawn(move || {
        let mut pool = pool;
        let handle = pool.make(32);
        (pool, handle)
    })
    .join()
    .unwrap();

    assert_eq!(pool.size(), 1);
    assert_eq!(handle.lock().unwrap().len(), 32);
}

#[test]
fn refcell_objects_can_be_written() {
    let mut pool = CircularPool::<RefCell<Buffer<u8>>>::new();

    let buffer = pool.make(4);
    buffer.borrow_mut().copy_from_slice(&[1, 2, 3, 4]);
    drop(buffer);

    let buffer = pool.make(2);
    assert_eq!(&**buffer.borrow(), &[0, 0]);
    assert_eq!(buffer.borrow().capacity(), 4);
}
