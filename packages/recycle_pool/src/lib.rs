#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Fixed-capacity object pools that hand out shared handles and recycle objects once callers stop
//! referencing them.
//!
//! Every pool hands out objects as [`Arc<T>`][std::sync::Arc] and keeps one more reference to
//! each object it tracks. When the pool is the only remaining holder of an object, the object is
//! free and the pool can [reinitialize it in place][Recycle::recycle] instead of allocating a new
//! one. Callers never return objects to the pool; they simply drop their handles.
//!
//! No pool ever exceeds its capacity. The pools differ in what they do when the objects they
//! probe are still in use:
//!
//! * [`CircularPool`] - a ring of slots. Objects still held by callers are evicted from the ring
//!   and replaced. Needs no maintenance.
//! * [`LinkedPool`] - a sequence that loops back to its first object when full, evicting it.
//!   [`LinkedPool::release()`] drops held objects early, but is not required.
//! * [`ListPool`] - a sequence that never evicts on its own. Once full, new objects are handed out
//!   without being tracked. Call [`ListPool::release()`] periodically to drop objects that callers
//!   hold on to.
//!
//! A pool is used from one thread at a time (it requires `&mut self` to make objects) but the
//! handles it returns can go anywhere.
//!
//! # Pooled objects
//!
//! Pooled types implement [`Recycle`], which tells the pool how to construct an object and how to
//! reinitialize one for reuse. The crate also provides [`Buffer`], a growable run of elements that
//! keeps its storage when shrunk, which is a natural fit for pooling.
//!
//! Handles are shared, so write access to a pooled object goes through a cell or lock.
//! [`Recycle`] is implemented for [`Mutex<T>`][std::sync::Mutex] and
//! [`RefCell<T>`][std::cell::RefCell] whenever it is implemented for `T`.
//!
//! # Examples
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use new_zealand::nz;
//! use recycle_pool::{Buffer, CircularPool};
//!
//! let mut pool = CircularPool::<Mutex<Buffer<u8>>>::builder()
//!     .capacity(nz!(4))
//!     .build();
//!
//! let packet = pool.make(1500);
//! packet.lock().unwrap().fill(0xAB);
//! let packet_ptr = Arc::as_ptr(&packet);
//! drop(packet);
//!
//! // The buffer was not referenced anymore, so the same one is handed out again, cleared.
//! let packet = pool.make(1500);
//! assert_eq!(Arc::as_ptr(&packet), packet_ptr);
//! assert!(packet.lock().unwrap().iter().all(|b| *b == 0));
//! ```
//!
//! Objects whose construction can fail are made with `try_make()`, which forwards the error:
//!
//! ```
//! use recycle_pool::{ListPool, Recycle};
//!
//! struct Connection {
//!     port: u16,
//! }
//!
//! impl Recycle<u16> for Connection {
//!     type Error = String;
//!
//!     fn create(port: u16) -> Result<Self, Self::Error> {
//!         if port == 0 {
//!             return Err("port 0 is not allowed".to_string());
//!         }
//!
//!         Ok(Self { port })
//!     }
//!
//!     fn recycle(&mut self, port: u16) {
//!         self.port = port;
//!     }
//! }
//!
//! let mut pool = ListPool::<Connection>::new();
//!
//! assert!(pool.try_make(0).is_err());
//! assert!(pool.is_empty());
//!
//! let connection = pool.try_make(8080).unwrap();
//! assert_eq!(connection.port, 8080);
//! ```

mod buffer;
mod builder;
mod circular_pool;
mod error;
mod linked_pool;
mod linked_slots;
mod list_pool;
mod recycle;
mod slot;

#[cfg(test)]
mod test_objects;

pub use buffer::Buffer;
pub use builder::*;
pub use circular_pool::CircularPool;
pub use error::*;
pub use linked_pool::LinkedPool;
pub(crate) use linked_slots::*;
pub use list_pool::ListPool;
pub use recycle::Recycle;
