//! Basic usage of the `recycle_pool` crate:
//!
//! * Defining a poolable type.
//! * Making objects from each kind of pool.
//! * Observing when objects are recycled and when they are replaced.
//!
//! The pools log their recycling decisions at the `trace` level, which this example prints.

use std::convert::Infallible;
use std::sync::Arc;

use new_zealand::nz;
use recycle_pool::{CircularPool, LinkedPool, ListPool, Recycle};
use tracing::Level;

/// A message that remembers how many times it has been reused.
#[derive(Debug)]
struct Message {
    topic: String,
    reuse_count: usize,
}

impl Recycle<&str> for Message {
    type Error = Infallible;

    fn create(topic: &str) -> Result<Self, Self::Error> {
        Ok(Self {
            topic: topic.to_string(),
            reuse_count: 0,
        })
    }

    fn recycle(&mut self, topic: &str) {
        // Reuses the existing string allocation.
        self.topic.clear();
        self.topic.push_str(topic);
        self.reuse_count = self.reuse_count.wrapping_add(1);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::TRACE)
        .init();

    let mut circular = CircularPool::<Message>::builder()
        .capacity(nz!(4))
        .build();

    // Dropping a handle right away lets the pool hand out the same object again.
    for topic in ["alpha", "beta", "gamma"] {
        let message = circular.make(topic);
        println!(
            "circular: {} (reused {} times)",
            message.topic, message.reuse_count
        );
    }

    // Holding on to a handle makes the pool use another slot.
    let held = circular.make("held");
    let other = circular.make("other");
    println!(
        "circular pool holds {} of at most {} objects; held and other are distinct: {}",
        circular.size(),
        circular.capacity(),
        !Arc::ptr_eq(&held, &other)
    );

    // A linked pool hands its first object back as is if nobody uses it.
    let mut linked = LinkedPool::<Message>::new();
    drop(linked.make("first"));
    let again = linked.make("second");
    println!("linked: asked for 'second', got '{}'", again.topic);

    // A list pool only forgets objects that callers still hold when asked to.
    let mut list = ListPool::<Message>::builder().capacity(nz!(8)).build();
    let batch: Vec<_> = ["one", "two", "three"]
        .into_iter()
        .map(|topic| list.make(topic))
        .collect();

    let kept = Arc::clone(batch.get(1).expect("the batch holds three messages"));
    drop(batch);

    list.release();
    println!(
        "list: {} objects left after release, kept '{}' is no longer tracked",
        list.size(),
        kept.topic
    );
}
