//! Objects shared by the unit tests of the pools.

use std::cell::Cell;
use std::convert::Infallible;
use std::sync::Arc;

use crate::Recycle;

/// A moderately heavy object that zeroes itself when recycled.
#[derive(Debug, Default)]
pub(crate) struct Foo {
    pub(crate) data: [u8; 32],
}

impl Recycle for Foo {
    type Error = Infallible;

    fn create((): ()) -> Result<Self, Self::Error> {
        Ok(Self::default())
    }

    fn recycle(&mut self, (): ()) {
        self.data.fill(0);
    }
}

pub(crate) type SharedFoo = Arc<Foo>;

/// Constructed only if the argument is `true`.
#[derive(Debug)]
pub(crate) struct Fallible;

impl Recycle<bool> for Fallible {
    type Error = &'static str;

    fn create(succeed: bool) -> Result<Self, Self::Error> {
        if succeed {
            Ok(Self)
        } else {
            Err("construction failed")
        }
    }

    fn recycle(&mut self, _succeed: bool) {}
}

// Lets tests observe whether an object was reinitialized, by writing through a shared handle.
impl Recycle<u8> for Cell<u8> {
    type Error = Infallible;

    fn create(value: u8) -> Result<Self, Self::Error> {
        Ok(Self::new(value))
    }

    fn recycle(&mut self, value: u8) {
        self.set(value);
    }
}
