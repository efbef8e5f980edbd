use thiserror::Error;

/// Errors that can occur when reconfiguring a pool.
#[derive(Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The caller asked for a pool that cannot hold any objects.
    #[error("pool capacity must be at least 1")]
    ZeroCapacity,
}

/// A specialized `Result` type for pool operations, with the crate's [`Error`] type as the default
/// error value.
pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn zero_capacity_message() {
        assert_eq!(
            Error::ZeroCapacity.to_string(),
            "pool capacity must be at least 1"
        );
    }
}
