//! Stream and future helpers shared by the shelf crates.
//!
//! Everything in here is written against [`futures`] traits only, so none of
//! it cares which executor ends up polling it:
//!
//! - [`StreamUtils::switch_latest`] maps every item of a stream to a new inner
//!   stream and drops the previous inner stream as soon as a newer item
//!   arrives ("latest wins").
//! - [`StreamUtils::distinct_until_changed`] suppresses consecutive duplicates.
//! - [`SingleFlight`] makes sure at most one instance of an async operation is
//!   running; concurrent callers share its output.

mod distinct;
mod single_flight;
mod switch;

pub use crate::distinct::DistinctUntilChanged;
pub use crate::single_flight::SingleFlight;
pub use crate::switch::SwitchLatest;
use futures::Stream;

/// Extension combinators for any [`Stream`].
pub trait StreamUtils: Stream {
    /// Maps each item to an inner stream and yields from the most recent one
    /// only. When the outer stream produces a new item, the current inner
    /// stream is dropped (cancelling whatever work it owned) before the new
    /// one is polled.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::{StreamExt, stream};
    /// use shelf_asyncutils::StreamUtils;
    ///
    /// # futures::executor::block_on(async {
    /// let items: Vec<_> = stream::iter([1, 2, 3])
    ///     .switch_latest(|n| stream::iter([n * 10, n * 10 + 1]))
    ///     .collect()
    ///     .await;
    /// // The outer stream was always ready, so only the last inner stream survived.
    /// assert_eq!(items, vec![30, 31]);
    /// # });
    /// ```
    fn switch_latest<F, U>(self, f: F) -> SwitchLatest<Self, F, U>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> U,
        U: Stream,
    {
        SwitchLatest::new(self, f)
    }

    /// Yields an item only if it differs from the previously yielded one.
    fn distinct_until_changed(self) -> DistinctUntilChanged<Self, Self::Item>
    where
        Self: Sized,
        Self::Item: PartialEq + Clone,
    {
        DistinctUntilChanged::new(self)
    }
}

impl<S: Stream + ?Sized> StreamUtils for S {}
