use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// Stream returned by [`switch_latest`](crate::StreamUtils::switch_latest).
    #[must_use = "streams do nothing unless polled"]
    pub struct SwitchLatest<S, F, U> {
        #[pin]
        outer: S,
        #[pin]
        inner: Option<U>,
        f: F,
        outer_done: bool,
    }
}

impl<S, F, U> SwitchLatest<S, F, U> {
    pub(crate) fn new(outer: S, f: F) -> Self {
        Self { outer, inner: None, f, outer_done: false }
    }
}

impl<S, F, U> Stream for SwitchLatest<S, F, U>
where
    S: Stream,
    F: FnMut(S::Item) -> U,
    U: Stream,
{
    type Item = U::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Drain the outer stream before touching the inner one: whatever the
        // newest request is, it replaces (and drops) the one before it.
        while !*this.outer_done {
            match this.outer.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => this.inner.set(Some((this.f)(item))),
                Poll::Ready(None) => *this.outer_done = true,
                Poll::Pending => break,
            }
        }

        let polled = match this.inner.as_mut().as_pin_mut() {
            Some(inner) => inner.poll_next(cx),
            None => Poll::Ready(None),
        };
        match polled {
            Poll::Ready(Some(item)) => Poll::Ready(Some(item)),
            Poll::Ready(None) => {
                this.inner.set(None);
                // Outer stream registered the waker when it returned pending.
                if *this.outer_done { Poll::Ready(None) } else { Poll::Pending }
            },
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::StreamUtils;
    use futures::channel::mpsc;
    use futures::{StreamExt, stream};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_newer_item_replaces_inner_stream() {
        let (tx, rx) = mpsc::unbounded::<u32>();
        let mut switched = rx.switch_latest(|n| stream::iter([n * 10, n * 10 + 1]));

        tx.unbounded_send(1).unwrap();
        assert_eq!(switched.next().await, Some(10));
        // The remaining `11` is discarded in favour of the newer request.
        tx.unbounded_send(2).unwrap();
        assert_eq!(switched.next().await, Some(20));
        drop(tx);
        assert_eq!(switched.collect::<Vec<_>>().await, vec![21]);
    }

    #[tokio::test]
    async fn test_superseded_inner_stream_is_dropped() {
        struct Guard(Arc<AtomicUsize>);
        impl Drop for Guard {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let dropped = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::unbounded::<u32>();
        let counter = dropped.clone();
        let mut switched = rx.switch_latest(move |n| {
            let guard = Guard(counter.clone());
            stream::iter([n]).chain(stream::pending::<u32>()).map(move |n| {
                let _guard = &guard;
                n
            })
        });

        tx.unbounded_send(1).unwrap();
        assert_eq!(switched.next().await, Some(1));
        assert_eq!(dropped.load(Ordering::SeqCst), 0);
        tx.unbounded_send(2).unwrap();
        assert_eq!(switched.next().await, Some(2));
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_outer_stream_ends() {
        let items: Vec<u32> = stream::empty::<u32>().switch_latest(|n| stream::iter([n])).collect().await;
        assert!(items.is_empty());
    }
}
