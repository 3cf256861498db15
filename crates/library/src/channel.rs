//! Adapters from `tokio::sync` channels to streams.

use async_stream::stream;
use futures::Stream;
use tokio::sync::{mpsc, watch};

/// Yields the current value, then every value published after it. Values
/// published in between two polls are coalesced into the latest one.
pub(crate) fn watch_stream<T>(mut rx: watch::Receiver<T>) -> impl Stream<Item = T> + Send
where
    T: Clone + Send + Sync,
{
    stream! {
        let current = rx.borrow_and_update().clone();
        yield current;
        while rx.changed().await.is_ok() {
            let next = rx.borrow_and_update().clone();
            yield next;
        }
    }
}

/// Yields every message until all senders are gone.
pub(crate) fn receiver_stream<T: Send>(mut rx: mpsc::UnboundedReceiver<T>) -> impl Stream<Item = T> + Send {
    stream! {
        while let Some(item) = rx.recv().await {
            yield item;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_watch_stream_starts_with_current_value() {
        let (tx, rx) = watch::channel(1);
        let mut values = Box::pin(watch_stream(rx));
        assert_eq!(values.next().await, Some(1));
        tx.send_replace(2);
        tx.send_replace(3);
        assert_eq!(values.next().await, Some(3));
        drop(tx);
        assert_eq!(values.next().await, None);
    }

    #[tokio::test]
    async fn test_receiver_stream_ends_with_senders() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send("a").unwrap();
        tx.send("b").unwrap();
        drop(tx);
        let items: Vec<_> = receiver_stream(rx).collect().await;
        assert_eq!(items, vec!["a", "b"]);
    }
}
