use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

pin_project! {
    /// Stream returned by [`distinct_until_changed`](crate::StreamUtils::distinct_until_changed).
    #[must_use = "streams do nothing unless polled"]
    pub struct DistinctUntilChanged<S, T> {
        #[pin]
        stream: S,
        last: Option<T>,
    }
}

impl<S, T> DistinctUntilChanged<S, T> {
    pub(crate) fn new(stream: S) -> Self {
        Self { stream, last: None }
    }
}

impl<S, T> Stream for DistinctUntilChanged<S, T>
where
    S: Stream<Item = T>,
    T: PartialEq + Clone,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(item) if this.last.as_ref() == Some(&item) => continue,
                Some(item) => {
                    *this.last = Some(item.clone());
                    return Poll::Ready(Some(item));
                },
                None => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::StreamUtils;
    use futures::{StreamExt, stream};
    use rstest::rstest;

    #[rstest]
    #[case(vec![], vec![])]
    #[case(vec![1, 1, 1], vec![1])]
    #[case(vec![1, 1, 2, 2, 1], vec![1, 2, 1])]
    #[case(vec![1, 2, 3], vec![1, 2, 3])]
    #[tokio::test]
    async fn test_distinct_until_changed(#[case] input: Vec<u8>, #[case] expected: Vec<u8>) {
        let output: Vec<u8> = stream::iter(input).distinct_until_changed().collect().await;
        assert_eq!(output, expected);
    }
}
