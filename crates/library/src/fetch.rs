//! Remote catalog fetching.
//!
//! A fetch is triggered once the catalog has been requested and the device is
//! connected, and again whenever either happens anew. Off Wi-Fi, a fetch only
//! goes ahead once the Wi-Fi-only preference is off; while it is on, the user
//! is asked instead. Failed fetches are retried a fixed number of times, after
//! which an empty catalog is published so the library list stays available.

use crate::channel::watch_stream;
use crate::error::{ErrorKind, Result};
use crate::outputs::{Outputs, SideEffect};
use crate::source::{
    CatalogClientHandle, CatalogServiceHandle, ConnectRequest, ConnectivityHandle, PreferenceHandle, SourceStream,
};
use async_stream::stream;
use derive_more::Display;
use exn::ResultExt;
use futures::{Stream, StreamExt, future, stream};
use shelf_asyncutils::{SingleFlight, StreamUtils};
use shelf_catalog::Catalog;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::instrument;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchState {
    #[default]
    Idle,
    /// Off Wi-Fi with the Wi-Fi-only preference on; waiting for the user.
    AwaitingWifiDecision,
    Fetching,
    /// A previous attempt failed; `attempt` is the one now running.
    Retrying {
        attempt: u32,
    },
    /// A catalog (possibly the empty fallback) has been published.
    Settled,
}

/// Progress text of the running catalog fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Display)]
pub enum CatalogProgress {
    #[default]
    #[display("")]
    Idle,
    #[display("Starting to download the remote library…")]
    Starting,
    #[display("{}", downloading_text(*received, *total))]
    Downloading { received: u64, total: Option<u64> },
    #[display("Parsing remote library…")]
    Parsing,
}

fn downloading_text(received: u64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => {
            let percent = received.saturating_mul(100) / total;
            format!("Downloading remote library: {}%", percent.min(100))
        },
        _ => format!("Downloading remote library: {received} bytes"),
    }
}

/// Sink a catalog transport reports received bytes to.
#[derive(Clone)]
pub struct FetchProgress {
    outputs: Option<Arc<Outputs>>,
    total: Option<u64>,
}

impl FetchProgress {
    pub(crate) fn new(outputs: Arc<Outputs>, total: Option<u64>) -> Self {
        Self { outputs: Some(outputs), total }
    }

    /// A sink that reports nowhere, for fetching outside a session.
    pub fn detached() -> Self {
        Self { outputs: None, total: None }
    }

    /// Expected size of the catalog document, when known.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn update(&self, received: u64) {
        if let Some(outputs) = &self.outputs {
            outputs.catalog_progress(CatalogProgress::Downloading { received, total: self.total });
        }
    }
}

pub(crate) struct CatalogFetcher {
    service: CatalogServiceHandle,
    connectivity: ConnectivityHandle,
    preferences: PreferenceHandle,
    outputs: Arc<Outputs>,
    catalog: watch::Sender<Option<Arc<Catalog>>>,
    clients: SingleFlight<Option<CatalogClientHandle>>,
    url: String,
    attempts: u32,
}

impl CatalogFetcher {
    pub(crate) fn new(
        service: CatalogServiceHandle,
        connectivity: ConnectivityHandle,
        preferences: PreferenceHandle,
        outputs: Arc<Outputs>,
        catalog: watch::Sender<Option<Arc<Catalog>>>,
        url: String,
        attempts: u32,
    ) -> Self {
        Self {
            service,
            connectivity,
            preferences,
            outputs,
            catalog,
            clients: SingleFlight::new(),
            url,
            attempts: attempts.max(1),
        }
    }

    /// Fetches the catalog every time the gated trigger fires. `requests` is
    /// bumped by every explicit catalog request; its initial value counts as
    /// one.
    pub(crate) async fn run(self: Arc<Self>, requests: watch::Receiver<u64>) {
        let requested = watch_stream(requests).map(|_| ());
        let connected = self
            .connectivity
            .network_states()
            .distinct_until_changed()
            .filter(|state| future::ready(state.is_connected()))
            .map(|_| ());
        let this = self.clone();
        let mut gated = Box::pin(triggers(requested, connected).switch_latest(move |()| this.gate()));
        while gated.next().await.is_some() {
            self.fetch().await;
        }
        tracing::debug!("Catalog triggers closed");
    }

    /// Lets a trigger through once fetching is allowed on the current network.
    fn gate(&self) -> SourceStream<()> {
        if self.connectivity.is_wifi() {
            return Box::pin(stream::once(future::ready(())));
        }
        let outputs = self.outputs.clone();
        Box::pin(self.preferences.wifi_only().filter_map(move |wifi_only| {
            if wifi_only {
                tracing::info!("Not on Wi-Fi; asking before fetching the catalog");
                outputs.fetch_state(FetchState::AwaitingWifiDecision);
                outputs.side_effect(SideEffect::ShowWifiOnlyDialog);
            }
            future::ready((!wifi_only).then_some(()))
        }))
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) {
        self.outputs.fetch_state(FetchState::Fetching);
        self.outputs.catalog_progress(CatalogProgress::Starting);
        let catalog = match self.fetch_with_retry().await {
            Ok(catalog) => {
                tracing::info!(books = catalog.len(), "Remote catalog fetched");
                catalog
            },
            Err(err) => {
                tracing::warn!(error = ?err, "Could not fetch the remote catalog; continuing without it");
                Catalog::empty()
            },
        };
        self.outputs.catalog_progress(CatalogProgress::Parsing);
        self.catalog.send_replace(Some(Arc::new(catalog)));
        self.outputs.fetch_state(FetchState::Settled);
    }

    async fn fetch_with_retry(&self) -> Result<Catalog> {
        let mut client = self.client().await;
        let mut attempt = 1;
        loop {
            let result = match &client {
                Some(client) => client.fetch().await.or_raise(|| ErrorKind::Catalog),
                None => Err(exn::Exn::from(ErrorKind::Catalog)),
            };
            let err = match result {
                Ok(catalog) => return Ok(catalog),
                Err(err) if attempt >= self.attempts => return Err(err),
                Err(err) => err,
            };
            tracing::info!(attempt, error = ?err, "Catalog fetch failed; retrying");
            attempt += 1;
            self.outputs.fetch_state(FetchState::Retrying { attempt });
            if client.is_none() {
                client = self.client().await;
            }
        }
    }

    /// Builds a fresh catalog client. Concurrent callers share one build.
    pub(crate) async fn client(&self) -> Option<CatalogClientHandle> {
        let service = self.service.clone();
        let outputs = self.outputs.clone();
        let url = self.url.clone();
        self.clients
            .run(move || async move {
                let content_length = match service.content_length(&url).await {
                    Ok(length) => Some(length),
                    Err(err) => {
                        tracing::debug!(error = ?err, "Catalog size probe failed");
                        None
                    },
                };
                let progress = FetchProgress::new(outputs, content_length);
                match service.connect(ConnectRequest { url, content_length, progress }).await {
                    Ok(client) => Some(client),
                    Err(err) => {
                        tracing::warn!(error = ?err, "Could not build a catalog client");
                        None
                    },
                }
            })
            .await
    }
}

/// Fires once both inputs have produced a value, then on every later value of
/// either.
fn triggers(
    requested: impl Stream<Item = ()> + Send + 'static,
    connected: impl Stream<Item = ()> + Send + 'static,
) -> impl Stream<Item = ()> + Send + 'static {
    stream! {
        let mut requested = Box::pin(requested.fuse());
        let mut connected = Box::pin(connected.fuse());
        let (mut has_request, mut has_connection) = (false, false);
        loop {
            tokio::select! {
                Some(()) = requested.next() => has_request = true,
                Some(()) = connected.next() => has_connection = true,
                else => break,
            }
            if has_request && has_connection {
                yield ();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCatalogService, MockConnectivity, MockPreferences};
    use futures::FutureExt;
    use futures::channel::mpsc;
    use rstest::rstest;
    use shelf_catalog::{Book, NetworkState};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Harness {
        fetcher: Arc<CatalogFetcher>,
        service: Arc<MockCatalogService>,
        connectivity: Arc<MockConnectivity>,
        preferences: Arc<MockPreferences>,
        catalog: watch::Receiver<Option<Arc<Catalog>>>,
        view: crate::LibraryView,
    }

    fn harness(service: MockCatalogService, wifi: bool, wifi_only: bool) -> Harness {
        let service = Arc::new(service);
        let connectivity = Arc::new(MockConnectivity::new(NetworkState::Connected, wifi));
        let preferences = Arc::new(MockPreferences::new(wifi_only));
        let (outputs, view) = Outputs::new(CancellationToken::new());
        let (catalog_tx, catalog) = watch::channel(None);
        let fetcher = Arc::new(CatalogFetcher::new(
            service.clone(),
            connectivity.clone(),
            preferences.clone(),
            outputs,
            catalog_tx,
            "https://example.org/catalog.json".into(),
            5,
        ));
        Harness { fetcher, service, connectivity, preferences, catalog, view }
    }

    fn sample() -> Catalog {
        Catalog::new([Book::new("a", "Alpha").with_language("eng")])
    }

    async fn settled(catalog: &mut watch::Receiver<Option<Arc<Catalog>>>) -> Arc<Catalog> {
        catalog.changed().await.unwrap();
        catalog.borrow_and_update().clone().unwrap()
    }

    #[rstest]
    #[case(0, 1)]
    #[case(4, 5)]
    #[tokio::test]
    async fn test_fetch_succeeds_within_attempts(#[case] failures: usize, #[case] calls: usize) {
        let mut h = harness(MockCatalogService::failing(failures, sample()), true, true);
        let (_requests, rx) = watch::channel(0);
        let task = tokio::spawn(h.fetcher.clone().run(rx));

        assert_eq!(*settled(&mut h.catalog).await, sample());
        assert_eq!(h.service.fetches(), calls);
        assert_eq!(*h.view.catalog_progress.borrow(), CatalogProgress::Parsing);
        h.view.fetch_state.wait_for(|state| *state == FetchState::Settled).await.unwrap();
        task.abort();
    }

    #[tokio::test]
    async fn test_exhausted_retries_publish_empty_catalog() {
        let mut h = harness(MockCatalogService::failing(usize::MAX, sample()), true, true);
        let (_requests, rx) = watch::channel(0);
        let task = tokio::spawn(h.fetcher.clone().run(rx));

        assert!(settled(&mut h.catalog).await.is_empty());
        assert_eq!(h.service.fetches(), 5);
        assert_eq!(*h.view.catalog_progress.borrow(), CatalogProgress::Parsing);
        h.view.fetch_state.wait_for(|state| *state == FetchState::Settled).await.unwrap();
        task.abort();
    }

    #[tokio::test]
    async fn test_waits_for_connection() {
        let mut h = harness(MockCatalogService::new(sample()), true, true);
        h.connectivity.set_state(NetworkState::Disconnected);
        let (_requests, rx) = watch::channel(0);
        let task = tokio::spawn(h.fetcher.clone().run(rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(h.catalog.borrow().is_none());
        h.connectivity.set_state(NetworkState::Connected);
        assert_eq!(*settled(&mut h.catalog).await, sample());
        task.abort();
    }

    #[tokio::test]
    async fn test_wifi_only_off_wifi_asks_and_waits() {
        let mut h = harness(MockCatalogService::new(sample()), false, true);
        let (_requests, rx) = watch::channel(0);
        let task = tokio::spawn(h.fetcher.clone().run(rx));

        assert_eq!(h.view.side_effects.recv().await, Some(SideEffect::ShowWifiOnlyDialog));
        assert_eq!(*h.view.fetch_state.borrow(), FetchState::AwaitingWifiDecision);
        assert_eq!(h.service.fetches(), 0);

        h.preferences.set_wifi_only(false);
        assert_eq!(*settled(&mut h.catalog).await, sample());
        task.abort();
    }

    #[tokio::test]
    async fn test_new_request_fetches_again() {
        let mut h = harness(MockCatalogService::new(sample()), true, true);
        let (requests, rx) = watch::channel(0);
        let task = tokio::spawn(h.fetcher.clone().run(rx));

        settled(&mut h.catalog).await;
        requests.send_modify(|n| *n += 1);
        settled(&mut h.catalog).await;
        assert_eq!(h.service.fetches(), 2);
        task.abort();
    }

    #[tokio::test]
    async fn test_concurrent_client_builds_share_one_flight() {
        let h = harness(MockCatalogService::new(sample()), true, true);
        let (a, b) = futures::join!(h.fetcher.client(), h.fetcher.client());
        assert!(a.is_some() && b.is_some());
        assert_eq!(h.service.connects(), 1);
    }

    #[tokio::test]
    async fn test_triggers_need_both_inputs() {
        let (requests_tx, requests) = mpsc::unbounded();
        let (connected_tx, connected) = mpsc::unbounded();
        let mut fired = Box::pin(triggers(requests, connected));

        requests_tx.unbounded_send(()).unwrap();
        assert_eq!(fired.next().now_or_never(), None);
        connected_tx.unbounded_send(()).unwrap();
        assert_eq!(fired.next().await, Some(()));
        requests_tx.unbounded_send(()).unwrap();
        assert_eq!(fired.next().await, Some(()));
        drop((requests_tx, connected_tx));
        assert_eq!(fired.next().await, None);
    }

    #[rstest]
    #[case(CatalogProgress::Starting, "Starting to download the remote library…")]
    #[case(CatalogProgress::Downloading { received: 50, total: Some(200) }, "Downloading remote library: 25%")]
    #[case(CatalogProgress::Downloading { received: 50, total: None }, "Downloading remote library: 50 bytes")]
    #[case(CatalogProgress::Parsing, "Parsing remote library…")]
    fn test_progress_text(#[case] progress: CatalogProgress, #[case] expected: &str) {
        assert_eq!(progress.to_string(), expected);
    }
}
