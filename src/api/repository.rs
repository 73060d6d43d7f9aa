//! Purpose: Compose store, cache, and decoder behind one screen-loading facade.
//! Exports: `ScreenRepository`, `ScreenState`.
//! Role: The only stateful piece of the pipeline; owns memoization slots.
//! Invariants: At most one fetch is in flight per screen key.
//! Invariants: Failed fetches leave the slot empty; failures are never cached.
//! Invariants: `get_screen` emits `Loading` then exactly one terminal state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as SlotMutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::store::{ApiResult, DocumentStore};
use crate::core::decode::decode;
use crate::core::element::ScreenElement;
use crate::core::error::Error;

/// One loaded-screen memoization slot. Holding the async lock across the
/// fetch is what funnels concurrent callers through a single request.
type Slot = Arc<SlotMutex<Option<Arc<[ScreenElement]>>>>;

/// Consumer-facing load state. `Loading` is emitted immediately; exactly one
/// of `Ready` or `Failed` follows.
#[derive(Clone, Debug)]
pub enum ScreenState {
    Loading,
    Ready(Arc<[ScreenElement]>),
    Failed(Arc<Error>),
}

pub struct ScreenRepository<S> {
    store: Arc<S>,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl<S> Clone for ScreenRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            slots: self.slots.clone(),
        }
    }
}

impl<S: DocumentStore> ScreenRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch and decode the screen for `key`, memoizing the decoded
    /// sequence. Repeat calls for a cached key make no store fetch.
    pub async fn load(&self, key: &str) -> ApiResult<Arc<[ScreenElement]>> {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;
        if let Some(cached) = guard.as_ref() {
            tracing::debug!(key, "screen cache hit");
            return Ok(cached.clone());
        }
        tracing::debug!(key, "screen cache miss");
        let raw = self.store.fetch_document(key).await?;
        let elements: Arc<[ScreenElement]> = decode(&raw).into();
        *guard = Some(elements.clone());
        Ok(elements)
    }

    /// Stream form of `load` for view-state consumption: `Loading` now, one
    /// terminal state later. Dropping the stream does not cancel the load;
    /// the worker runs to completion and warms the cache.
    pub fn get_screen(&self, key: &str) -> ReceiverStream<ScreenState> {
        let (tx, rx) = mpsc::channel(2);
        // The channel has capacity for both emissions; this cannot fail.
        let _ = tx.try_send(ScreenState::Loading);

        let repository = self.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            let state = match repository.load(&key).await {
                Ok(elements) => ScreenState::Ready(elements),
                Err(err) => {
                    tracing::warn!(key = key.as_str(), error = %err, "screen load failed");
                    ScreenState::Failed(Arc::new(err))
                }
            };
            let _ = tx.send(state).await;
        });

        ReceiverStream::new(rx)
    }

    /// Drop the cached sequence for `key`; the next load fetches again.
    pub fn evict(&self, key: &str) {
        let mut slots = self.slots.lock().expect("slot map lock");
        slots.remove(key);
    }

    pub fn clear(&self) {
        let mut slots = self.slots.lock().expect("slot map lock");
        slots.clear();
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().expect("slot map lock");
        slots.entry(key.to_string()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{ScreenRepository, ScreenState};
    use crate::api::store::{ApiResult, DocumentStore};
    use crate::core::decode::RawDocument;
    use crate::core::element::ScreenElement;
    use crate::core::error::{Error, ErrorKind};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_stream::StreamExt;

    struct ScriptedStore {
        document: RawDocument,
        fetches: AtomicUsize,
        failures: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedStore {
        fn new() -> Self {
            let document = json!({
                "group": [
                    {"type": "TITLE", "index": 0, "content": "Hi"},
                    {"type": "SPACER", "index": 1, "size": ["HEIGHT", 24]},
                ],
            });
            Self {
                document: document.as_object().expect("object").clone(),
                fetches: AtomicUsize::new(0),
                failures: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn failing(count: usize) -> Self {
            let mut store = Self::new();
            store.failures = AtomicUsize::new(count);
            store
        }

        fn slow(delay: Duration) -> Self {
            let mut store = Self::new();
            store.delay = Some(delay);
            store
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl DocumentStore for ScriptedStore {
        async fn fetch_document(&self, key: &str) -> ApiResult<RawDocument> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(Error::new(ErrorKind::Io)
                    .with_message("scripted fetch failure")
                    .with_key(key));
            }
            Ok(self.document.clone())
        }

        async fn list_keys(&self) -> ApiResult<Vec<String>> {
            Ok(vec!["home".to_string()])
        }
    }

    #[tokio::test]
    async fn same_key_is_served_from_cache() {
        let repository = ScreenRepository::new(ScriptedStore::new());
        let first = repository.load("home").await.expect("first");
        let second = repository.load("home").await.expect("second");
        assert_eq!(first, second);
        assert_eq!(repository.store().fetch_count(), 1);
    }

    #[tokio::test]
    async fn distinct_keys_fetch_independently() {
        let repository = ScreenRepository::new(ScriptedStore::new());
        repository.load("home").await.expect("home");
        repository.load("profile").await.expect("profile");
        assert_eq!(repository.store().fetch_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_cold_calls_share_one_fetch() {
        let repository =
            ScreenRepository::new(ScriptedStore::slow(Duration::from_millis(100)));
        let (first, second) =
            tokio::join!(repository.load("home"), repository.load("home"));
        let first = first.expect("first");
        let second = second.expect("second");
        assert_eq!(first, second);
        assert_eq!(repository.store().fetch_count(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let repository = ScreenRepository::new(ScriptedStore::failing(1));
        let err = repository.load("home").await.expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Io);

        let elements = repository.load("home").await.expect("retry");
        assert!(!elements.is_empty());
        assert_eq!(repository.store().fetch_count(), 2);
    }

    #[tokio::test]
    async fn evict_forces_a_refetch() {
        let repository = ScreenRepository::new(ScriptedStore::new());
        repository.load("home").await.expect("first");
        repository.evict("home");
        repository.load("home").await.expect("second");
        assert_eq!(repository.store().fetch_count(), 2);
    }

    #[tokio::test]
    async fn clear_drops_every_slot() {
        let repository = ScreenRepository::new(ScriptedStore::new());
        repository.load("home").await.expect("home");
        repository.load("profile").await.expect("profile");
        repository.clear();
        repository.load("home").await.expect("home again");
        assert_eq!(repository.store().fetch_count(), 3);
    }

    #[tokio::test]
    async fn stream_emits_loading_then_ready() {
        let repository = ScreenRepository::new(ScriptedStore::new());
        let mut stream = repository.get_screen("home");

        let first = stream.next().await.expect("loading");
        assert!(matches!(first, ScreenState::Loading));

        let second = stream.next().await.expect("terminal");
        match second {
            ScreenState::Ready(elements) => {
                assert!(matches!(
                    elements[0],
                    ScreenElement::Title { index: 0, .. }
                ));
            }
            other => panic!("expected Ready, got {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn stream_surfaces_fetch_failure_as_terminal_state() {
        let repository = ScreenRepository::new(ScriptedStore::failing(usize::MAX));
        let mut stream = repository.get_screen("home");

        assert!(matches!(stream.next().await, Some(ScreenState::Loading)));
        match stream.next().await.expect("terminal") {
            ScreenState::Failed(err) => assert_eq!(err.kind(), ErrorKind::Io),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dropped_stream_still_warms_the_cache() {
        let repository = ScreenRepository::new(ScriptedStore::new());
        drop(repository.get_screen("home"));

        // Bounded wait for the detached worker to finish populating the slot.
        let mut warmed = false;
        for _ in 0..50 {
            if repository.store().fetch_count() == 1 {
                warmed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(warmed, "worker never fetched after stream drop");

        repository.load("home").await.expect("cached");
        assert_eq!(repository.store().fetch_count(), 1);
    }
}
