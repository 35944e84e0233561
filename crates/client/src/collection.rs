//! Searchable, infinitely-scrollable collection viewer.
//!
//! [`CollectionViewer`] drives a [`CollectionState`] from a [`PageSource`].
//! The state lock is only held to take a ticket and to apply a result, never
//! across the network call, so scroll events and search changes stay
//! responsive while a page loads.

use std::future::Future;
use std::marker::PhantomData;

use dealdesk_core::{
    CollectionState, Completion, PageTicket, QueryKey, ScrollMetrics, ScrollTrigger, Session,
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{debug, instrument, warn};

use crate::api::{ApiClient, Resource};
use crate::cache::{PageCache, PageKey};
use crate::error::{ApiError, AppError};
use crate::notify::Notifier;

/// Where pages come from.
pub trait PageSource: Send + Sync {
    type Record: Clone + Send + Sync + 'static;

    /// Fetch `limit` records starting at `offset` for `key`.
    fn fetch_page(
        &self,
        key: &QueryKey,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Self::Record>, ApiError>> + Send;

    /// Forget anything cached, so the next fetch hits the backend.
    fn invalidate(&self) {}
}

/// Pages of `R` served through the shared page cache.
///
/// Cache entries are keyed by the vendor signed in when the page is
/// requested.
pub struct CachedPages<R: Resource> {
    api: ApiClient,
    cache: PageCache<R::Record>,
    session: watch::Receiver<Session>,
    _resource: PhantomData<R>,
}

impl<R: Resource> CachedPages<R> {
    #[must_use]
    pub const fn new(
        api: ApiClient,
        cache: PageCache<R::Record>,
        session: watch::Receiver<Session>,
    ) -> Self {
        Self {
            api,
            cache,
            session,
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> Clone for CachedPages<R> {
    fn clone(&self) -> Self {
        Self::new(self.api.clone(), self.cache.clone(), self.session.clone())
    }
}

impl<R: Resource> PageSource for CachedPages<R> {
    type Record = R::Record;

    async fn fetch_page(
        &self,
        key: &QueryKey,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<R::Record>, ApiError> {
        let owner = self
            .session
            .borrow()
            .identity()
            .map(|identity| identity.uid.clone());
        let page_key = PageKey {
            owner,
            resource: R::NAME,
            search: key.search.clone(),
            offset,
            limit,
        };
        self.cache
            .get_or_fetch(page_key, self.api.list_page::<R>(&key.search, offset, limit))
            .await
    }

    fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}

/// A page request failed.
#[derive(Debug, Clone, Error)]
#[error("Failed to load {key}: {source}")]
pub struct FetchError {
    pub key: QueryKey,
    #[source]
    pub source: ApiError,
}

/// What a fetch call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// No request was issued (exhausted, or one is already running).
    Skipped,
    /// The response was applied.
    Applied { received: usize, exhausted: bool },
    /// The response arrived after its key or window was superseded.
    Discarded,
}

impl From<Completion> for FetchOutcome {
    fn from(completion: Completion) -> Self {
        match completion {
            Completion::Applied {
                received,
                exhausted,
            } => Self::Applied {
                received,
                exhausted,
            },
            Completion::Discarded => Self::Discarded,
        }
    }
}

/// Owned view of the collection for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSnapshot<R> {
    pub key: QueryKey,
    pub records: Vec<R>,
    pub pages_loaded: usize,
    pub exhausted: bool,
    pub loading_initial: bool,
    pub loading_more: bool,
    pub refreshing: bool,
}

struct ViewerState<R> {
    collection: CollectionState<R>,
    trigger: ScrollTrigger,
}

/// Infinite-scroll list over one resource.
pub struct CollectionViewer<S: PageSource> {
    source: S,
    state: Mutex<ViewerState<S::Record>>,
    notifier: Notifier,
}

impl<S: PageSource> CollectionViewer<S> {
    #[must_use]
    pub fn new(
        source: S,
        key: QueryKey,
        page_size: usize,
        scroll_threshold: f64,
        notifier: Notifier,
    ) -> Self {
        Self {
            source,
            state: Mutex::new(ViewerState {
                collection: CollectionState::new(key, page_size),
                trigger: ScrollTrigger::new(scroll_threshold),
            }),
            notifier,
        }
    }

    /// Replace the search term and drop everything loaded for the old one.
    ///
    /// Does not fetch; call [`CollectionViewer::fetch_initial`] next.
    /// Returns `false` if the term did not change.
    pub async fn set_search_term(&self, term: impl Into<String>) -> bool {
        let mut state = self.state.lock().await;
        let changed = state.collection.set_search_term(term);
        if changed {
            state.trigger.settle();
            debug!(key = %state.collection.key(), "Search term changed");
        }
        changed
    }

    /// Load the first page for the current key.
    ///
    /// Returns [`FetchOutcome::Skipped`] if an initial load is already
    /// running for this key.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails; loaded pages stay as
    /// they were.
    pub async fn fetch_initial(&self) -> Result<FetchOutcome, FetchError> {
        let ticket = self.state.lock().await.collection.begin_initial();
        match ticket {
            Some(ticket) => self.run(ticket).await,
            None => Ok(FetchOutcome::Skipped),
        }
    }

    /// Load the page after the last loaded one.
    ///
    /// A no-op when the collection is exhausted or any request is running.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails; loaded pages and
    /// exhaustion stay as they were so the call can be retried.
    pub async fn fetch_next(&self) -> Result<FetchOutcome, FetchError> {
        let ticket = self.state.lock().await.collection.begin_next();
        match ticket {
            Some(ticket) => self.run(ticket).await,
            None => Ok(FetchOutcome::Skipped),
        }
    }

    /// Feed a scroll event; loads the next page once per threshold crossing.
    ///
    /// # Errors
    ///
    /// Same as [`CollectionViewer::fetch_next`].
    pub async fn on_scroll(&self, metrics: ScrollMetrics) -> Result<FetchOutcome, FetchError> {
        let ticket = {
            let mut state = self.state.lock().await;
            if !state.trigger.observe(metrics) {
                return Ok(FetchOutcome::Skipped);
            }
            let ticket = state.collection.begin_next();
            if ticket.is_none() {
                state.trigger.settle();
            }
            ticket
        };
        match ticket {
            Some(ticket) => self.run(ticket).await,
            None => Ok(FetchOutcome::Skipped),
        }
    }

    /// Re-fetch the loaded window after a mutation.
    ///
    /// Supersedes any running request and bypasses the page cache.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails; the old pages stay.
    pub async fn invalidate_and_refetch(&self) -> Result<FetchOutcome, FetchError> {
        self.source.invalidate();
        let ticket = self.state.lock().await.collection.begin_refresh();
        self.run(ticket).await
    }

    /// Owned copy of the current state.
    pub async fn snapshot(&self) -> CollectionSnapshot<S::Record> {
        let state = self.state.lock().await;
        let collection = &state.collection;
        CollectionSnapshot {
            key: collection.key().clone(),
            records: collection.records().cloned().collect(),
            pages_loaded: collection.pages_loaded(),
            exhausted: collection.is_exhausted(),
            loading_initial: collection.is_loading_initial(),
            loading_more: collection.is_loading_more(),
            refreshing: collection.is_refreshing(),
        }
    }

    #[instrument(
        skip(self, ticket),
        fields(key = %ticket.key(), kind = ?ticket.kind(), offset = ticket.offset())
    )]
    async fn run(&self, ticket: PageTicket) -> Result<FetchOutcome, FetchError> {
        let result = self
            .source
            .fetch_page(ticket.key(), ticket.offset(), ticket.limit())
            .await;

        let mut state = self.state.lock().await;
        state.trigger.settle();

        match result {
            Ok(records) => {
                let outcome = FetchOutcome::from(state.collection.complete(&ticket, records));
                if outcome == FetchOutcome::Discarded {
                    debug!("Discarded stale page");
                }
                Ok(outcome)
            }
            Err(source) => {
                if !state.collection.fail(&ticket) {
                    debug!(error = %source, "Ignored failure of stale request");
                    return Ok(FetchOutcome::Discarded);
                }
                drop(state);

                warn!(error = %source, "Page fetch failed");
                let error = AppError::Api(source.clone());
                error.report();
                self.notifier.publish(error.notice());
                Err(FetchError {
                    key: ticket.key().clone(),
                    source,
                })
            }
        }
    }
}
