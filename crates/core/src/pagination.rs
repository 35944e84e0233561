//! Paginated collection state machine.
//!
//! [`CollectionState`] holds the pages loaded for one query key and decides
//! which page request (if any) may start next. It performs no I/O: callers
//! take a [`PageTicket`] from one of the `begin_*` methods, run the request
//! and hand the result back through [`CollectionState::complete`] or
//! [`CollectionState::fail`].
//!
//! At most one request is in flight per collection. A response is applied
//! only if its ticket is still the in-flight ticket; changing the search
//! term or starting a refresh supersedes the outstanding request, so late
//! responses for an old key are dropped instead of merged.

use serde::Serialize;

/// Records per page when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: usize = 6;

/// Identifies a collection: which resource, filtered by which search term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryKey {
    pub resource: String,
    pub search: String,
}

impl QueryKey {
    #[must_use]
    pub fn new(resource: impl Into<String>, search: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            search: search.into(),
        }
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.search.is_empty() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}?search={}", self.resource, self.search)
        }
    }
}

/// What a page request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    /// First page for the key; replaces whatever is loaded.
    Initial,
    /// The page after the last loaded one; appended.
    Next,
    /// The whole loaded window from offset 0; replaces the pages.
    Refresh,
}

/// Permission to run exactly one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    epoch: u64,
    seq: u64,
    kind: FetchKind,
    key: QueryKey,
    offset: usize,
    limit: usize,
}

impl PageTicket {
    #[must_use]
    pub const fn kind(&self) -> FetchKind {
        self.kind
    }

    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }
}

/// Result of handing a response back to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The response was merged.
    Applied {
        /// Number of records in the response.
        received: usize,
        /// Exhaustion after applying.
        exhausted: bool,
    },
    /// The ticket had been superseded; nothing changed.
    Discarded,
}

/// Loaded pages and request bookkeeping for one collection.
#[derive(Debug, Clone)]
pub struct CollectionState<R> {
    key: QueryKey,
    page_size: usize,
    pages: Vec<Vec<R>>,
    exhausted: bool,
    epoch: u64,
    next_seq: u64,
    in_flight: Option<PageTicket>,
}

impl<R> CollectionState<R> {
    /// An empty collection for `key`. A `page_size` of zero is treated as one.
    #[must_use]
    pub fn new(key: QueryKey, page_size: usize) -> Self {
        Self {
            key,
            page_size: page_size.max(1),
            pages: Vec::new(),
            exhausted: false,
            epoch: 0,
            next_seq: 0,
            in_flight: None,
        }
    }

    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub const fn pages_loaded(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    #[must_use]
    pub fn is_loading_initial(&self) -> bool {
        self.in_flight_kind() == Some(FetchKind::Initial)
    }

    #[must_use]
    pub fn is_loading_more(&self) -> bool {
        self.in_flight_kind() == Some(FetchKind::Next)
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.in_flight_kind() == Some(FetchKind::Refresh)
    }

    /// The outstanding ticket, if a request is running.
    #[must_use]
    pub const fn in_flight(&self) -> Option<&PageTicket> {
        self.in_flight.as_ref()
    }

    fn in_flight_kind(&self) -> Option<FetchKind> {
        self.in_flight.as_ref().map(PageTicket::kind)
    }

    /// All loaded records in page order.
    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.pages.iter().flatten()
    }

    /// Total number of loaded records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(Vec::is_empty)
    }

    /// Replace the search term.
    ///
    /// Drops loaded pages, exhaustion and any in-flight request. Does not
    /// start a fetch. Returns `false` (and changes nothing) when the term is
    /// unchanged.
    pub fn set_search_term(&mut self, term: impl Into<String>) -> bool {
        let term = term.into();
        if term == self.key.search {
            return false;
        }
        self.key.search = term;
        self.reset();
        true
    }

    fn reset(&mut self) {
        self.pages.clear();
        self.exhausted = false;
        self.in_flight = None;
        self.epoch += 1;
    }

    fn issue(&mut self, kind: FetchKind, offset: usize, limit: usize) -> PageTicket {
        let ticket = PageTicket {
            epoch: self.epoch,
            seq: self.next_seq,
            kind,
            key: self.key.clone(),
            offset,
            limit,
        };
        self.next_seq += 1;
        self.in_flight = Some(ticket.clone());
        ticket
    }

    /// Start the request for offset 0.
    ///
    /// Returns `None` when an initial request for this key is already
    /// running; the caller should wait on that one instead. Any other
    /// in-flight request is superseded.
    pub fn begin_initial(&mut self) -> Option<PageTicket> {
        if self.is_loading_initial() {
            return None;
        }
        Some(self.issue(FetchKind::Initial, 0, self.page_size))
    }

    /// Start the request for the page after the last loaded one.
    ///
    /// Returns `None` when the collection is exhausted or any request is in
    /// flight.
    pub fn begin_next(&mut self) -> Option<PageTicket> {
        if self.exhausted || self.in_flight.is_some() {
            return None;
        }
        let offset = self.pages.len() * self.page_size;
        Some(self.issue(FetchKind::Next, offset, self.page_size))
    }

    /// Start re-fetching the loaded window from offset 0.
    ///
    /// The window covers every loaded page (at least one). Supersedes any
    /// in-flight request. Loaded pages stay visible until the response
    /// arrives.
    pub fn begin_refresh(&mut self) -> PageTicket {
        self.epoch += 1;
        let limit = self.pages.len().max(1) * self.page_size;
        self.issue(FetchKind::Refresh, 0, limit)
    }

    /// Apply a successful response.
    ///
    /// Discarded unless `ticket` is the in-flight ticket.
    pub fn complete(&mut self, ticket: &PageTicket, records: Vec<R>) -> Completion {
        if self.in_flight.as_ref() != Some(ticket) {
            return Completion::Discarded;
        }
        self.in_flight = None;

        let received = records.len();
        match ticket.kind {
            FetchKind::Initial => {
                self.pages = vec![records];
                self.exhausted = received < self.page_size;
            }
            FetchKind::Next => {
                if received > 0 {
                    self.pages.push(records);
                }
                self.exhausted = received < self.page_size;
            }
            FetchKind::Refresh => {
                self.pages = chunk(records, self.page_size);
                self.exhausted = received < ticket.limit;
            }
        }

        Completion::Applied {
            received,
            exhausted: self.exhausted,
        }
    }

    /// Record a failed request.
    ///
    /// Pages and exhaustion are left as they were so the request can be
    /// retried. Returns `false` if the ticket had been superseded.
    pub fn fail(&mut self, ticket: &PageTicket) -> bool {
        if self.in_flight.as_ref() != Some(ticket) {
            return false;
        }
        self.in_flight = None;
        true
    }
}

fn chunk<R>(records: Vec<R>, size: usize) -> Vec<Vec<R>> {
    let mut pages = Vec::with_capacity(records.len().div_ceil(size));
    let mut current = Vec::with_capacity(size);
    for record in records {
        current.push(record);
        if current.len() == size {
            pages.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        pages.push(current);
    }
    pages
}
