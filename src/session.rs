//! Page-owned tree state: the forest, its expansion engine, and the root
//! search that produces it.
//!
//! Searches are numbered. Only the response to the most recent search is
//! applied; earlier responses that arrive late are reported as superseded
//! and dropped. Applying a search rebuilds the forest and resets the
//! expansion engine, which in turn supersedes any child fetch still in flight.

use std::sync::Arc;

use crate::error::{FetchError, PanelError};
use crate::expansion::{Expansion, ExpansionEngine};
use crate::forest::{self, Forest};
use crate::merge::changed_keys;
use crate::record::{PageRequest, ResponseEnvelope};
use crate::traits::{ChildFetcher, Filter, RecordKey, RootFetcher};
use crate::visible::{visible_rows, VisibleRow};

/// Identifies one root search so its response can be matched on arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTicket {
    pub seq: u64,
    pub filter: Filter,
    pub page: PageRequest,
}

/// Tree state owned by one page.
pub struct TreeSession<C> {
    engine: Arc<ExpansionEngine<C>>,
    forest: Forest,
    total: u64,
    filter: Filter,
    page: PageRequest,
    latest_search: u64,
    searching: bool,
    filter_children: bool,
    /// Keys whose subtree changed in the last update.
    last_changed: Vec<RecordKey>,
}

impl<C: ChildFetcher> TreeSession<C> {
    pub fn new(engine: Arc<ExpansionEngine<C>>) -> Self {
        Self {
            engine,
            forest: Forest::default(),
            total: 0,
            filter: Filter::new(),
            page: PageRequest::default(),
            latest_search: 0,
            searching: false,
            filter_children: false,
            last_changed: Vec::new(),
        }
    }

    /// Also send the search filter with child fetches.
    pub fn with_child_filter(mut self, enabled: bool) -> Self {
        self.filter_children = enabled;
        self
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn engine(&self) -> &Arc<ExpansionEngine<C>> {
        &self.engine
    }

    /// Total number of matching root records on the server.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn page(&self) -> PageRequest {
        self.page
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn last_changed(&self) -> &[RecordKey] {
        &self.last_changed
    }

    /// Registers a new root search; any earlier search becomes stale.
    pub fn begin_search(&mut self, filter: Filter, page: PageRequest) -> SearchTicket {
        self.latest_search += 1;
        self.searching = true;
        tracing::debug!(seq = self.latest_search, page = page.index, "root search started");
        SearchTicket {
            seq: self.latest_search,
            filter,
            page,
        }
    }

    /// Applies the response to a search started with [`begin_search`](Self::begin_search).
    pub fn finish_search(
        &mut self,
        ticket: &SearchTicket,
        response: Result<ResponseEnvelope, FetchError>,
    ) -> Result<(), PanelError> {
        if ticket.seq != self.latest_search {
            tracing::debug!(seq = ticket.seq, latest = self.latest_search, "stale root search dropped");
            return Err(PanelError::Superseded {
                target: format!("search #{}", ticket.seq),
            });
        }
        self.searching = false;

        let page = response.map_err(|source| {
            tracing::warn!(error = %source, "root search failed");
            PanelError::Fetch { key: None, source }
        })?;
        let page = page.normalize();

        let forest = forest::build(&page.records);
        self.engine
            .reset_with_filter(self.filter_children.then(|| ticket.filter.clone()));
        self.last_changed = forest.keys_depth_first();
        self.forest = forest;
        self.total = page.total;
        self.filter = ticket.filter.clone();
        self.page = ticket.page;
        tracing::info!(roots = self.forest.roots().len(), total = self.total, "forest rebuilt");
        Ok(())
    }

    /// Runs a root search to completion.
    pub async fn search<R: RootFetcher>(
        &mut self,
        roots: &R,
        filter: Filter,
        page: PageRequest,
    ) -> Result<(), PanelError> {
        let ticket = self.begin_search(filter, page);
        let response = roots.fetch_roots(&ticket.filter, ticket.page).await;
        self.finish_search(&ticket, response)
    }

    /// Re-runs the current search on another page.
    pub async fn goto_page<R: RootFetcher>(&mut self, roots: &R, index: usize) -> Result<(), PanelError> {
        let page = PageRequest { index, size: self.page.size };
        let filter = self.filter.clone();
        self.search(roots, filter, page).await
    }

    /// Expands `key` and returns the keys whose subtrees changed.
    pub async fn expand(&mut self, key: &str) -> Result<Vec<RecordKey>, PanelError> {
        let expansion = self.engine.load_children(&self.forest, key).await?;
        self.apply_expansion(&expansion)
    }

    /// Merges children loaded elsewhere (e.g. on a worker) into the
    /// current forest.
    pub fn apply_expansion(&mut self, expansion: &Expansion) -> Result<Vec<RecordKey>, PanelError> {
        let merged = self.engine.apply(&self.forest, expansion)?;
        let changed = changed_keys(&self.forest, &merged);
        self.forest = merged;
        self.last_changed = changed.clone();
        Ok(changed)
    }

    pub fn collapse(&mut self, key: &str) {
        self.forest = self.engine.collapse(&self.forest, key);
        self.last_changed.clear();
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.engine.is_expanded(key)
    }

    /// Rows to draw for the current forest and expansion state.
    pub fn rows(&self) -> Vec<VisibleRow> {
        visible_rows(
            &self.forest,
            &self.engine.expanded_keys(),
            &self.engine.pending_keys(),
        )
    }
}
