//! Background fetching for the panel viewer.
//!
//! Fetch futures run on a small tokio runtime owned by the loader so the GUI
//! stays responsive while the directory service is slow. Results come back
//! over a channel and are applied on the UI thread once per frame.

use eframe::egui;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use rpanel::{
    CollectionSource, Expansion, ExpansionEngine, FetchError, Forest, PanelError, RecordKey,
    ResponseEnvelope, RootFetcher, SearchTicket,
};

/// Result of a completed background fetch.
pub enum LoadResult {
    /// A root search finished
    Search {
        page_id: String,
        ticket: SearchTicket,
        response: Result<ResponseEnvelope, FetchError>,
    },
    /// Children of one node were loaded
    Expansion {
        page_id: String,
        key: RecordKey,
        result: Result<Expansion, PanelError>,
    },
}

/// Runs collaborator futures off the UI thread.
pub struct AsyncLoader {
    runtime: tokio::runtime::Runtime,
    sender: Sender<LoadResult>,
    receiver: Receiver<LoadResult>,
    /// Number of spawned fetches that have not reported back yet
    in_flight: Arc<AtomicUsize>,
}

impl AsyncLoader {
    /// Creates a loader with its own worker threads.
    pub fn new() -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("panel-fetch")
            .enable_time()
            .build()?;
        let (sender, receiver) = channel();
        Ok(Self {
            runtime,
            sender,
            receiver,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Checks if any fetch is currently in progress.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Starts a root search for `page_id`.
    ///
    /// The ticket comes back with the response so the page can tell whether
    /// this is still the latest search.
    pub fn start_search(
        &self,
        page_id: &str,
        source: CollectionSource,
        ticket: SearchTicket,
        ctx: &egui::Context,
    ) {
        let page_id = page_id.to_owned();
        self.spawn(ctx, async move {
            let response = source.fetch_roots(&ticket.filter, ticket.page).await;
            LoadResult::Search {
                page_id,
                ticket,
                response,
            }
        });
    }

    /// Loads the children of `key` against a snapshot of the page's forest.
    pub fn start_expansion(
        &self,
        page_id: &str,
        engine: Arc<ExpansionEngine<CollectionSource>>,
        forest: Forest,
        key: RecordKey,
        ctx: &egui::Context,
    ) {
        let page_id = page_id.to_owned();
        self.spawn(ctx, async move {
            let result = engine.load_children(&forest, &key).await;
            LoadResult::Expansion {
                page_id,
                key,
                result,
            }
        });
    }

    fn spawn<F>(&self, ctx: &egui::Context, task: F)
    where
        F: std::future::Future<Output = LoadResult> + Send + 'static,
    {
        let sender = self.sender.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let ctx_handle = ctx.clone();
        in_flight.fetch_add(1, Ordering::SeqCst);

        self.runtime.spawn(async move {
            let result = task.await;
            // The receiver only goes away when the app shuts down.
            let _ = sender.send(result);
            // Decremented after sending so an idle loader has nothing left to drain.
            in_flight.fetch_sub(1, Ordering::SeqCst);
            // Notify GUI thread to repaint
            ctx_handle.request_repaint();
        });
    }

    /// Drains every result that arrived since the last frame.
    pub fn check_completion(&mut self) -> Vec<LoadResult> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpanel::{Collection, Filter, MockDirectory, PageRequest};
    use std::time::{Duration, Instant};

    fn wait_for(loader: &mut AsyncLoader) -> Vec<LoadResult> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let results = loader.check_completion();
            if !results.is_empty() || Instant::now() > deadline {
                return results;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_async_loader_creation() {
        let mut loader = AsyncLoader::new().unwrap();
        assert!(!loader.is_loading());
        assert!(loader.check_completion().is_empty());
    }

    #[test]
    fn test_search_result_arrives() {
        let mut loader = AsyncLoader::new().unwrap();
        let directory = MockDirectory::new();
        let ctx = egui::Context::default();
        let ticket = SearchTicket {
            seq: 7,
            filter: Filter::new(),
            page: PageRequest::first(5),
        };

        loader.start_search("roles", directory.source(Collection::Roles), ticket, &ctx);
        let results = wait_for(&mut loader);

        assert_eq!(results.len(), 1);
        match &results[0] {
            LoadResult::Search { page_id, ticket, response } => {
                assert_eq!(page_id, "roles");
                assert_eq!(ticket.seq, 7);
                assert!(response.is_ok());
            }
            LoadResult::Expansion { .. } => panic!("expected a search result"),
        }
    }
}
