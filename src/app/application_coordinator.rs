//! Application-level coordination and workflow management.
//!
//! Turns panel events into engine calls, hands fetches to the background
//! loader and applies whatever came back since the previous frame.

use std::path::Path;

use rpanel::{AppConfig, Filter, PageRequest, PanelError, PanelEvent};

use crate::app::AppState;
use crate::io::{AsyncLoader, LoadResult};

/// Coordinates application-level operations and workflows.
///
/// This struct is responsible for:
/// - Starting root searches and child loads
/// - Applying loader results to the owning page
/// - Routing panel events to column persistence and transfer editing
pub struct ApplicationCoordinator;

impl ApplicationCoordinator {
    // ===== Fetch Workflows =====

    /// Starts a root search on the page with `page_id`.
    ///
    /// Loading markers of the previous forest are dropped; their results
    /// arrive with an old generation and are ignored.
    pub fn submit_search(
        state: &mut AppState,
        loader: &AsyncLoader,
        page_id: &str,
        filter: Filter,
        page_request: PageRequest,
        ctx: &egui::Context,
    ) {
        let Some(page) = state.page_mut(page_id) else {
            return;
        };
        let ticket = page.session.begin_search(filter, page_request);
        page.clear_loading();
        page.row_cache.invalidate_rows();
        loader.start_search(page_id, page.source.clone(), ticket, ctx);
    }

    /// Runs the initial search of every page.
    pub fn search_all(state: &mut AppState, loader: &AsyncLoader, ctx: &egui::Context) {
        let requests: Vec<(String, PageRequest)> = state
            .pages
            .iter()
            .map(|page| (page.id().to_owned(), page.config.first_page()))
            .collect();
        for (page_id, request) in requests {
            Self::submit_search(state, loader, &page_id, Filter::new(), request, ctx);
        }
    }

    /// Expands or collapses a node of the active page.
    pub fn toggle_expand(
        state: &mut AppState,
        loader: &AsyncLoader,
        key: &str,
        will_expand: bool,
        ctx: &egui::Context,
    ) {
        let Some(page) = state.active_page_mut() else {
            return;
        };
        if !will_expand {
            page.session.collapse(key);
            page.finish_loading(key);
            return;
        }
        if page.is_loading(key) {
            return;
        }
        page.mark_loading(key);
        loader.start_expansion(
            page.id(),
            page.session.engine().clone(),
            page.session.forest().clone(),
            key.to_owned(),
            ctx,
        );
    }

    /// Applies every loader result that arrived since the last frame.
    ///
    /// Returns true if any page changed.
    pub fn check_loading_completion(state: &mut AppState, loader: &mut AsyncLoader) -> bool {
        let results = loader.check_completion();
        let changed = !results.is_empty();
        for result in results {
            Self::apply_result(state, result);
        }
        changed
    }

    fn apply_result(state: &mut AppState, result: LoadResult) {
        let outcome = match result {
            LoadResult::Search {
                page_id,
                ticket,
                response,
            } => {
                let Some(page) = state.page_mut(&page_id) else {
                    return;
                };
                let outcome = page.session.finish_search(&ticket, response);
                if outcome.is_ok() {
                    page.selection.clear();
                    page.transfer = None;
                    page.row_cache.invalidate();
                }
                outcome
            }
            LoadResult::Expansion {
                page_id,
                key,
                result,
            } => {
                let Some(page) = state.page_mut(&page_id) else {
                    return;
                };
                // No marker means the user collapsed before the fetch finished.
                let still_wanted = page.is_loading(&key);
                page.finish_loading(&key);
                result
                    .and_then(|expansion| page.session.apply_expansion(&expansion))
                    .map(|changed| {
                        if !still_wanted {
                            page.session.collapse(&key);
                        }
                        page.row_cache.invalidate_keys(&changed)
                    })
            }
        };

        match outcome {
            Ok(()) => state.error_message = None,
            Err(error) if error.is_superseded() => {
                tracing::debug!(%error, "dropping superseded result");
            }
            Err(error) => {
                tracing::warn!(%error, "load failed");
                state.error_message = Some(Self::describe(&error));
            }
        }
    }

    fn describe(error: &PanelError) -> String {
        match error {
            PanelError::Fetch { key: Some(key), source } => {
                format!("Could not load children of {key}: {source}")
            }
            PanelError::Fetch { key: None, source } => format!("Search failed: {source}"),
            other => other.to_string(),
        }
    }

    // ===== Panel Events =====

    /// Notifies subscribers, then applies `event` to the active page.
    pub fn handle_panel_event(
        state: &mut AppState,
        loader: &AsyncLoader,
        event: PanelEvent,
        ctx: &egui::Context,
    ) {
        state.events.notify(&event);

        let directory = state.directory.clone();
        let index = state.active_index();
        let Some(page) = state.pages.get_mut(index) else {
            return;
        };
        let storage_key = page.storage_key().to_owned();

        match event {
            PanelEvent::NodeSelect { key } => {
                if page.selection.select(&key) {
                    page.open_transfer(&key, &directory);
                }
            }
            PanelEvent::ExpandToggle { key, will_expand } => {
                Self::toggle_expand(state, loader, &key, will_expand, ctx);
            }
            PanelEvent::ColumnVisibilityChange {
                column_key,
                visible,
            } => {
                state
                    .columns
                    .set_visible(&storage_key, &mut page.columns, &column_key, visible);
            }
            PanelEvent::ColumnResize { column_key, width } => {
                state
                    .columns
                    .resize(&storage_key, &mut page.columns, &column_key, width);
            }
            PanelEvent::ColumnReset => {
                page.columns = state.columns.reset(&storage_key);
            }
            PanelEvent::TransferMove { keys, to_target } => {
                let stored = page.store_assignments();
                tracing::info!(moved = keys.len(), to_target, assigned = stored, "assignments updated");
            }
            PanelEvent::SearchSubmit { filter } => {
                let request = page.config.first_page();
                let page_id = page.id().to_owned();
                Self::submit_search(state, loader, &page_id, filter, request, ctx);
            }
            PanelEvent::PageChange { index } => {
                let request = PageRequest {
                    index,
                    size: page.session.page().size,
                };
                let filter = page.session.filter().clone();
                let page_id = page.id().to_owned();
                Self::submit_search(state, loader, &page_id, filter, request, ctx);
            }
        }
    }

    // ===== Configuration =====

    /// Replaces the page configuration with the one stored at `path`.
    pub fn import_config(
        state: &mut AppState,
        loader: &AsyncLoader,
        path: &Path,
        ctx: &egui::Context,
    ) {
        match AppConfig::load(path) {
            Ok(config) => {
                state.replace_config(config);
                Self::search_all(state, loader, ctx);
            }
            Err(error) => {
                state.error_message = Some(format!("Error loading config: {error:#}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ColumnStore;
    use rpanel::{builtin_catalog, ColumnStateStore, MemoryStore, MockDirectory};
    use std::time::{Duration, Instant};

    fn setup() -> (AppState, AsyncLoader, egui::Context) {
        let columns: ColumnStore = ColumnStateStore::new(Box::new(MemoryStore::new()));
        let state = AppState::new(builtin_catalog().clone(), MockDirectory::new(), columns);
        (state, AsyncLoader::new().unwrap(), egui::Context::default())
    }

    fn settle(state: &mut AppState, loader: &mut AsyncLoader) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            ApplicationCoordinator::check_loading_completion(state, loader);
            if !loader.is_loading() {
                ApplicationCoordinator::check_loading_completion(state, loader);
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_initial_search_fills_every_page() {
        let (mut state, mut loader, ctx) = setup();
        ApplicationCoordinator::search_all(&mut state, &loader, &ctx);
        settle(&mut state, &mut loader);

        for page in &state.pages {
            assert!(!page.session.forest().is_empty(), "page {} is empty", page.id());
            assert!(!page.session.is_searching());
        }
        assert_eq!(state.error_message, None);
    }

    #[test]
    fn test_expand_then_collapse() {
        let (mut state, mut loader, ctx) = setup();
        ApplicationCoordinator::search_all(&mut state, &loader, &ctx);
        settle(&mut state, &mut loader);

        let page = state.active_page_mut().unwrap();
        let key = page
            .session
            .forest()
            .roots()
            .iter()
            .find(|node| node.is_expandable())
            .map(|node| node.key().to_owned())
            .unwrap();

        let expand = PanelEvent::ExpandToggle { key: key.clone(), will_expand: true };
        ApplicationCoordinator::handle_panel_event(&mut state, &loader, expand, &ctx);
        assert!(state.active_page().unwrap().is_loading(&key));
        settle(&mut state, &mut loader);

        let page = state.active_page().unwrap();
        assert!(!page.is_loading(&key));
        assert!(page.session.is_expanded(&key));

        let collapse = PanelEvent::ExpandToggle { key: key.clone(), will_expand: false };
        ApplicationCoordinator::handle_panel_event(&mut state, &loader, collapse, &ctx);
        assert!(!state.active_page().unwrap().session.is_expanded(&key));
    }

    #[test]
    fn test_collapse_before_result_keeps_node_collapsed() {
        let (mut state, mut loader, ctx) = setup();
        ApplicationCoordinator::search_all(&mut state, &loader, &ctx);
        settle(&mut state, &mut loader);

        let key = state
            .active_page()
            .unwrap()
            .session
            .forest()
            .roots()
            .iter()
            .find(|node| node.is_expandable())
            .map(|node| node.key().to_owned())
            .unwrap();

        let expand = PanelEvent::ExpandToggle { key: key.clone(), will_expand: true };
        ApplicationCoordinator::handle_panel_event(&mut state, &loader, expand, &ctx);
        let collapse = PanelEvent::ExpandToggle { key: key.clone(), will_expand: false };
        ApplicationCoordinator::handle_panel_event(&mut state, &loader, collapse, &ctx);
        settle(&mut state, &mut loader);

        let page = state.active_page().unwrap();
        assert!(!page.session.is_expanded(&key));
        assert!(page.session.forest().find(&key).unwrap().is_loaded());
        assert_eq!(state.error_message, None);
    }

    #[test]
    fn test_failed_search_keeps_forest_and_reports() {
        let (mut state, mut loader, ctx) = setup();
        ApplicationCoordinator::search_all(&mut state, &loader, &ctx);
        settle(&mut state, &mut loader);
        let before = state.pages[0].session.forest().node_count();

        state.directory.fail_next(1);
        let submit = PanelEvent::SearchSubmit { filter: Filter::new() };
        ApplicationCoordinator::handle_panel_event(&mut state, &loader, submit, &ctx);
        settle(&mut state, &mut loader);

        assert!(state.error_message.as_deref().unwrap().starts_with("Search failed"));
        assert_eq!(state.pages[0].session.forest().node_count(), before);
    }

    #[test]
    fn test_column_events_persist() {
        let (mut state, loader, ctx) = setup();
        state.set_active_page(1);
        let hide = PanelEvent::ColumnVisibilityChange {
            column_key: "email".into(),
            visible: false,
        };
        ApplicationCoordinator::handle_panel_event(&mut state, &loader, hide, &ctx);

        let storage_key = state.pages[1].storage_key().to_owned();
        assert!(!state.columns.load(&storage_key).is_visible("email"));

        ApplicationCoordinator::handle_panel_event(&mut state, &loader, PanelEvent::ColumnReset, &ctx);
        assert!(state.pages[1].columns.is_visible("email"));
    }

    #[test]
    fn test_events_reach_subscribers() {
        let (mut state, loader, ctx) = setup();
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = state.events.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let select = PanelEvent::NodeSelect { key: "g1".into() };
        ApplicationCoordinator::handle_panel_event(&mut state, &loader, select.clone(), &ctx);

        assert_eq!(*seen.lock().unwrap(), vec![select]);
        assert!(state.active_page().unwrap().transfer.is_some());
    }
}
