//! Centralized application state for the panel viewer.
//!
//! Composes focused state components: one [`PageState`] per configured page,
//! the shared column store, layout and the panel event registry.

use rpanel::{AppConfig, ColumnStateStore, KeyValueStore, MockDirectory, Observers, PanelEvent};

use crate::state::{LayoutState, PageState};

/// Column store backed by whichever preference store is available.
pub type ColumnStore = ColumnStateStore<Box<dyn KeyValueStore>>;

/// Main application state composed of focused state components.
pub struct AppState {
    // ===== Focused State Components =====
    /// Active page configuration
    pub config: AppConfig,

    /// Mock directory service shared by every page
    pub directory: MockDirectory,

    /// One entry per configured page, in configuration order
    pub pages: Vec<PageState>,

    /// Persisted column layouts
    pub columns: ColumnStore,

    /// UI layout state
    pub layout: LayoutState,

    /// Panel event subscribers
    pub events: Observers<PanelEvent>,

    // ===== Top-Level State =====
    active_page: usize,

    pub dark_mode: bool,

    /// Current error message to display (if any)
    pub error_message: Option<String>,
}

impl AppState {
    /// Creates the state for `config`, restoring column layouts from `columns`.
    pub fn new(config: AppConfig, directory: MockDirectory, columns: ColumnStore) -> Self {
        let mut state = Self {
            config: AppConfig {
                title: String::new(),
                pages: Vec::new(),
            },
            directory,
            pages: Vec::new(),
            columns,
            layout: LayoutState::new(),
            events: Observers::new(),
            active_page: 0,
            dark_mode: true,
            error_message: None,
        };
        state.replace_config(config);
        state
    }

    // ===== High-Level Coordination Methods =====

    /// Rebuilds every page from `config`. Column layouts are reloaded from
    /// the store, so tables sharing a storage key keep their layout.
    pub fn replace_config(&mut self, config: AppConfig) {
        for page in &config.pages {
            self.columns
                .register(&page.table.storage_key, page.table.columns.clone());
        }
        self.pages = config
            .pages
            .iter()
            .map(|page| {
                let columns = self.columns.load(&page.table.storage_key);
                PageState::new(page.clone(), &self.directory, columns)
            })
            .collect();
        self.active_page = 0;
        self.error_message = None;
        tracing::info!(pages = self.pages.len(), "page configuration loaded");
        self.config = config;
    }

    pub fn active_index(&self) -> usize {
        self.active_page
    }

    /// Switches pages; out-of-range indices are ignored.
    pub fn set_active_page(&mut self, index: usize) {
        if index < self.pages.len() {
            self.active_page = index;
        }
    }

    /// Switches to the page with `id`, if it exists.
    pub fn activate_page_id(&mut self, id: &str) {
        if let Some(index) = self.pages.iter().position(|p| p.id() == id) {
            self.active_page = index;
        }
    }

    pub fn active_page(&self) -> Option<&PageState> {
        self.pages.get(self.active_page)
    }

    pub fn active_page_mut(&mut self) -> Option<&mut PageState> {
        self.pages.get_mut(self.active_page)
    }

    pub fn page_mut(&mut self, id: &str) -> Option<&mut PageState> {
        self.pages.iter_mut().find(|p| p.id() == id)
    }
}
