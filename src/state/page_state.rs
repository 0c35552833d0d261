//! Per-page state.
//!
//! Each configured page owns its tree session, column layout, search form,
//! selection and row cache. Switching pages never discards any of them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rpanel::panel_config::SearchForm;
use rpanel::{
    CollectionSource, ColumnSpec, ColumnState, ExpansionEngine, MockDirectory, Node, PageConfig,
    PageKind, RecordKey, TransferItem, TransferList, TreeSession, VisibleRow,
};

use crate::cache::RowCache;
use crate::state::SelectionState;
use crate::utils::format_value;

/// Transfer panel bound to the selected node.
pub struct TransferState {
    /// Node whose assignments are being edited
    pub owner: RecordKey,
    pub list: TransferList,
    pub source_query: String,
    pub target_query: String,
}

pub struct PageState {
    pub config: PageConfig,
    pub source: CollectionSource,
    pub session: TreeSession<CollectionSource>,
    pub columns: ColumnState,
    pub search_form: SearchForm,
    pub selection: SelectionState,
    pub row_cache: RowCache,
    pub transfer: Option<TransferState>,
    /// Keys whose child fetch was handed to the loader
    loading: HashSet<RecordKey>,
    /// Edited assignments per owner key
    assignments: HashMap<RecordKey, Vec<RecordKey>>,
}

impl PageState {
    pub fn new(config: PageConfig, directory: &MockDirectory, columns: ColumnState) -> Self {
        let source = directory.source(config.collection);
        let engine = Arc::new(ExpansionEngine::new(source.clone()));
        let session = TreeSession::new(engine).with_child_filter(config.table.filter_children);
        Self {
            config,
            source,
            session,
            columns,
            search_form: SearchForm::new(),
            selection: SelectionState::new(),
            row_cache: RowCache::new(),
            transfer: None,
            loading: HashSet::new(),
            assignments: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn is_tree(&self) -> bool {
        self.config.kind == PageKind::Tree
    }

    pub fn storage_key(&self) -> &str {
        &self.config.table.storage_key
    }

    // ===== Loading Markers =====

    pub fn mark_loading(&mut self, key: &str) {
        self.loading.insert(key.to_owned());
        self.row_cache.invalidate_rows();
    }

    pub fn finish_loading(&mut self, key: &str) {
        self.loading.remove(key);
        self.row_cache.invalidate_rows();
    }

    pub fn is_loading(&self, key: &str) -> bool {
        self.loading.contains(key)
    }

    pub fn loading_count(&self) -> usize {
        self.loading.len()
    }

    /// Forgets loading markers; their results will be superseded.
    pub fn clear_loading(&mut self) {
        self.loading.clear();
    }

    // ===== Rendering Queries =====

    /// Visible rows of the current forest.
    pub fn rows(&mut self) -> Arc<[VisibleRow]> {
        let expanded = self.session.engine().expanded_keys();
        self.row_cache.rows(self.session.forest(), &expanded, &self.loading)
    }

    /// Visible columns of the table with their current widths.
    pub fn visible_columns(&self) -> Vec<(ColumnSpec, f32)> {
        self.columns
            .visible_columns(&self.config.table.columns)
            .into_iter()
            .map(|(spec, width)| (spec.clone(), width))
            .collect()
    }

    pub fn selected_node(&self) -> Option<&Arc<Node>> {
        let key = self.selection.selected_key()?;
        self.session.forest().find(key)
    }

    // ===== Transfer =====

    /// Binds the transfer panel to `owner`, restoring edited assignments.
    pub fn open_transfer(&mut self, owner: &str, directory: &MockDirectory) {
        let Some(config) = &self.config.transfer else {
            return;
        };
        let candidates = directory
            .records(config.source)
            .iter()
            .map(|record| {
                let label = record
                    .payload
                    .get(&config.label_field)
                    .map(format_value)
                    .unwrap_or_else(|| record.id.clone());
                TransferItem::new(record.id.clone(), label)
            })
            .collect();
        let assigned = self
            .assignments
            .get(owner)
            .cloned()
            .unwrap_or_else(|| directory.members_of(owner));

        self.transfer = Some(TransferState {
            owner: owner.to_owned(),
            list: TransferList::new(candidates, &assigned),
            source_query: String::new(),
            target_query: String::new(),
        });
    }

    /// Remembers the target list of the open transfer panel.
    pub fn store_assignments(&mut self) -> usize {
        let Some(transfer) = &self.transfer else {
            return 0;
        };
        let keys = transfer.list.target_keys();
        let count = keys.len();
        self.assignments.insert(transfer.owner.clone(), keys);
        count
    }
}
